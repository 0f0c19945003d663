//! Expand matcher - trigger detection from the text left of the caret
//!
//! A trigger is recognized when the text before the caret ends with
//! `{prefix}[A-Za-z0-9_-]+`, the prefix is at the start of the text or
//! preceded by a non-identifier character, and the candidate resolves to a
//! cue in the [`TriggerIndex`].
//!
//! The matcher is a two-state machine (`Idle` / `Checking`). A scan is
//! synchronous, so every call completes a full Idle -> Checking -> Idle cycle.

use regex::Regex;
use tracing::{debug, warn};

use crate::state::Cue;
use crate::trigger_index::TriggerIndex;

/// Characters allowed after the prefix in a trigger
const IDENT_CLASS: &str = "A-Za-z0-9_-";

/// A trigger found immediately before the caret
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMatch {
    /// The trigger text exactly as it appears in the buffer
    pub typed: String,
    /// The cue it resolved to
    pub cue: Cue,
}

impl TriggerMatch {
    /// Number of characters the trigger occupies in the buffer
    pub fn chars_to_replace(&self) -> usize {
        self.typed.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherPhase {
    Idle,
    Checking,
}

/// Kind of edit that produced an input notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// A character was typed
    Insert,
    /// Backspace / delete
    Delete,
    /// Text pasted without a keystroke
    Paste,
    /// Notification caused by our own replacement write
    Synthetic,
}

impl EditKind {
    /// Only typed characters can complete a trigger
    pub fn qualifies_for_scan(self) -> bool {
        matches!(self, EditKind::Insert)
    }
}

/// Tail-anchored trigger scanner for one execution context
#[derive(Debug)]
pub struct ExpandMatcher {
    prefix: String,
    /// `None` if the pattern could not be compiled; nothing ever matches then
    pattern: Option<Regex>,
    phase: MatcherPhase,
}

impl ExpandMatcher {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            pattern: compile(prefix),
            phase: MatcherPhase::Idle,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn phase(&self) -> MatcherPhase {
        self.phase
    }

    /// Recompile the pattern if the configured prefix changed
    pub fn set_prefix(&mut self, prefix: &str) {
        if self.prefix == prefix {
            return;
        }
        debug!(old = %self.prefix, new = %prefix, "Trigger prefix changed");
        self.prefix = prefix.to_string();
        self.pattern = compile(prefix);
    }

    /// The candidate trigger at the end of `left_context`, if any
    ///
    /// This is purely lexical; it does not consult the index.
    pub fn candidate<'a>(&self, left_context: &'a str) -> Option<&'a str> {
        let pattern = self.pattern.as_ref()?;
        pattern
            .captures(left_context)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Decide whether the caret is immediately preceded by a known trigger
    ///
    /// `left_context` is all text strictly before the caret in the current
    /// text node or line.
    pub fn match_at(&mut self, left_context: &str, index: &TriggerIndex) -> Option<TriggerMatch> {
        self.phase = MatcherPhase::Checking;

        let result = self.candidate(left_context).and_then(|typed| {
            index.lookup(typed).map(|cue| TriggerMatch {
                typed: typed.to_string(),
                cue: cue.clone(),
            })
        });

        match &result {
            Some(found) => debug!(trigger = %found.typed, cue_id = %found.cue.id, "Trigger matched"),
            None => debug!(context_len = left_context.len(), "No trigger before caret"),
        }

        self.phase = MatcherPhase::Idle;
        result
    }
}

fn compile(prefix: &str) -> Option<Regex> {
    let source = format!(
        "(?:^|[^{class}])({prefix}[{class}]+)$",
        class = IDENT_CLASS,
        prefix = regex::escape(prefix)
    );
    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, prefix = %prefix, "Could not compile trigger pattern, matching disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Settings;

    fn index(cues: &[Cue]) -> TriggerIndex {
        TriggerIndex::build(cues, &Settings::default())
    }

    fn sig_index() -> TriggerIndex {
        index(&[Cue::new("sig", ":sig", "Best regards")])
    }

    #[test]
    fn test_matches_trigger_after_space() {
        let mut matcher = ExpandMatcher::new(":");
        let found = matcher.match_at("Hello :sig", &sig_index()).unwrap();
        assert_eq!(found.typed, ":sig");
        assert_eq!(found.cue.id, "sig");
        assert_eq!(found.chars_to_replace(), 4);
    }

    #[test]
    fn test_matches_at_start_of_context() {
        let mut matcher = ExpandMatcher::new(":");
        assert!(matcher.match_at(":sig", &sig_index()).is_some());
    }

    #[test]
    fn test_matches_after_punctuation() {
        let mut matcher = ExpandMatcher::new(":");
        assert!(matcher.match_at("(:sig", &sig_index()).is_some());
        assert!(matcher.match_at("line one\n:sig", &sig_index()).is_some());
    }

    #[test]
    fn test_no_match_inside_identifier() {
        let mut matcher = ExpandMatcher::new(":");
        assert!(matcher.match_at("foo:sig", &sig_index()).is_none());
        assert!(matcher.match_at("x-:sig", &sig_index()).is_none());
    }

    #[test]
    fn test_no_match_when_longer_identifier() {
        let mut matcher = ExpandMatcher::new(":");
        assert!(matcher.match_at("Hello :sigs", &sig_index()).is_none());
        assert!(matcher.match_at("Hello :sig ", &sig_index()).is_none());
    }

    #[test]
    fn test_unknown_trigger_returns_none() {
        let mut matcher = ExpandMatcher::new(":");
        assert!(matcher.match_at("Hello :other", &sig_index()).is_none());
        assert!(matcher.match_at("", &sig_index()).is_none());
    }

    #[test]
    fn test_case_insensitive_returns_typed_text() {
        let mut matcher = ExpandMatcher::new(":");
        let found = matcher.match_at("Hi :SIG", &sig_index()).unwrap();
        assert_eq!(found.typed, ":SIG");
        assert_eq!(found.cue.trigger, ":sig");
    }

    #[test]
    fn test_multi_char_prefix_is_escaped() {
        let mut matcher = ExpandMatcher::new("..");
        let idx = index(&[Cue::new("d", "..date", "{{date}}")]);
        assert!(matcher.match_at("today ..date", &idx).is_some());
        assert!(matcher.match_at("today x.date", &idx).is_none());
    }

    #[test]
    fn test_empty_prefix_uses_whole_word() {
        let mut matcher = ExpandMatcher::new("");
        let idx = index(&[Cue::new("b", "brb", "be right back")]);
        assert!(matcher.match_at("ok brb", &idx).is_some());
        assert!(matcher.match_at("okbrb", &idx).is_none());
    }

    #[test]
    fn test_set_prefix_recompiles() {
        let mut matcher = ExpandMatcher::new(":");
        let idx = index(&[Cue::new("s", "/sig", "x")]);
        assert!(matcher.match_at("a /sig", &idx).is_none());

        matcher.set_prefix("/");
        assert_eq!(matcher.prefix(), "/");
        assert!(matcher.match_at("a /sig", &idx).is_some());
    }

    #[test]
    fn test_duplicate_triggers_pick_last_registered() {
        let mut matcher = ExpandMatcher::new(":");
        let idx = index(&[Cue::new("one", ":dup", "1"), Cue::new("two", ":dup", "2")]);
        let found = matcher.match_at(":dup", &idx).unwrap();
        assert_eq!(found.cue.id, "two");
    }

    #[test]
    fn test_phase_returns_to_idle() {
        let mut matcher = ExpandMatcher::new(":");
        assert_eq!(matcher.phase(), MatcherPhase::Idle);
        let _ = matcher.match_at("Hello :sig", &sig_index());
        assert_eq!(matcher.phase(), MatcherPhase::Idle);
    }

    #[test]
    fn test_only_inserts_qualify() {
        assert!(EditKind::Insert.qualifies_for_scan());
        assert!(!EditKind::Delete.qualifies_for_scan());
        assert!(!EditKind::Paste.qualifies_for_scan());
        assert!(!EditKind::Synthetic.qualifies_for_scan());
    }
}
