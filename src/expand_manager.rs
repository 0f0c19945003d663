//! Expand Manager - one execution context of the text expansion system
//!
//! This module ties together the components of the expansion engine:
//! - StateCache: current snapshot and trigger index
//! - ExpandMatcher: trigger detection left of the caret
//! - template_variables: cue body rendering
//! - text_injector: in-place replacement on the edit surface
//!
//! # Cycle
//!
//! For each edit event the manager:
//! 1. Ignores anything but typed characters (deletions, pastes and the
//!    synthetic notification caused by our own write never scan)
//! 2. Takes the current cached state once; the whole cycle uses it even if
//!    a refresh lands meanwhile
//! 3. Scans the text left of the caret for a trigger
//! 4. Renders the cue template with the snapshot's variables plus any
//!    runtime overrides
//! 5. Replaces the typed trigger and repositions the caret
//!
//! Cycles never overlap: `handle_edit` takes `&mut self` and runs to
//! completion.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::expand_matcher::{EditKind, ExpandMatcher};
use crate::state::{CachedState, Cue, DocumentStore, StateCache, VariableValue};
use crate::template_variables::{bindings_for, render};
use crate::text_injector::Surface;

/// An input notification from the integration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    pub kind: EditKind,
    /// Whether the focused element accepts text
    pub editable: bool,
}

impl EditEvent {
    /// A character typed into an editable element
    pub fn typed() -> Self {
        Self {
            kind: EditKind::Insert,
            editable: true,
        }
    }

    pub fn of_kind(kind: EditKind) -> Self {
        Self {
            kind,
            editable: true,
        }
    }
}

/// Why an event did not run a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Deletion, paste or our own synthetic notification
    NotTyped,
    AutoExpandOff,
    NotEditable,
    /// Caret not inside a text node
    NoTextContext,
    /// An expansion is still being written
    ExpansionInFlight,
}

/// Result of one expansion cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    Skipped(SkipReason),
    NoMatch,
    Expanded {
        trigger: String,
        cue_id: String,
        output: String,
    },
    /// The trigger vanished between scan and write; dropped silently
    ReplaceFailed { trigger: String },
}

impl ExpansionOutcome {
    pub fn is_expanded(&self) -> bool {
        matches!(self, ExpansionOutcome::Expanded { .. })
    }
}

/// Drives expansion for one execution context (tab, window, editor)
pub struct ExpandManager<S: DocumentStore> {
    cache: Arc<StateCache<S>>,
    matcher: ExpandMatcher,
    /// Runtime values that take precedence over variable defaults
    overrides: HashMap<String, VariableValue>,
    expanding: bool,
}

impl<S: DocumentStore> ExpandManager<S> {
    pub fn new(cache: Arc<StateCache<S>>) -> Self {
        let prefix = cache.current().snapshot.settings.trigger_prefix.clone();
        Self {
            cache,
            matcher: ExpandMatcher::new(&prefix),
            overrides: HashMap::new(),
            expanding: false,
        }
    }

    pub fn cache(&self) -> &Arc<StateCache<S>> {
        &self.cache
    }

    /// Whether the current settings allow expansion at all
    pub fn is_enabled(&self) -> bool {
        self.cache.current().snapshot.settings.auto_expand
    }

    pub fn trigger_count(&self) -> usize {
        self.cache.current().index.len()
    }

    /// Registered (trigger, cue id) pairs for debugging / UI
    pub fn list_triggers(&self) -> Vec<(String, String)> {
        self.cache.current().index.triggers()
    }

    /// Inject a runtime value for a variable (e.g. collected from the user)
    pub fn set_override(&mut self, name: impl Into<String>, value: impl Into<VariableValue>) {
        self.overrides.insert(name.into(), value.into());
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Render a cue's template against a cached state and the overrides
    pub fn render_cue(&self, cue: &Cue, state: &CachedState) -> String {
        let bindings = bindings_for(&state.snapshot.variables, &self.overrides);
        render(&cue.template, &bindings)
    }

    /// Run one expansion cycle for an edit event on `surface`
    pub fn handle_edit(&mut self, event: EditEvent, mut surface: Surface<'_>) -> ExpansionOutcome {
        if self.expanding {
            return ExpansionOutcome::Skipped(SkipReason::ExpansionInFlight);
        }
        if !event.kind.qualifies_for_scan() {
            debug!(kind = ?event.kind, "Skipping edit event");
            return ExpansionOutcome::Skipped(SkipReason::NotTyped);
        }

        // Held for the whole cycle: a concurrent refresh doesn't affect it
        let state = self.cache.current();
        let settings = &state.snapshot.settings;

        if !settings.auto_expand {
            return ExpansionOutcome::Skipped(SkipReason::AutoExpandOff);
        }
        if !event.editable {
            return ExpansionOutcome::Skipped(SkipReason::NotEditable);
        }

        self.matcher.set_prefix(&settings.trigger_prefix);

        let Some(left_context) = surface.left_context() else {
            debug!("Caret not in a text context");
            return ExpansionOutcome::Skipped(SkipReason::NoTextContext);
        };

        let Some(found) = self.matcher.match_at(&left_context, &state.index) else {
            return ExpansionOutcome::NoMatch;
        };

        let output = self.render_cue(&found.cue, &state);
        debug!(
            trigger = %found.typed,
            template_len = found.cue.template.len(),
            output_len = output.len(),
            had_substitutions = found.cue.template != output,
            "Rendered cue template"
        );

        self.expanding = true;
        let replaced = surface.replace(&found.typed, &output);
        self.expanding = false;

        if !replaced {
            debug!(trigger = %found.typed, "Trigger no longer before caret, dropping expansion");
            return ExpansionOutcome::ReplaceFailed {
                trigger: found.typed,
            };
        }

        info!(
            trigger = %found.typed,
            cue_id = %found.cue.id,
            replacement_len = output.len(),
            "Expansion completed successfully"
        );

        ExpansionOutcome::Expanded {
            trigger: found.typed,
            cue_id: found.cue.id,
            output,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "expand_manager_tests.rs"]
mod tests;
