//! Trigger index - enabled cues keyed by trigger
//!
//! Built from a snapshot's cue list on every change. Disabled cues are left
//! out entirely. When case-insensitive matching is configured, keys are
//! lower-cased and lookups fold the same way.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::state::{Cue, Settings};

/// Read-only map from trigger to cue
#[derive(Debug, Clone, Default)]
pub struct TriggerIndex {
    by_trigger: HashMap<String, Cue>,
    case_sensitive: bool,
}

impl TriggerIndex {
    /// Build the index from a cue list
    ///
    /// Duplicate triggers among enabled cues are tolerated: the cue appearing
    /// last in `cues` wins.
    pub fn build(cues: &[Cue], settings: &Settings) -> Self {
        let case_sensitive = settings.case_sensitive;
        let mut by_trigger: HashMap<String, Cue> = HashMap::with_capacity(cues.len());

        for cue in cues.iter().filter(|cue| cue.enabled) {
            if cue.trigger.is_empty() {
                debug!(cue_id = %cue.id, "Skipping cue with empty trigger");
                continue;
            }
            let key = fold(&cue.trigger, case_sensitive);
            if let Some(shadowed) = by_trigger.insert(key, cue.clone()) {
                warn!(
                    trigger = %cue.trigger,
                    kept = %cue.id,
                    shadowed = %shadowed.id,
                    "Duplicate trigger among enabled cues, last one wins"
                );
            }
        }

        debug!(
            count = by_trigger.len(),
            case_sensitive, "Built trigger index"
        );

        Self {
            by_trigger,
            case_sensitive,
        }
    }

    /// Look up the cue for a candidate trigger as typed
    pub fn lookup(&self, candidate: &str) -> Option<&Cue> {
        if self.case_sensitive {
            self.by_trigger.get(candidate)
        } else {
            self.by_trigger.get(&candidate.to_lowercase())
        }
    }

    pub fn len(&self) -> usize {
        self.by_trigger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_trigger.is_empty()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Registered triggers with their cue ids, sorted by trigger
    pub fn triggers(&self) -> Vec<(String, String)> {
        let mut triggers: Vec<_> = self
            .by_trigger
            .values()
            .map(|cue| (cue.trigger.clone(), cue.id.clone()))
            .collect();
        triggers.sort();
        triggers
    }
}

fn fold(trigger: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        trigger.to_string()
    } else {
        trigger.to_lowercase()
    }
}
