//! Cue Expander - text expansion for editable text surfaces
//!
//! Typed triggers (e.g. `:sig`) are replaced in place by rendered cue
//! templates. Cues, variables and settings live in one persisted state
//! document that every execution context caches and keeps in sync.

pub mod config;
pub mod error;
pub mod expand_manager;
pub mod expand_matcher;
pub mod logging;
pub mod protocol;
pub mod state;
pub mod template_variables;
pub mod text_injector;
pub mod trigger_index;
pub mod watcher;

pub use error::{ExpanderError, Result};
pub use expand_manager::{EditEvent, ExpandManager, ExpansionOutcome};
