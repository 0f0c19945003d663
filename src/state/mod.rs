//! State module - the synchronized cue/variable/settings document
//!
//! # Module Structure
//!
//! - `types` - Snapshot data model (Cue, Variable, Settings, Meta)
//! - `store` - Persisted document stores and change notifications
//! - `cache` - Context-local cached snapshot with derived trigger index

mod cache;
mod store;
mod types;

pub use cache::{CachedState, StateCache};
pub use store::{DocumentStore, JsonFileStore, MemoryStore, StoreEvent};
pub use types::{
    Cue, Meta, Settings, StateSnapshot, Variable, VariableType, VariableValue,
    DEFAULT_TRIGGER_PREFIX, SCHEMA_VERSION,
};
