//! Persisted state document stores
//!
//! A store holds exactly one [`StateSnapshot`]. Reads return the whole
//! document, writes replace it and stamp `meta.updatedAt`. Readers never
//! observe a partial write.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use super::types::StateSnapshot;
use crate::error::{ExpanderError, Result};

/// External key-value document holding the state snapshot
pub trait DocumentStore: Send + Sync {
    /// Current document, `None` if absent or unreadable as a snapshot
    fn get(&self) -> Result<Option<StateSnapshot>>;

    /// Replace the document; returns the snapshot as stored (stamped)
    fn set(&self, snapshot: StateSnapshot) -> Result<StateSnapshot>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn get(&self) -> Result<Option<StateSnapshot>> {
        (**self).get()
    }

    fn set(&self, snapshot: StateSnapshot) -> Result<StateSnapshot> {
        (**self).set(snapshot)
    }
}

/// Change notification delivered to every subscribed context
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The document was replaced with this snapshot
    Written(Arc<StateSnapshot>),
    /// The document changed; re-read it
    Changed,
}

// ============================================================================
// Memory store
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    document: RwLock<Option<StateSnapshot>>,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

/// In-process store shared by several contexts
///
/// Clones share the same document. Every write is broadcast to all
/// subscribers, including the context that wrote it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: StateSnapshot) -> Self {
        let store = Self::new();
        *store.inner.document.write() = Some(snapshot);
        store
    }

    /// Receive an event for every subsequent write
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    fn broadcast(&self, event: StoreEvent) {
        let mut subscribers = self.inner.subscribers.lock();
        // Drop subscribers whose receiver is gone
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(subscribers = subscribers.len(), "Broadcast store change");
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self) -> Result<Option<StateSnapshot>> {
        Ok(self.inner.document.read().clone())
    }

    fn set(&self, snapshot: StateSnapshot) -> Result<StateSnapshot> {
        let stamped = snapshot.stamped();
        *self.inner.document.write() = Some(stamped.clone());
        self.broadcast(StoreEvent::Written(Arc::new(stamped.clone())));
        Ok(stamped)
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store backed by a JSON file, written atomically (temp file + rename)
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes writers within this process so they don't share the temp file
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the default snapshot if no valid document exists yet
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn ensure_initialized(&self) -> Result<StateSnapshot> {
        match self.get()? {
            Some(snapshot) => Ok(snapshot),
            None => {
                info!("Initializing state document with defaults");
                self.set(StateSnapshot::default())
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl DocumentStore for JsonFileStore {
    #[instrument(name = "state_store_get", skip(self), fields(path = %self.path.display()))]
    fn get(&self) -> Result<Option<StateSnapshot>> {
        if !self.path.exists() {
            debug!("State document not found");
            return Ok(None);
        }
        if self.path.is_dir() {
            return Err(ExpanderError::Store(format!(
                "{} is a directory, expected a JSON file",
                self.path.display()
            )));
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ExpanderError::io(&self.path, e))?;
        Ok(StateSnapshot::from_json_lenient(&content))
    }

    #[instrument(name = "state_store_set", skip(self, snapshot), fields(path = %self.path.display()))]
    fn set(&self, snapshot: StateSnapshot) -> Result<StateSnapshot> {
        let stamped = snapshot.stamped();
        let json = serde_json::to_string_pretty(&stamped)?;

        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ExpanderError::io(parent, e))?;
            }
        }

        let temp_path = self.temp_path();
        std::fs::write(&temp_path, &json).map_err(|e| ExpanderError::io(&temp_path, e))?;
        // Atomic rename (on Unix, this is atomic; on Windows, it's best-effort)
        std::fs::rename(&temp_path, &self.path).map_err(|e| ExpanderError::io(&self.path, e))?;

        info!(
            cues = stamped.cues.len(),
            variables = stamped.variables.len(),
            bytes = json.len(),
            updated_at = stamped.meta.updated_at,
            "Saved state document (atomic)"
        );
        Ok(stamped)
    }
}
