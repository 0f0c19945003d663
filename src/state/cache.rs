//! State cache - the context-local replica of the persisted snapshot
//!
//! The cache owns the snapshot and the trigger index derived from it. Both
//! are published together behind an [`ArcSwap`] and replaced wholesale, so a
//! reader holding the previous `Arc` finishes its work on consistent data
//! while the next read sees the refreshed state.
//!
//! Refreshes are not cancelable. Change notifications that arrive while a
//! refresh is running collapse into one follow-up refresh.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use super::store::{DocumentStore, StoreEvent};
use super::types::StateSnapshot;
use crate::error::Result;
use crate::trigger_index::TriggerIndex;

/// A snapshot together with everything derived from it
#[derive(Debug, Default)]
pub struct CachedState {
    pub snapshot: StateSnapshot,
    pub index: TriggerIndex,
}

impl CachedState {
    pub fn build(snapshot: StateSnapshot) -> Self {
        let index = TriggerIndex::build(&snapshot.cues, &snapshot.settings);
        Self { snapshot, index }
    }
}

pub struct StateCache<S: DocumentStore> {
    store: S,
    current: ArcSwap<CachedState>,
    /// Held for the duration of a refresh
    refresh_lock: Mutex<()>,
    /// Set by every refresh request, cleared when a refresh starts
    pending: AtomicBool,
    /// Incremented whenever a different snapshot is installed
    generation: AtomicU64,
}

impl<S: DocumentStore> StateCache<S> {
    /// Create a cache holding the default snapshot; call [`refresh`](Self::refresh)
    /// before the first expansion
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: ArcSwap::from_pointee(CachedState::build(StateSnapshot::default())),
            refresh_lock: Mutex::new(()),
            pending: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a cache and pull the current document
    pub fn load(store: S) -> Result<Self> {
        let cache = Self::new(store);
        cache.refresh()?;
        Ok(cache)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The state to use for the next expansion cycle
    pub fn current(&self) -> Arc<CachedState> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Pull the persisted document and rebuild derived state
    ///
    /// A missing or malformed document yields the default snapshot. On error
    /// the previous state stays in place.
    #[instrument(name = "state_cache_refresh", skip(self))]
    pub fn refresh(&self) -> Result<Arc<CachedState>> {
        self.pending.store(true, Ordering::SeqCst);
        {
            let _guard = self.refresh_lock.lock();
            while self.pending.swap(false, Ordering::SeqCst) {
                self.refresh_locked()?;
            }
        }
        if self.pending.load(Ordering::SeqCst) {
            self.drain()?;
        }
        Ok(self.current())
    }

    /// The document changed somewhere; re-read it
    ///
    /// Returns `false` if the request was folded into a refresh already
    /// running on another thread.
    pub fn notify_changed(&self) -> Result<bool> {
        self.pending.store(true, Ordering::SeqCst);
        Ok(self.drain()?.is_some())
    }

    /// Apply a snapshot pushed by the environment
    ///
    /// Redundant notifications (same snapshot) and snapshots older than the
    /// current one are ignored. Returns whether the cached state changed.
    pub fn on_external_change(&self, snapshot: StateSnapshot) -> bool {
        let current = self.current();
        if snapshot.meta.updated_at < current.snapshot.meta.updated_at {
            debug!(
                incoming = snapshot.meta.updated_at,
                current = current.snapshot.meta.updated_at,
                "Ignoring stale snapshot"
            );
            return false;
        }
        self.install(snapshot)
    }

    /// Dispatch a store notification
    pub fn handle_event(&self, event: StoreEvent) -> Result<()> {
        match event {
            StoreEvent::Written(snapshot) => {
                self.on_external_change(StateSnapshot::clone(&snapshot));
            }
            StoreEvent::Changed => {
                self.notify_changed()?;
            }
        }
        Ok(())
    }

    /// Persist a snapshot and adopt it locally
    pub fn write(&self, snapshot: StateSnapshot) -> Result<Arc<CachedState>> {
        let stored = self.store.set(snapshot)?;
        self.on_external_change(stored);
        Ok(self.current())
    }

    /// Run refreshes until no request is pending
    fn drain(&self) -> Result<Option<Arc<CachedState>>> {
        let mut latest = None;
        loop {
            {
                let Some(_guard) = self.refresh_lock.try_lock() else {
                    debug!("Refresh in flight, change notification coalesced");
                    return Ok(latest);
                };
                while self.pending.swap(false, Ordering::SeqCst) {
                    self.refresh_locked()?;
                    latest = Some(self.current());
                }
            }
            // A request may have landed between the last check and unlocking
            if !self.pending.load(Ordering::SeqCst) {
                return Ok(latest);
            }
        }
    }

    fn refresh_locked(&self) -> Result<()> {
        let snapshot = self.store.get()?.unwrap_or_else(|| {
            debug!("No state document, using defaults");
            StateSnapshot::default()
        });
        self.install(snapshot);
        Ok(())
    }

    fn install(&self, snapshot: StateSnapshot) -> bool {
        if self.current.load().snapshot == snapshot {
            debug!("Snapshot unchanged, keeping cached state");
            return false;
        }

        let state = CachedState::build(snapshot);
        info!(
            cues = state.snapshot.cues.len(),
            triggers = state.index.len(),
            variables = state.snapshot.variables.len(),
            updated_at = state.snapshot.meta.updated_at,
            "State cache updated"
        );
        self.current.store(Arc::new(state));
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }
}
