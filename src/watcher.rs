use notify::{recommended_watcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ExpanderError, Result};
use crate::state::StoreEvent;

/// Watches the JSON state document and emits [`StoreEvent::Changed`]
///
/// Writes from any process (including this one) are reported. Bursts of
/// filesystem events within the debounce window collapse into one event.
pub struct StoreWatcher {
    path: PathBuf,
    debounce: Duration,
    tx: Option<Sender<StoreEvent>>,
    watcher_thread: Option<thread::JoinHandle<()>>,
}

impl StoreWatcher {
    /// Create a new StoreWatcher
    ///
    /// Returns a tuple of (watcher, receiver) where receiver will emit
    /// StoreEvent::Changed when the document changes.
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> (Self, Receiver<StoreEvent>) {
        let (tx, rx) = channel();
        let watcher = StoreWatcher {
            path: path.into(),
            debounce,
            tx: Some(tx),
            watcher_thread: None,
        };
        (watcher, rx)
    }

    /// Start watching in a background thread
    pub fn start(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| ExpanderError::Watch("watcher already started".to_string()))?;
        let path = self.path.clone();
        let debounce = self.debounce;

        let thread_handle = thread::spawn(move || {
            if let Err(e) = Self::watch_loop(&path, debounce, tx) {
                warn!(error = %e, watcher = "state", "State watcher error");
            }
        });

        self.watcher_thread = Some(thread_handle);
        Ok(())
    }

    /// Internal watch loop running in background thread
    fn watch_loop(path: &Path, debounce: Duration, tx: Sender<StoreEvent>) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| ExpanderError::Watch(format!("not a file path: {}", path.display())))?;

        // Watch the parent directory so atomic renames are seen
        let watch_path = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&watch_path).map_err(|e| ExpanderError::io(&watch_path, e))?;

        let debounce_active = Arc::new(AtomicBool::new(false));

        // Channel for the file watcher thread
        let (watch_tx, watch_rx) = channel();

        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = watch_tx.send(res);
        })?;
        watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;

        info!(
            path = %watch_path.display(),
            target = ?file_name,
            "State watcher started"
        );

        loop {
            match watch_rx.recv() {
                Ok(Ok(event)) => {
                    let is_document = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));

                    // Create covers the rename of the temp file onto the document
                    let is_relevant_event = matches!(
                        event.kind,
                        notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                    );

                    if !(is_document && is_relevant_event) {
                        continue;
                    }

                    if debounce_active.swap(true, Ordering::SeqCst) {
                        debug!("State change folded into pending reload");
                        continue;
                    }

                    let tx_clone = tx.clone();
                    let debounce_flag = Arc::clone(&debounce_active);
                    thread::spawn(move || {
                        thread::sleep(debounce);
                        debounce_flag.store(false, Ordering::SeqCst);
                        if tx_clone.send(StoreEvent::Changed).is_ok() {
                            info!("State document changed, emitting reload event");
                        }
                    });
                }
                Ok(Err(e)) => {
                    warn!(error = %e, watcher = "state", "File watcher error");
                }
                Err(_) => {
                    // Channel closed, exit watch loop
                    info!(watcher = "state", "State watcher shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
