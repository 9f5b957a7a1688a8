use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, broadcast};
use tokio_util::sync::CancellationToken;

use super::debounce::spawn_debounced;
use super::{HistoryStore, PersistenceError};
use crate::store::ItemStore;

struct Inner {
    store: ItemStore,
    history: Arc<HistoryStore>,
    dirty: AtomicBool,
    writes: AtomicUsize,
    write_lock: Mutex<()>,
}

impl Inner {
    /// Writes the history as it is right now. An empty history removes the file.
    async fn write(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.dirty.store(false, Ordering::SeqCst);

        let snapshot = self.store.snapshot().await;
        let history = Arc::clone(&self.history);
        tokio::task::spawn_blocking(move || {
            if snapshot.items.is_empty() && snapshot.paste_history.is_empty() {
                history.clear()
            } else {
                history.save(&snapshot)
            }
        })
        .await
        .map_err(|e| PersistenceError::Io(std::io::Error::other(e)))??;

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps the history file in step with an [`ItemStore`].
///
/// Every store change marks the history dirty; a burst of changes results in
/// a single write once the store has been quiet for the debounce window.
pub struct Persister {
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

impl Persister {
    pub fn spawn(store: ItemStore, history: Arc<HistoryStore>, window: Duration) -> Self {
        let inner = Arc::new(Inner {
            store: store.clone(),
            history,
            dirty: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            write_lock: Mutex::new(()),
        });
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());

        let mut events = store.subscribe();
        let listener = Arc::clone(&inner);
        let notify = Arc::clone(&trigger);
        let stop = cancel.clone();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    () = stop.cancelled() => break,
                    received = events.recv() => received,
                };
                match received {
                    // A lagged receiver still means something changed.
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        listener.dirty.store(true, Ordering::SeqCst);
                        notify.notify_one();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let writer = Arc::clone(&inner);
        spawn_debounced(window, trigger, cancel.clone(), move || {
            let writer = Arc::clone(&writer);
            async move {
                if !writer.dirty.load(Ordering::SeqCst) {
                    return;
                }
                if let Err(e) = writer.write().await {
                    tracing::error!(error = %e, "failed to save history");
                }
            }
        });

        Self { inner, cancel }
    }

    /// Writes immediately; a pending debounced write becomes a no-op.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.inner.write().await
    }

    /// Number of completed writes.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Clears the in-memory history and the file together.
    ///
    /// A full clear deletes the file; keeping useful items rewrites it.
    pub async fn clear_history(&self, keep_useful: bool) -> Result<usize, PersistenceError> {
        let removed = self.inner.store.clear(keep_useful).await;
        self.flush().await?;
        Ok(removed)
    }

    /// Stops background work and writes any pending changes.
    pub async fn shutdown(self) -> Result<(), PersistenceError> {
        self.cancel.cancel();
        self.flush().await
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
