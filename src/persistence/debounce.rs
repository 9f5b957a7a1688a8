use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default quiet period before a burst of changes is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

/// Runs `action` once per burst of `trigger` notifications, after `window`
/// has passed without a new one.
///
/// A notification that arrives while `action` runs starts the next burst.
pub fn spawn_debounced<F, Fut>(
    window: Duration,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    action: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = trigger.notified() => {}
            }

            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = trigger.notified() => {}
                    () = tokio::time::sleep(window) => break,
                }
            }

            action().await;
        }
    })
}
