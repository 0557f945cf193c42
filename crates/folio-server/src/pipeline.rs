//! Change pipeline: cache invalidation plus debounced build dispatch.

use std::sync::Arc;
use std::time::Duration;

use folio_dispatch::{BuildTrigger, ChangeEvent};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::cache::SharedCache;

/// Default quiet window before a dispatch fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Owns the debounce timer for one store.
///
/// Every event clears the cache and (re)schedules a dispatch after the quiet
/// window. Only the last event of a burst is dispatched. Cancelling only
/// affects a dispatch that has not started yet.
pub struct ChangePipeline {
    cache: SharedCache,
    trigger: Arc<dyn BuildTrigger>,
    quiet_window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ChangePipeline {
    pub fn new(cache: SharedCache, trigger: Arc<dyn BuildTrigger>, quiet_window: Duration) -> Arc<Self> {
        Arc::new(Self {
            cache,
            trigger,
            quiet_window,
            pending: Mutex::new(None),
            consumer: Mutex::new(None),
        })
    }

    /// Consume events from a watcher until the channel closes or
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn start(self: &Arc<Self>, mut events: mpsc::Receiver<ChangeEvent>) {
        let pipeline = Arc::clone(self);
        let consumer = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                pipeline.handle(event).await;
            }
            tracing::debug!("Change event channel closed");
        });

        if let Some(previous) = self.consumer.lock().await.replace(consumer) {
            previous.abort();
        }
    }

    /// Invalidate the cache and schedule a dispatch for this event.
    pub async fn handle(&self, event: ChangeEvent) {
        self.cache.write().await.invalidate();

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let trigger = Arc::clone(&self.trigger);
        let quiet_window = self.quiet_window;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_window).await;
            // Detached so a later event cannot cancel a dispatch in flight.
            tokio::spawn(async move {
                trigger.dispatch(&event).await;
            });
        }));
    }

    /// Whether a dispatch is scheduled but has not fired yet.
    pub async fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop consuming events and cancel any scheduled dispatch.
    pub async fn shutdown(&self) {
        if let Some(consumer) = self.consumer.lock().await.take() {
            consumer.abort();
        }
        if let Some(pending) = self.pending.lock().await.take() {
            pending.abort();
        }
    }
}
