// One-shot error notification queue shared by the controller and its callers.

use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type ErrorCallback = Box<dyn FnOnce(&str) + Send>;

/// Pending subscribers waiting for the next error.
///
/// Every `notify` drains the whole queue: each subscriber hears about exactly
/// one error and must subscribe again to hear about later ones.
#[derive(Default)]
pub struct ErrorRegistry {
    subscribers: Mutex<Vec<ErrorCallback>>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, Vec<ErrorCallback>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a callback for the next error.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce(&str) + Send + 'static,
    {
        self.queue().push(Box::new(callback));
    }

    /// Await the next error instead of registering a callback.
    pub fn subscribe_once(&self) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.subscribe(move |message| {
            let _ = tx.send(message.to_string());
        });
        rx
    }

    /// Deliver `message` to every current subscriber and empty the queue.
    /// Returns the number of subscribers reached.
    pub fn notify(&self, message: &str) -> usize {
        // Taken out before invoking so callbacks can resubscribe without
        // deadlocking; those late subscribers wait for the next error.
        let subscribers = std::mem::take(&mut *self.queue());
        let count = subscribers.len();

        if count == 0 {
            warn!("[NOTIFY] No error subscribers, dropping: {}", message);
        } else {
            debug!("[NOTIFY] Delivering error to {} subscriber(s)", count);
        }

        for callback in subscribers {
            callback(message);
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.queue().len()
    }
}

/// Forward every future error to `forward`, re-arming after each delivery.
pub fn watch_errors<F>(registry: &Arc<ErrorRegistry>, forward: F)
where
    F: Fn(&str) + Send + Sync + 'static,
{
    arm(registry, Arc::new(forward));
}

fn arm(registry: &Arc<ErrorRegistry>, forward: Arc<dyn Fn(&str) + Send + Sync>) {
    let weak = Arc::downgrade(registry);
    registry.subscribe(move |message| {
        forward(message);
        if let Some(registry) = weak.upgrade() {
            arm(&registry, forward);
        }
    });
}
