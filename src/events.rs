//! Change notifications for long-lived consumers
//!
//! Each subscriber gets its own worker thread and pending queue, so `publish`
//! only enqueues and returns. A slow or panicking listener delays nobody but
//! itself. Notifications carry just the category that changed; listeners
//! re-read the values they care about from the manager, so repeated
//! notifications for a category still waiting in a queue collapse into one.

use crate::error::{Error, Result};
use crate::setting::Category;
use crate::sync::MutexExt;
use log::{debug, warn};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;

/// Handle returned by [`ChangeNotifier::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    /// Categories not yet handed to the listener, in publish order, no repeats
    pending: Arc<Mutex<Vec<Category>>>,
    wake: SyncSender<()>,
}

impl Subscriber {
    /// Queue `category`; `false` once the worker is gone
    fn notify(&self, category: Category) -> bool {
        {
            let mut pending = self.pending.lock_recovered();
            if !pending.contains(&category) {
                pending.push(category);
            }
        }
        !matches!(self.wake.try_send(()), Err(TrySendError::Disconnected(())))
    }
}

/// Best-effort, asynchronous publish/subscribe point
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener, called on its own thread for every publish
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the worker thread cannot be spawned.
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriberId>
    where
        F: Fn(Category) + Send + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let pending = Arc::new(Mutex::new(Vec::new()));
        let (wake, woken) = mpsc::sync_channel::<()>(1);

        let queue = Arc::clone(&pending);
        thread::Builder::new()
            .name(format!("tiercfg-subscriber-{}", id.0))
            .spawn(move || {
                while woken.recv().is_ok() {
                    let batch = std::mem::take(&mut *queue.lock_recovered());
                    for category in batch {
                        if catch_unwind(AssertUnwindSafe(|| listener(category))).is_err() {
                            warn!("Subscriber {} panicked handling '{category}'", id.0);
                        }
                    }
                }
                debug!("Subscriber {} stopped", id.0);
            })
            .map_err(|e| Error::Config(format!("failed to spawn subscriber thread: {e}")))?;

        self.subscribers
            .lock_recovered()
            .push(Subscriber { id, pending, wake });
        debug!("Subscriber {} registered", id.0);
        Ok(id)
    }

    /// Remove a listener. Its worker finishes any queued notifications and exits.
    ///
    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock_recovered();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    /// Tell every subscriber that `category` changed. Never blocks on listeners.
    pub fn publish(&self, category: Category) {
        let mut subscribers = self.subscribers.lock_recovered();
        debug!(
            "Publishing change of '{category}' to {} subscriber(s)",
            subscribers.len()
        );
        subscribers.retain(|s| {
            let delivered = s.notify(category);
            if !delivered {
                warn!("Subscriber {} disconnected, dropping it", s.id.0);
            }
            delivered
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock_recovered().len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::RecvTimeoutError;
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let notifier = ChangeNotifier::new();
        let (tx, rx) = mpsc::channel();

        for n in 0..2 {
            let tx = tx.clone();
            notifier
                .subscribe(move |category| tx.send((n, category)).unwrap())
                .unwrap();
        }

        notifier.publish(Category::Schedule);

        let mut seen = vec![rx.recv_timeout(WAIT).unwrap(), rx.recv_timeout(WAIT).unwrap()];
        seen.sort_by_key(|(n, _)| *n);
        assert_eq!(seen, vec![(0, Category::Schedule), (1, Category::Schedule)]);
    }

    #[test]
    fn test_publish_does_not_wait_for_slow_listener() {
        let notifier = ChangeNotifier::new();
        let (tx, rx) = mpsc::channel();
        notifier
            .subscribe(move |category| {
                thread::sleep(Duration::from_millis(300));
                tx.send(category).unwrap();
            })
            .unwrap();

        let started = Instant::now();
        notifier.publish(Category::Stocks);
        notifier.publish(Category::Email);
        assert!(started.elapsed() < Duration::from_millis(200));

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Category::Stocks);
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Category::Email);
    }

    #[test]
    fn test_stuck_listener_queue_collapses_repeats() {
        let notifier = ChangeNotifier::new();
        let gate = Arc::new(Mutex::new(()));
        let (tx, rx) = mpsc::channel();

        let held = gate.lock().unwrap();
        let listener_gate = Arc::clone(&gate);
        notifier
            .subscribe(move |category| {
                let _open = listener_gate.lock().unwrap();
                tx.send(category).unwrap();
            })
            .unwrap();

        for _ in 0..500 {
            notifier.publish(Category::Schedule);
            notifier.publish(Category::Stocks);
        }
        drop(held);

        let mut delivered = Vec::new();
        while let Ok(category) = rx.recv_timeout(Duration::from_millis(300)) {
            delivered.push(category);
        }
        assert!((2..=4).contains(&delivered.len()), "{delivered:?}");
        assert_eq!(delivered.last(), Some(&Category::Stocks));
        assert!(delivered.contains(&Category::Schedule));
    }

    #[test]
    fn test_panicking_listener_keeps_running() {
        let notifier = ChangeNotifier::new();
        let (tx, rx) = mpsc::channel();
        notifier
            .subscribe(move |category| {
                if category == Category::General {
                    panic!("listener failure");
                }
                tx.send(category).unwrap();
            })
            .unwrap();

        notifier.publish(Category::General);
        notifier.publish(Category::Schedule);

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Category::Schedule);
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = ChangeNotifier::new();
        let (tx, rx) = mpsc::channel();
        let id = notifier
            .subscribe(move |category| tx.send(category).unwrap())
            .unwrap();

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.publish(Category::Schedule);

        assert_eq!(
            rx.recv_timeout(WAIT),
            Err(RecvTimeoutError::Disconnected)
        );
    }
}
