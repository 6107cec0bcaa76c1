//! Latest-value publication with callbacks and async watchers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by `Observable::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Holds the latest value of a stream.
///
/// Publishing never waits on observers. Callbacks run on the publishing
/// thread, outside the subscriber lock, and may unsubscribe themselves.
pub struct Observable<T> {
    tx: watch::Sender<T>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Latest published value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and notify every observer
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value.clone());

        let subscribers: Vec<Callback<T>> =
            self.subscribers.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in subscribers {
            callback(&value);
        }
    }

    /// Register a callback; it is invoked at once with the current value
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: Callback<T> = Arc::new(callback);
        self.subscribers.lock().push((id, callback.clone()));
        callback(&self.get());
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Async receiver that observes every later publication
    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_publish() {
        let observable = Observable::new(1u64);
        assert_eq!(observable.get(), 1);
        observable.publish(5);
        assert_eq!(observable.get(), 5);
    }

    #[test]
    fn test_subscribe_receives_current_and_later_values() {
        let observable = Observable::new(0u64);
        observable.publish(3);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = observable.subscribe(move |v| sink.lock().push(*v));

        observable.publish(4);
        assert!(observable.unsubscribe(id));
        observable.publish(5);

        assert_eq!(*seen.lock(), vec![3, 4]);
        assert!(!observable.unsubscribe(id));
        assert_eq!(observable.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let observable = Arc::new(Observable::new(0u64));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&observable);
        let own = slot.clone();
        let id = observable.subscribe(move |v| {
            if *v > 0 {
                if let (Some(observable), Some(id)) = (weak.upgrade(), *own.lock()) {
                    observable.unsubscribe(id);
                }
            }
        });
        *slot.lock() = Some(id);

        observable.publish(1);
        assert_eq!(observable.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_watch_receiver() {
        let observable = Observable::new(String::from("idle"));
        let mut rx = observable.watch();

        observable.publish("risk".to_string());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), "risk");
    }
}
