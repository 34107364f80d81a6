//! In-process live snapshots: subscribers receive the whole current state on
//! every change, never a diff.
//!
//! Each key (a shop, a conversation) owns a `watch` channel. Publishing
//! replaces the stored snapshot, so a slow subscriber skips intermediate
//! states and only sees the latest one. Dropping the last subscription of a
//! key removes the key.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use uuid::Uuid;

use crate::models::message::Message;
use crate::models::order::Order;

/// Cancels every subscription it was handed to.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe a closed channel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

type Channels<T> = Arc<Mutex<HashMap<Uuid, watch::Sender<Option<Arc<T>>>>>>;

/// Live view of one key's snapshots.
pub struct Subscription<T> {
    key: Uuid,
    rx: watch::Receiver<Option<Arc<T>>>,
    cancel: CancelToken,
    channels: Channels<T>,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // A channel stays registered while any of its receivers lives, so the
        // entry under `key` is the one `rx` belongs to.
        let last = channels
            .get(&self.key)
            .is_some_and(|sender| sender.receiver_count() <= 1);
        if last {
            channels.remove(&self.key);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<T> Subscription<T> {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once cancelled or when the hub drops the key.
    pub async fn next(&mut self) -> Option<Arc<T>> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                        return Some(snapshot);
                    }
                }
            }
        }
    }
}

/// Keyed registry of snapshot channels.
pub struct SnapshotHub<T> {
    channels: Channels<T>,
}

impl<T> Default for SnapshotHub<T> {
    fn default() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> fmt::Debug for SnapshotHub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotHub")
            .field("keys", &self.key_count())
            .finish()
    }
}

impl<T> SnapshotHub<T> {
    /// Subscribe to future snapshots for `key`.
    pub fn subscribe(&self, key: Uuid) -> Subscription<T> {
        self.subscribe_with(key, CancelToken::new())
    }

    /// Subscribe with a caller-owned cancel token.
    pub fn subscribe_with(&self, key: Uuid, cancel: CancelToken) -> Subscription<T> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let sender = channels
            .entry(key)
            .or_insert_with(|| watch::Sender::new(None));
        Subscription {
            key,
            rx: sender.subscribe(),
            cancel,
            channels: Arc::clone(&self.channels),
        }
    }

    /// Replace the snapshot for `key`. Keys nobody listens to are dropped.
    pub fn publish(&self, key: Uuid, snapshot: T) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(sender) = channels.get(&key) else {
            return;
        };
        if sender.receiver_count() == 0 {
            channels.remove(&key);
            return;
        }
        sender.send_replace(Some(Arc::new(snapshot)));
    }

    /// Number of keys with at least one live subscriber.
    pub fn key_count(&self) -> usize {
        self.channels.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Number of live subscribers for `key`.
    pub fn subscriber_count(&self, key: Uuid) -> usize {
        self.channels
            .lock()
            .map(|c| c.get(&key).map_or(0, |s| s.receiver_count()))
            .unwrap_or_default()
    }
}

/// Live feeds shared by all handlers.
#[derive(Debug, Default)]
pub struct Realtime {
    /// Active orders per shop.
    pub orders: SnapshotHub<Vec<Order>>,
    /// Full thread per conversation.
    pub messages: SnapshotHub<Vec<Message>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscriber_receives_full_snapshots() {
        let hub: SnapshotHub<Vec<u32>> = SnapshotHub::default();
        let key = Uuid::new_v4();
        let mut sub = hub.subscribe(key);

        hub.publish(key, vec![1, 2]);
        assert_eq!(*sub.next().await.unwrap(), vec![1, 2]);

        hub.publish(key, vec![3]);
        assert_eq!(*sub.next().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn slow_subscriber_only_sees_latest() {
        let hub: SnapshotHub<&'static str> = SnapshotHub::default();
        let key = Uuid::new_v4();
        let mut sub = hub.subscribe(key);

        hub.publish(key, "first");
        hub.publish(key, "second");
        hub.publish(key, "third");
        assert_eq!(*sub.next().await.unwrap(), "third");
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let hub: SnapshotHub<u8> = SnapshotHub::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut sub_a = hub.subscribe(a);
        let _sub_b = hub.subscribe(b);

        hub.publish(b, 9);
        hub.publish(a, 1);
        assert_eq!(*sub_a.next().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancel_ends_a_pending_wait() {
        let hub: SnapshotHub<u8> = SnapshotHub::default();
        let key = Uuid::new_v4();
        let mut sub = hub.subscribe(key);
        let token = sub.cancel_token();

        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled subscription should finish")
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cancelled_subscription_ignores_later_publishes() {
        let hub: SnapshotHub<u8> = SnapshotHub::default();
        let key = Uuid::new_v4();
        let mut sub = hub.subscribe(key);
        sub.cancel_token().cancel();
        hub.publish(key, 5);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn publishing_to_an_unknown_key_is_a_no_op() {
        let hub: SnapshotHub<u8> = SnapshotHub::default();
        let key = Uuid::new_v4();
        hub.publish(key, 1);
        assert_eq!(hub.subscriber_count(key), 0);
        assert_eq!(hub.key_count(), 0);
    }

    #[test]
    fn dropping_the_last_subscription_removes_the_key() {
        let hub: SnapshotHub<u8> = SnapshotHub::default();
        let key = Uuid::new_v4();
        for _ in 0..100 {
            let _sub = hub.subscribe(Uuid::new_v4());
        }
        assert_eq!(hub.key_count(), 0);

        let first = hub.subscribe(key);
        let second = hub.subscribe(key);
        assert_eq!(hub.subscriber_count(key), 2);
        drop(first);
        assert_eq!(hub.subscriber_count(key), 1);
        assert_eq!(hub.key_count(), 1);
        drop(second);
        assert_eq!(hub.key_count(), 0);
    }

    #[tokio::test]
    async fn resubscribing_after_cleanup_still_receives() {
        let hub: SnapshotHub<u8> = SnapshotHub::default();
        let key = Uuid::new_v4();
        drop(hub.subscribe(key));
        let mut sub = hub.subscribe(key);
        hub.publish(key, 7);
        assert_eq!(*sub.next().await.unwrap(), 7);
    }
}
