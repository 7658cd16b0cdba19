//! Change notifications for store subscribers.
//!
//! # Design Principles
//!
//! - Subscribers are notified after mutations are committed
//! - At most one notification per batching tick, carrying the new generation
//! - Subscribers only see notifications published after they subscribed

use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;

use crate::types::StoreChange;

/// One batch of committed changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Store generation after the last change in the batch.
    pub generation: u64,
    /// Every change in the batch, in commit order.
    pub changes: Vec<StoreChange>,
}

/// A subscription to store notifications.
pub struct Subscription {
    receiver: Receiver<Notification>,
}

impl Subscription {
    fn new(receiver: Receiver<Notification>) -> Self {
        Self { receiver }
    }

    /// Blocks until the next notification, or returns `None` once the store
    /// has been dropped.
    pub fn recv(&self) -> Option<Notification> {
        self.receiver.recv().ok()
    }

    /// Returns the next notification if one is already queued.
    pub fn try_recv(&self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Drains every queued notification without blocking.
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }

    /// Blocking iterator that ends when the store goes away.
    pub fn iter(&self) -> impl Iterator<Item = Notification> + '_ {
        std::iter::from_fn(|| self.recv())
    }
}

/// Fan-out of notifications to every live subscriber.
#[derive(Debug, Default)]
pub struct NotificationHub {
    subscribers: Mutex<Vec<Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        Subscription::new(receiver)
    }

    /// Sends `notification` to every subscriber, pruning dropped ones.
    pub fn publish(&self, notification: Notification) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| sender.send(notification.clone()).is_ok());
    }

    /// Count of registered subscribers, including dropped ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
