//! Full/empty notification fallback
//!
//! When a queue is built without an `on_full` / `on_empty` callback, the
//! corresponding condition is broadcast to subscriber channels instead.
//! Each subscriber gets a bounded(1) channel and sends are non-blocking, so
//! a slow listener coalesces notifications rather than stalling the queue's
//! producer or consumer thread.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

/// Queue condition observed by a producer or consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// A producer found the queue full (per the fullness predicate)
    Full,
    /// A consumer found the queue empty
    Empty,
}

/// Subscriber channels for [`QueueEvent`] broadcasts
pub(crate) struct EventTaps {
    senders: Mutex<Vec<Sender<QueueEvent>>>,
}

impl EventTaps {
    pub(crate) fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Add a subscriber.
    ///
    /// The channel is bounded with capacity 1: if the listener has not
    /// consumed the previous event yet, new ones are dropped.
    pub(crate) fn subscribe(&self) -> Receiver<QueueEvent> {
        let (tx, rx) = bounded(1);
        self.senders.lock().push(tx);
        rx
    }

    /// Broadcast an event to all subscribers without blocking, pruning
    /// subscribers whose receiver is gone.
    pub(crate) fn broadcast(&self, event: QueueEvent) {
        self.senders
            .lock()
            .retain(|tx| !matches!(tx.try_send(event), Err(TrySendError::Disconnected(_))));
    }
}
