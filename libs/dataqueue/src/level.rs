//! Item accounting: the three fill dimensions and the stock limit predicate

use std::time::Duration;

/// Capabilities an item must expose for the queue's accounting.
///
/// The queue only ever reads these three values (once on push, once on
/// removal); everything else about the item is opaque to it. Items the queue
/// discards internally (during [`flush`](crate::DataQueue::flush) or
/// [`drop_first_matching`](crate::DataQueue::drop_first_matching)) are
/// released through their `Drop` impl; items handed back from
/// [`pop`](crate::DataQueue::pop) transfer ownership to the caller untouched.
pub trait QueueItem {
    /// Size contribution of this item, in bytes
    fn size_bytes(&self) -> u64;

    /// Time contribution of this item. There is no "unknown" value; items
    /// without a meaningful duration report `Duration::ZERO`.
    fn duration(&self) -> Duration;

    /// Whether this item counts toward the visible-item dimension.
    ///
    /// Invisible items (e.g. metadata-only entries) still occupy a slot and
    /// contribute to the byte and time dimensions.
    fn is_visible(&self) -> bool {
        true
    }
}

/// Point-in-time snapshot of the queue's three running totals.
///
/// Taken under the queue lock and returned by value, so the three fields are
/// always mutually consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueLevel {
    /// Number of stored items with `is_visible() == true`
    pub visible: u64,
    /// Sum of stored items' `size_bytes()`
    pub bytes: u64,
    /// Sum of stored items' `duration()`
    pub time: Duration,
}

impl QueueLevel {
    pub(crate) fn add(&mut self, item: &impl QueueItem) {
        self.visible += u64::from(item.is_visible());
        self.bytes += item.size_bytes();
        self.time += item.duration();
    }

    pub(crate) fn subtract(&mut self, item: &impl QueueItem) {
        self.visible -= u64::from(item.is_visible());
        self.bytes -= item.size_bytes();
        self.time -= item.duration();
    }
}

/// Stock fullness limits over the three level dimensions.
///
/// `None` leaves a dimension unlimited. The queue is treated as full once
/// any limited dimension reaches its limit, so a producer blocks on the push
/// that would exceed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueLimits {
    pub max_visible: Option<u64>,
    pub max_bytes: Option<u64>,
    pub max_time: Option<Duration>,
}

impl QueueLimits {
    pub fn is_full(&self, level: &QueueLevel) -> bool {
        self.max_visible.is_some_and(|max| level.visible >= max)
            || self.max_bytes.is_some_and(|max| level.bytes >= max)
            || self.max_time.is_some_and(|max| level.time >= max)
    }
}
