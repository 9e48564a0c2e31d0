// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bounded, cancellable producer/consumer queue
//!
//! Decouples a producer thread from a consumer thread with explicit
//! size-based backpressure across three dimensions (visible items, bytes,
//! time). One mutex, two condition variables, monitor pattern throughout:
//! a blocked `push` or `pop` releases the lock while parked and re-checks
//! its condition on every wake.
//!
//! Cancellation is the flushing flag: once set, every blocked and newly
//! arriving `push`/`pop` fails fast with [`Flushing`] until the flag is
//! cleared. Setting the flag does not discard queued items; an explicit
//! [`flush`](DataQueue::flush) does.

use crate::error::{Flushing, PushError};
use crate::events::{EventTaps, QueueEvent};
use crate::level::{QueueItem, QueueLevel, QueueLimits};
use crate::ring::SlotRing;
use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique queue id, for log attribution when several queues share a
/// subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(u64);

impl QueueId {
    fn next() -> Self {
        Self(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type FullCheck = Box<dyn Fn(&QueueLevel) -> bool + Send + Sync>;
type Hook = Box<dyn Fn() + Send + Sync>;

/// Everything guarded by the queue mutex
struct State<T> {
    ring: SlotRing<T>,
    level: QueueLevel,
    flushing: bool,
    /// A producer is parked on `space_available`
    push_waiting: bool,
    /// A consumer is parked on `item_available`
    pop_waiting: bool,
}

struct Shared<T> {
    id: QueueId,
    state: Mutex<State<T>>,
    /// Signalled when a pop (or flush, or reconfigured limits) may have made
    /// room for a parked producer
    space_available: Condvar,
    /// Signalled when a push has made an item available to a parked consumer
    item_available: Condvar,
    /// Fullness predicate; pure, runs under the lock, must not reenter the
    /// queue
    full_check: FullCheck,
    on_full: Option<Hook>,
    on_empty: Option<Hook>,
    taps: EventTaps,
}

/// Thread-safe bounded FIFO of [`QueueItem`]s.
///
/// Cloning yields another handle to the same queue; hand one clone to the
/// producer thread and one to the consumer thread. Any number of concurrent
/// producers and consumers is safe — wakeups are broadcast and every waiter
/// re-checks its condition in a loop.
///
/// Items are returned from [`pop`](Self::pop) in exactly the order they were
/// pushed, except for items removed out of band via
/// [`drop_first_matching`](Self::drop_first_matching).
pub struct DataQueue<T: QueueItem>(Arc<Shared<T>>);

impl<T: QueueItem> Clone for DataQueue<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: QueueItem> DataQueue<T> {
    pub fn builder() -> DataQueueBuilder<T> {
        DataQueueBuilder::new()
    }

    pub fn id(&self) -> QueueId {
        self.0.id
    }

    /// Append an item at the tail, blocking while the queue is full.
    ///
    /// Blocks while the fullness predicate holds, unless the queue is
    /// flushing — then it fails fast and hands the item back inside the
    /// error. On the first full observation the `on_full` hook (or the
    /// [`QueueEvent::Full`] broadcast) fires with the lock released.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let shared = &self.0;
        let mut state = shared.state.lock();
        if state.flushing {
            tracing::debug!("[DataQueue {}] Rejecting push, queue is flushing", shared.id);
            return Err(PushError(item));
        }

        if (shared.full_check)(&state.level) {
            tracing::debug!(
                "[DataQueue {}] Full at {:?}, notifying producer side",
                shared.id,
                state.level
            );
            drop(state);
            self.notify(QueueEvent::Full);
            state = shared.state.lock();
            if state.flushing {
                return Err(PushError(item));
            }
            while (shared.full_check)(&state.level) {
                state.push_waiting = true;
                shared.space_available.wait(&mut state);
                state.push_waiting = false;
                if state.flushing {
                    tracing::debug!("[DataQueue {}] Push interrupted by flush", shared.id);
                    return Err(PushError(item));
                }
            }
        }

        state.level.add(&item);
        state.ring.push_tail(item);
        tracing::trace!(
            "[DataQueue {}] Pushed item (level: {:?}, stored: {})",
            shared.id,
            state.level,
            state.ring.len()
        );
        if state.pop_waiting {
            shared.item_available.notify_all();
        }
        Ok(())
    }

    /// Remove and return the head item, blocking while the queue is empty.
    ///
    /// Ownership of the returned item transfers to the caller. On the first
    /// empty observation the `on_empty` hook (or the [`QueueEvent::Empty`]
    /// broadcast) fires with the lock released. Fails fast with [`Flushing`]
    /// if the queue is, or becomes, flushing.
    pub fn pop(&self) -> Result<T, Flushing> {
        let shared = &self.0;
        let mut state = shared.state.lock();
        if state.flushing {
            return Err(Flushing);
        }

        let mut notified_empty = false;
        loop {
            if let Some(item) = state.ring.pop_head() {
                state.level.subtract(&item);
                tracing::trace!(
                    "[DataQueue {}] Popped item (level: {:?}, stored: {})",
                    shared.id,
                    state.level,
                    state.ring.len()
                );
                if state.push_waiting {
                    shared.space_available.notify_all();
                }
                return Ok(item);
            }

            if !notified_empty {
                notified_empty = true;
                tracing::debug!("[DataQueue {}] Empty, notifying consumer side", shared.id);
                drop(state);
                self.notify(QueueEvent::Empty);
                state = shared.state.lock();
            } else {
                state.pop_waiting = true;
                shared.item_available.wait(&mut state);
                state.pop_waiting = false;
            }
            if state.flushing {
                tracing::debug!("[DataQueue {}] Pop interrupted by flush", shared.id);
                return Err(Flushing);
            }
        }
    }

    /// Observe the head item without removing it, blocking while the queue
    /// is empty.
    ///
    /// Same blocking and flushing behavior as [`pop`](Self::pop), but the
    /// item stays queued and the totals are untouched. The closure runs with
    /// the queue lock held, so it must not call back into this queue.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, Flushing> {
        let shared = &self.0;
        let mut state = shared.state.lock();
        if state.flushing {
            return Err(Flushing);
        }

        let mut notified_empty = false;
        loop {
            if let Some(item) = state.ring.peek_head() {
                return Ok(f(item));
            }

            if !notified_empty {
                notified_empty = true;
                drop(state);
                self.notify(QueueEvent::Empty);
                state = shared.state.lock();
            } else {
                state.pop_waiting = true;
                shared.item_available.wait(&mut state);
                state.pop_waiting = false;
            }
            if state.flushing {
                return Err(Flushing);
            }
        }
    }

    /// Discard every queued item and zero the totals.
    ///
    /// Items are dropped under the queue lock, so their `Drop` impls must
    /// not call back into this queue. Does not change the flushing flag:
    /// call [`set_flushing`](Self::set_flushing) first to also reject
    /// in-flight and future operations.
    pub fn flush(&self) {
        let shared = &self.0;
        let mut state = shared.state.lock();
        tracing::debug!(
            "[DataQueue {}] Flushing {} queued items",
            shared.id,
            state.ring.len()
        );
        while state.ring.pop_head().is_some() {}
        state.level = QueueLevel::default();
        // a parked producer re-observes the drained queue (and the flushing
        // flag, if set) instead of waiting forever
        if state.push_waiting {
            shared.space_available.notify_all();
        }
    }

    /// Enter or leave flushing state.
    ///
    /// Entering wakes every blocked `push`/`pop`/`peek_with`, which then
    /// return [`Flushing`]; future calls fail fast until the flag is cleared
    /// again. Queued items are kept — this only affects admission and
    /// blocking, see [`flush`](Self::flush) for discarding.
    pub fn set_flushing(&self, flushing: bool) {
        let shared = &self.0;
        let mut state = shared.state.lock();
        state.flushing = flushing;
        tracing::debug!(
            "[DataQueue {}] Flushing {}",
            shared.id,
            if flushing { "enabled" } else { "disabled" }
        );
        if flushing {
            if state.push_waiting {
                shared.space_available.notify_all();
            }
            if state.pop_waiting {
                shared.item_available.notify_all();
            }
        }
    }

    /// Remove and drop the first queued item (in FIFO order) matching
    /// `pred`, returning whether one was found.
    ///
    /// Totals are reduced by the removed item's contributions only; the
    /// relative order of the remaining items is unchanged. Works regardless
    /// of the flushing flag — this is a maintenance operation, not stream
    /// control.
    pub fn drop_first_matching(&self, pred: impl FnMut(&T) -> bool) -> bool {
        let shared = &self.0;
        let mut state = shared.state.lock();
        let Some(index) = state.ring.find_index(pred) else {
            return false;
        };
        let Some(item) = state.ring.remove_at(index) else {
            return false;
        };
        state.level.subtract(&item);
        tracing::debug!(
            "[DataQueue {}] Dropped queued item (level: {:?}, stored: {})",
            shared.id,
            state.level,
            state.ring.len()
        );
        true
    }

    /// Wake a parked producer so it re-evaluates the fullness predicate.
    ///
    /// Call after externally reconfiguring whatever the predicate reads
    /// (e.g. shared limits), so a producer blocked against the old
    /// thresholds notices without waiting for a pop.
    pub fn limits_changed(&self) {
        let shared = &self.0;
        let state = shared.state.lock();
        tracing::trace!("[DataQueue {}] Limits changed", shared.id);
        if state.push_waiting {
            shared.space_available.notify_all();
        }
    }

    /// Consistent snapshot of the three running totals
    pub fn level(&self) -> QueueLevel {
        self.0.state.lock().level
    }

    pub fn is_empty(&self) -> bool {
        self.0.state.lock().ring.is_empty()
    }

    /// Whether the fullness predicate currently holds
    pub fn is_full(&self) -> bool {
        let state = self.0.state.lock();
        (self.0.full_check)(&state.level)
    }

    /// Subscribe to [`QueueEvent`] broadcasts.
    ///
    /// Events are only broadcast for the sides that have no callback hook
    /// installed. The channel is bounded(1) and never blocks the queue; a
    /// busy listener coalesces events instead of receiving every one.
    pub fn subscribe(&self) -> Receiver<QueueEvent> {
        self.0.taps.subscribe()
    }

    fn notify(&self, event: QueueEvent) {
        let hook = match event {
            QueueEvent::Full => &self.0.on_full,
            QueueEvent::Empty => &self.0.on_empty,
        };
        match hook {
            Some(hook) => hook(),
            None => self.0.taps.broadcast(event),
        }
    }

    #[cfg(test)]
    fn lock_state(&self) -> parking_lot::MutexGuard<'_, State<T>> {
        self.0.state.lock()
    }
}

impl<T: QueueItem> fmt::Debug for DataQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.lock();
        f.debug_struct("DataQueue")
            .field("id", &self.0.id)
            .field("level", &state.level)
            .field("stored", &state.ring.len())
            .field("flushing", &state.flushing)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DataQueue`].
///
/// A fullness predicate is mandatory; install one with
/// [`full_check`](Self::full_check) or [`limits`](Self::limits).
pub struct DataQueueBuilder<T: QueueItem> {
    initial_capacity: usize,
    full_check: Option<FullCheck>,
    on_full: Option<Hook>,
    on_empty: Option<Hook>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: QueueItem> DataQueueBuilder<T> {
    fn new() -> Self {
        Self {
            initial_capacity: 16,
            full_check: None,
            on_full: None,
            on_empty: None,
            _marker: PhantomData,
        }
    }

    /// Initial slot capacity of the backing ring (it grows as needed)
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Install the fullness predicate.
    ///
    /// Pure function over the current level; it runs with the queue lock
    /// held and must not call back into the queue. Re-evaluated on every
    /// wake, never cached.
    pub fn full_check(mut self, f: impl Fn(&QueueLevel) -> bool + Send + Sync + 'static) -> Self {
        self.full_check = Some(Box::new(f));
        self
    }

    /// Install [`QueueLimits`] as the fullness predicate
    pub fn limits(self, limits: QueueLimits) -> Self {
        self.full_check(move |level| limits.is_full(level))
    }

    /// Callback invoked (lock released) when a producer finds the queue full
    pub fn on_full(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_full = Some(Box::new(f));
        self
    }

    /// Callback invoked (lock released) when a consumer finds the queue empty
    pub fn on_empty(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_empty = Some(Box::new(f));
        self
    }

    /// # Panics
    ///
    /// Panics if no fullness predicate was installed.
    pub fn build(self) -> DataQueue<T> {
        let full_check = self
            .full_check
            .expect("DataQueue requires a fullness predicate (full_check or limits)");
        let id = QueueId::next();
        tracing::debug!("[DataQueue {}] Created", id);
        DataQueue(Arc::new(Shared {
            id,
            state: Mutex::new(State {
                ring: SlotRing::with_capacity(self.initial_capacity),
                level: QueueLevel::default(),
                flushing: false,
                push_waiting: false,
                pop_waiting: false,
            }),
            space_available: Condvar::new(),
            item_available: Condvar::new(),
            full_check,
            on_full: self.on_full,
            on_empty: self.on_empty,
            taps: EventTaps::new(),
        }))
    }
}
