// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bounded, flushable producer/consumer queue for real-time media pipelines
//!
//! The streaming side of a pipeline (a render thread, a network receiver)
//! rarely runs in lockstep with the processing side. [`DataQueue`] decouples
//! the two threads with explicit backpressure: a caller-supplied fullness
//! predicate bounds the queue across three independent dimensions — visible
//! item count, byte size, and accumulated duration — and a producer that
//! would overfill the queue blocks until a consumer makes room.
//!
//! Teardown is cooperative rather than forceful. Flipping the queue into
//! flushing state ([`DataQueue::set_flushing`]) immediately wakes every
//! blocked caller with a [`Flushing`] result and keeps rejecting new work
//! until the flag is cleared; an explicit [`DataQueue::flush`] discards
//! whatever is still queued. Storage is a growable circular array
//! ([`SlotRing`]), so steady-state operation never allocates per item.
//!
//! # Example
//!
//! ```
//! use dataqueue::{DataQueue, QueueItem, QueueLimits};
//! use std::time::Duration;
//!
//! struct Chunk {
//!     data: Vec<u8>,
//! }
//!
//! impl QueueItem for Chunk {
//!     fn size_bytes(&self) -> u64 {
//!         self.data.len() as u64
//!     }
//!     fn duration(&self) -> Duration {
//!         Duration::ZERO
//!     }
//! }
//!
//! let queue = DataQueue::builder()
//!     .limits(QueueLimits {
//!         max_visible: Some(8),
//!         ..QueueLimits::default()
//!     })
//!     .build();
//!
//! queue.push(Chunk { data: vec![0u8; 1024] }).unwrap();
//! let chunk = queue.pop().unwrap();
//! assert_eq!(chunk.data.len(), 1024);
//! ```

pub mod error;
pub mod events;
pub mod level;
pub mod queue;
pub mod ring;

pub use error::{Flushing, PushError};
pub use events::QueueEvent;
pub use level::{QueueItem, QueueLevel, QueueLimits};
pub use queue::{DataQueue, DataQueueBuilder, QueueId};
pub use ring::{SlotIndex, SlotRing};
