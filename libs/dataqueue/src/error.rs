use std::fmt;
use thiserror::Error;

/// The queue is in flushing state; the operation failed fast.
///
/// This is an expected control-flow outcome, not an exceptional one: a
/// consumer typically maps it into ending its processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is flushing")]
pub struct Flushing;

/// A push rejected because the queue is (or became) flushing.
///
/// Carries the rejected item back to the caller: on failure the queue has
/// not stored, inspected, or dropped it, so ownership stays where it was.
#[derive(Error)]
#[error("queue is flushing")]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Recover the rejected item
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impl so `T` needs no `Debug` bound.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PushError").finish_non_exhaustive()
    }
}
