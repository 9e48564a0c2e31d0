//! Growable circular queue backing the data queue
//!
//! A single resizable array instead of a linked structure, so pushing and
//! popping never allocate per item. Not thread-safe on its own; `DataQueue`
//! wraps it in a mutex.
//!
//! Key properties:
//! - O(1) push to tail / pop from head (amortized across growth)
//! - 1.5x growth, unwrapping the circular region into the new allocation
//! - O(n) linear search and removal of an arbitrary interior element
//! - Strict FIFO order, preserved across growth and interior removal

/// Opaque cursor into a [`SlotRing`], as returned by [`SlotRing::find_index`].
///
/// Wraps a physical slot index, not a logical FIFO offset. It stays valid
/// only until the ring is next mutated; [`SlotRing::remove_at`] on a stale
/// cursor returns `None` when the slot is vacant, but a cursor held across
/// mutations may also name a different live element, so always remove with a
/// freshly obtained cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotIndex(usize);

/// Growable array-backed circular FIFO
pub struct SlotRing<T> {
    /// Physical storage; `None` marks a vacant slot
    slots: Vec<Option<T>>,
    /// Physical index of the logical head
    head: usize,
    /// Physical index of the next free slot
    tail: usize,
    len: usize,
}

/// Splits the occupied region into at most two contiguous index ranges in
/// head-to-tail logical order. The second range is empty unless the region
/// wraps past the end of the array.
fn wrap_segments(
    head: usize,
    len: usize,
    capacity: usize,
) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    if capacity == 0 {
        return (0..0, 0..0);
    }
    let first_len = len.min(capacity - head);
    (head..head + first_len, 0..len - first_len)
}

impl<T> SlotRing<T> {
    /// Create an empty ring with the given initial capacity.
    ///
    /// The capacity is only a starting point; the ring grows to accommodate
    /// every push. Bounding is the caller's job (the data queue does it with
    /// its fullness predicate).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current physical capacity (grows over time, never shrinks)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append an item at the logical tail, growing the array if full
    pub fn push_tail(&mut self, item: T) {
        if self.len == self.slots.len() {
            self.grow();
        }
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.slots.len();
        self.len += 1;
    }

    /// Remove and return the logical head item
    pub fn pop_head(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        item
    }

    /// Return the logical head item without removing it
    pub fn peek_head(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Linear scan from head to tail, returning a cursor to the first item
    /// for which `pred` holds
    pub fn find_index(&self, mut pred: impl FnMut(&T) -> bool) -> Option<SlotIndex> {
        for i in 0..self.len {
            let phys = (self.head + i) % self.slots.len();
            if let Some(item) = self.slots[phys].as_ref() {
                if pred(item) {
                    return Some(SlotIndex(phys));
                }
            }
        }
        None
    }

    /// Remove and return the element at a cursor freshly obtained from
    /// [`find_index`](Self::find_index).
    ///
    /// Shifts the shorter of the two surrounding runs by one slot, adjusting
    /// head or tail so neither wraps incorrectly. Returns `None` if the
    /// cursor names a vacant slot.
    pub fn remove_at(&mut self, index: SlotIndex) -> Option<T> {
        let capacity = self.slots.len();
        if self.len == 0 {
            return None;
        }
        let idx = index.0;
        let last = (self.tail + capacity - 1) % capacity;
        let item = self.slots[idx].take()?;

        if idx == self.head {
            // removing the head: just advance it
            self.head = (self.head + 1) % capacity;
        } else if idx == last {
            // removing the last occupied slot: retreat the tail
            self.tail = last;
        } else if self.head < last {
            // occupied region is contiguous; close the gap toward the head
            for i in idx..last {
                self.slots[i] = self.slots[i + 1].take();
            }
            self.tail = last;
        } else if idx > self.head {
            // wrapped region, removal in the high segment: shift
            // [head, idx) up by one and advance the head
            for i in (self.head..idx).rev() {
                self.slots[i + 1] = self.slots[i].take();
            }
            self.head = (self.head + 1) % capacity;
        } else {
            // wrapped region, removal in the low segment: shift (idx, last]
            // down by one and retreat the tail
            for i in idx..last {
                self.slots[i] = self.slots[i + 1].take();
            }
            self.tail = last;
        }

        self.len -= 1;
        Some(item)
    }

    /// Iterate the stored items in logical (FIFO) order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % self.slots.len()].as_ref())
    }

    /// Reallocate at 1.5x (minimum +1 slot) and unwrap the circular region
    /// into the new array starting at index 0.
    fn grow(&mut self) {
        let capacity = self.slots.len();
        let new_capacity = usize::max(capacity + capacity / 2, capacity + 1);
        let mut slots: Vec<Option<T>> = Vec::with_capacity(new_capacity);
        let (first, second) = wrap_segments(self.head, self.len, capacity);
        for i in first.chain(second) {
            slots.push(self.slots[i].take());
        }
        slots.resize_with(new_capacity, || None);
        self.slots = slots;
        self.head = 0;
        self.tail = self.len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(ring: &SlotRing<u32>) -> Vec<u32> {
        ring.iter().copied().collect()
    }

    #[test]
    fn test_wrap_segments_contiguous() {
        assert_eq!(wrap_segments(0, 4, 4), (0..4, 0..0));
        assert_eq!(wrap_segments(1, 2, 4), (1..3, 0..0));
        assert_eq!(wrap_segments(3, 1, 4), (3..4, 0..0));
    }

    #[test]
    fn test_wrap_segments_wrapped() {
        assert_eq!(wrap_segments(3, 2, 4), (3..4, 0..1));
        assert_eq!(wrap_segments(2, 4, 4), (2..4, 0..2));
        assert_eq!(wrap_segments(1, 4, 4), (1..4, 0..1));
    }

    #[test]
    fn test_wrap_segments_empty() {
        assert_eq!(wrap_segments(2, 0, 4), (2..2, 0..0));
        assert_eq!(wrap_segments(0, 0, 0), (0..0, 0..0));
    }

    #[test]
    fn test_push_pop_fifo() {
        let mut ring = SlotRing::with_capacity(4);
        assert!(ring.is_empty());
        for i in 0..3 {
            ring.push_tail(i);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop_head(), Some(0));
        assert_eq!(ring.pop_head(), Some(1));
        assert_eq!(ring.pop_head(), Some(2));
        assert_eq!(ring.pop_head(), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_peek_head() {
        let mut ring = SlotRing::with_capacity(2);
        assert_eq!(ring.peek_head(), None);
        ring.push_tail(7u32);
        assert_eq!(ring.peek_head(), Some(&7));
        // peeking does not consume
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.pop_head(), Some(7));
    }

    #[test]
    fn test_growth_preserves_order() {
        let mut ring = SlotRing::with_capacity(2);
        for i in 0..10u32 {
            ring.push_tail(i);
        }
        assert!(ring.capacity() >= 10);
        assert_eq!(collect(&ring), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_growth_factor() {
        let mut ring: SlotRing<u32> = SlotRing::with_capacity(4);
        for i in 0..5 {
            ring.push_tail(i);
        }
        // 4 -> max(4 + 2, 5) = 6
        assert_eq!(ring.capacity(), 6);

        let mut tiny: SlotRing<u32> = SlotRing::with_capacity(0);
        tiny.push_tail(0);
        assert_eq!(tiny.capacity(), 1);
        tiny.push_tail(1);
        assert_eq!(tiny.capacity(), 2);
    }

    #[test]
    fn test_grow_while_wrapped() {
        // Fill to capacity, pop two so the head advances, then push past
        // the wrap point and force growth with a wrapped occupied region.
        let mut ring = SlotRing::with_capacity(4);
        for i in 0..4u32 {
            ring.push_tail(i);
        }
        assert_eq!(ring.pop_head(), Some(0));
        assert_eq!(ring.pop_head(), Some(1));
        for i in 4..7u32 {
            ring.push_tail(i);
        }
        assert_eq!(collect(&ring), vec![2, 3, 4, 5, 6]);
        let mut drained = Vec::new();
        while let Some(item) = ring.pop_head() {
            drained.push(item);
        }
        assert_eq!(drained, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_find_index_fifo_order() {
        let mut ring = SlotRing::with_capacity(4);
        ring.push_tail(10u32);
        ring.push_tail(20);
        ring.push_tail(20);
        let idx = ring.find_index(|&v| v == 20).unwrap();
        // first match in FIFO order, i.e. the earlier of the two 20s
        assert_eq!(ring.remove_at(idx), Some(20));
        assert_eq!(collect(&ring), vec![10, 20]);
        assert!(ring.find_index(|&v| v == 99).is_none());
    }

    #[test]
    fn test_remove_at_head_and_sole_element() {
        let mut ring = SlotRing::with_capacity(4);
        ring.push_tail(1u32);
        let idx = ring.find_index(|_| true).unwrap();
        assert_eq!(ring.remove_at(idx), Some(1));
        assert!(ring.is_empty());
        // ring keeps working after removal of the sole element
        ring.push_tail(2);
        assert_eq!(ring.pop_head(), Some(2));
    }

    #[test]
    fn test_remove_at_tail() {
        let mut ring = SlotRing::with_capacity(4);
        for i in 0..3u32 {
            ring.push_tail(i);
        }
        let idx = ring.find_index(|&v| v == 2).unwrap();
        assert_eq!(ring.remove_at(idx), Some(2));
        assert_eq!(collect(&ring), vec![0, 1]);
        ring.push_tail(5);
        assert_eq!(collect(&ring), vec![0, 1, 5]);
    }

    #[test]
    fn test_remove_at_interior_contiguous() {
        let mut ring = SlotRing::with_capacity(8);
        for i in 0..5u32 {
            ring.push_tail(i);
        }
        let idx = ring.find_index(|&v| v == 2).unwrap();
        assert_eq!(ring.remove_at(idx), Some(2));
        assert_eq!(collect(&ring), vec![0, 1, 3, 4]);
        assert_eq!(ring.len(), 4);
    }

    /// Builds a ring whose occupied region wraps the array boundary:
    /// capacity 4, head at 2, physical layout [4, 5, 2, 3].
    fn wrapped_ring() -> SlotRing<u32> {
        let mut ring = SlotRing::with_capacity(4);
        for i in 0..4u32 {
            ring.push_tail(i);
        }
        ring.pop_head();
        ring.pop_head();
        ring.push_tail(4);
        ring.push_tail(5);
        assert_eq!(collect(&ring), vec![2, 3, 4, 5]);
        ring
    }

    #[test]
    fn test_remove_at_wrapped_high_segment() {
        let mut ring = wrapped_ring();
        // 3 sits in the high segment (physical index 3, head at 2)
        let idx = ring.find_index(|&v| v == 3).unwrap();
        assert_eq!(ring.remove_at(idx), Some(3));
        assert_eq!(collect(&ring), vec![2, 4, 5]);
        let mut drained = Vec::new();
        while let Some(item) = ring.pop_head() {
            drained.push(item);
        }
        assert_eq!(drained, vec![2, 4, 5]);
    }

    #[test]
    fn test_remove_at_wrapped_low_segment() {
        let mut ring = wrapped_ring();
        // 4 sits in the low segment (physical index 0, past the wrap)
        let idx = ring.find_index(|&v| v == 4).unwrap();
        assert_eq!(ring.remove_at(idx), Some(4));
        assert_eq!(collect(&ring), vec![2, 3, 5]);
        // pushing still lands at the logical tail
        ring.push_tail(6);
        assert_eq!(collect(&ring), vec![2, 3, 5, 6]);
    }

    #[test]
    fn test_remove_at_stale_cursor() {
        let mut ring = SlotRing::with_capacity(4);
        ring.push_tail(1u32);
        let idx = ring.find_index(|_| true).unwrap();
        assert_eq!(ring.remove_at(idx), Some(1));
        ring.push_tail(2);
        ring.pop_head();
        // slot behind the stale cursor is vacant again
        assert_eq!(ring.remove_at(idx), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_drop_releases_remaining_items() {
        use std::sync::Arc;

        let marker = Arc::new(());
        let mut ring = SlotRing::with_capacity(4);
        for _ in 0..3 {
            ring.push_tail(Arc::clone(&marker));
        }
        assert_eq!(Arc::strong_count(&marker), 4);
        drop(ring);
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
