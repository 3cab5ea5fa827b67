//! Bounded Circular Buffer
//!
//! ## Overview
//!
//! Both kinds of per-sensor state in LineGuard are "keep the newest N":
//! the sliding window of values and the log of recent anomalies. This module
//! provides the ring buffer behind both.
//!
//! Unlike a `VecDeque` with manual trimming, the buffer never grows past its
//! capacity and hands the evicted element back from [`CircularBuffer::push`].
//! The window needs the evicted value to subtract it from its running
//! statistics, so eviction has to be observable.
//!
//! ### Memory Layout
//!
//! Storage grows up to `capacity` and then stays fixed; `write_pos` walks
//! around it:
//!
//! ```text
//! capacity = 5, after 7 pushes (values 0..=6):
//!
//! Physical:  [5, 6, 2, 3, 4]   write_pos = 2
//!             0  1  2  3  4
//!
//! Logical:   [2, 3, 4, 5, 6]   oldest → newest
//! ```
//!
//! Capacity is chosen at runtime because window sizes come from the sensor
//! catalog and configuration, not from the type system.
//!
//! ## Usage Example
//!
//! ```rust
//! use lineguard_core::buffer::CircularBuffer;
//!
//! let mut buf = CircularBuffer::new(3);
//! assert_eq!(buf.push(1.0), None);
//! buf.push(2.0);
//! buf.push(3.0);
//!
//! // Full: the oldest value comes back out
//! assert_eq!(buf.push(4.0), Some(1.0));
//! assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
//! ```

/// Fixed-capacity ring buffer that overwrites its oldest element when full
///
/// ## Internal Invariants
///
/// - `data.len() <= capacity`
/// - `write_pos < capacity`
/// - Once `data.len() == capacity`, the oldest element sits at `write_pos`
///
/// ## Thread Safety
///
/// Not synchronized; per-sensor owners wrap it in a lock.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    data: Vec<T>,
    write_pos: usize,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    /// Create an empty buffer holding at most `capacity` elements
    ///
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            write_pos: 0,
            capacity,
        }
    }

    /// Append an element, returning the evicted oldest one when full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.data.len() < self.capacity {
            self.data.push(item);
            None
        } else {
            Some(std::mem::replace(&mut self.data[self.write_pos], item))
        };

        self.write_pos = (self.write_pos + 1) % self.capacity;
        evicted
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Maximum number of stored elements
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Most recently pushed element
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.get(self.data.len() - 1)
    }

    /// Element by logical index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.data.len() {
            return None;
        }
        self.data.get(self.physical(index))
    }

    /// Iterate oldest to newest; `.rev()` gives newest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        (0..self.data.len()).map(move |i| &self.data[self.physical(i)])
    }

    /// Map a logical index to a position in `data`
    fn physical(&self, index: usize) -> usize {
        if self.is_full() {
            (self.write_pos + index) % self.capacity
        } else {
            index
        }
    }

    /// Drop all elements
    pub fn clear(&mut self) {
        self.data.clear();
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buffer: CircularBuffer<f64> = CircularBuffer::new(5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.last().is_none());
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut buffer = CircularBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(1);
        assert_eq!(buffer.push(2), Some(1));
        assert_eq!(buffer.last(), Some(&2));
    }

    #[test]
    fn circular_overwrite() {
        let mut buffer = CircularBuffer::new(3);
        let evicted: Vec<Option<i32>> = (0..5).map(|i| buffer.push(i)).collect();

        assert_eq!(evicted, vec![None, None, None, Some(0), Some(1)]);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buffer.last(), Some(&4));
    }

    #[test]
    fn reverse_iteration_is_newest_first() {
        let mut buffer = CircularBuffer::new(4);
        for i in 0..6 {
            buffer.push(i);
        }
        assert_eq!(buffer.iter().rev().copied().collect::<Vec<_>>(), vec![5, 4, 3, 2]);
    }

    #[test]
    fn clear_resets_order() {
        let mut buffer = CircularBuffer::new(2);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        buffer.clear();
        buffer.push(7);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![7]);
        assert_eq!(buffer.get(1), None);
    }
}
