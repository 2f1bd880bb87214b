//! Fixed-capacity ring buffer and the moving average built on top of it.

use std::collections::VecDeque;

/// Fixed-capacity ring buffer. Pushing onto a full buffer evicts the oldest
/// entry; iteration runs oldest to newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, returning the evicted oldest entry once full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.buf.len() >= self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Windowed moving average over a zero-prefilled ring.
///
/// The window starts loaded with zeros, so early averages divide by the full
/// window size rather than the sample count. Quantities averaged this way
/// ramp up over the first window instead of jumping to the first value.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    ring: RingBuffer<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let mut ring = RingBuffer::new(window.max(1));
        for _ in 0..ring.capacity() {
            ring.push(0.0);
        }
        Self { ring, sum: 0.0 }
    }

    /// Push a value and return the updated average.
    pub fn push(&mut self, value: f64) -> f64 {
        if let Some(old) = self.ring.push(value) {
            self.sum -= old;
        }
        self.sum += value;
        self.average()
    }

    pub fn average(&self) -> f64 {
        self.sum / self.ring.capacity() as f64
    }

    /// Reload the window with zeros.
    pub fn reset(&mut self) {
        let capacity = self.ring.capacity();
        self.ring.clear();
        for _ in 0..capacity {
            self.ring.push(0.0);
        }
        self.sum = 0.0;
    }
}
