//! Lag-indexed spike/current accumulator.
//!
//! A [`RingBuffer`] is a fixed-capacity circular accumulator: writers add
//! weighted contributions at a nonnegative `lag` relative to the current
//! simulation slice, and readers consume (and clear) the bucket for a given
//! `lag` exactly once per tick. The buffer never shifts its own contents —
//! the caller is responsible for treating `lag` as relative to whatever
//! slice origin it is currently processing, same as `nest::RingBuffer` in
//! the model this crate's tree solver is derived from.

use crate::error::{CmError, Result};

/// Fixed-capacity, lag-indexed accumulator of weighted deliveries.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buckets: Vec<f64>,
}

impl RingBuffer {
    /// Create a buffer sized to cover delivery lags in `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            buckets: vec![0.0; capacity],
        }
    }

    /// Number of distinct lags this buffer can hold.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn index(&self, lag: i64) -> Result<usize> {
        if lag < 0 || lag as usize >= self.buckets.len() {
            return Err(CmError::IndexOutOfRange {
                index: lag,
                capacity: self.buckets.len(),
            });
        }
        Ok(lag as usize)
    }

    /// Add `x` to the bucket at `lag`.
    pub fn add_value(&mut self, lag: i64, x: f64) -> Result<()> {
        let idx = self.index(lag)?;
        self.buckets[idx] += x;
        Ok(())
    }

    /// Read and clear the bucket at `lag`. Destructive: a second call at the
    /// same `lag` before any new write returns `0.0`.
    pub fn get_value(&mut self, lag: i64) -> Result<f64> {
        let idx = self.index(lag)?;
        let value = self.buckets[idx];
        self.buckets[idx] = 0.0;
        Ok(value)
    }

    /// Zero every bucket.
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(|b| *b = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get_returns_accumulated_value() {
        let mut buf = RingBuffer::new(8);
        buf.add_value(3, 1.5).unwrap();
        buf.add_value(3, 2.5).unwrap();
        assert_eq!(buf.get_value(3).unwrap(), 4.0);
    }

    #[test]
    fn get_value_is_destructive() {
        let mut buf = RingBuffer::new(4);
        buf.add_value(0, 1.0).unwrap();
        assert_eq!(buf.get_value(0).unwrap(), 1.0);
        // second read before any new write returns zero
        assert_eq!(buf.get_value(0).unwrap(), 0.0);
    }

    #[test]
    fn clear_zeroes_all_buckets() {
        let mut buf = RingBuffer::new(4);
        for lag in 0..4 {
            buf.add_value(lag, 1.0).unwrap();
        }
        buf.clear();
        for lag in 0..4 {
            assert_eq!(buf.get_value(lag).unwrap(), 0.0);
        }
    }

    #[test]
    fn out_of_range_lag_is_an_error() {
        let mut buf = RingBuffer::new(4);
        assert!(matches!(
            buf.add_value(-1, 1.0),
            Err(CmError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            buf.add_value(4, 1.0),
            Err(CmError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            buf.get_value(100),
            Err(CmError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn buckets_are_independent() {
        let mut buf = RingBuffer::new(4);
        buf.add_value(0, 1.0).unwrap();
        buf.add_value(1, 2.0).unwrap();
        assert_eq!(buf.get_value(1).unwrap(), 2.0);
        assert_eq!(buf.get_value(0).unwrap(), 1.0);
    }
}
