//! Fixed-capacity FIFO buffer of observed deviations.

use std::collections::VecDeque;

/// Ring buffer holding at most `capacity` samples, oldest first.
///
/// Pushing into a full buffer evicts the oldest sample in O(1). A zero
/// capacity buffer stores nothing and hands every sample straight back.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl DeviationBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample; returns the evicted sample when the buffer was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.capacity == 0 {
            return Some(value);
        }
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples in insertion (chronological) order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Ascending copy of the samples, for percentile queries.
    pub fn sorted(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.samples.iter().copied().collect();
        values.sort_by(f64::total_cmp);
        values
    }
}

/// Percentile of ascending `sorted` data with linear interpolation between
/// the two closest ranks. `pct` is in [0, 100]. Returns `None` for empty input.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}
