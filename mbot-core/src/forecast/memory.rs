//! Regime memory: deviations bucketed by (regime, bars since flip).

use std::collections::HashMap;

use crate::domain::RegimeLabel;

use super::buffer::{percentile, DeviationBuffer};

/// Minimum samples a bucket needs before it can produce a forecast.
pub const MIN_SAMPLES: usize = 2;

/// Quantile levels (in percent) projected from each bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantiles {
    pub upper_pct: f64,
    pub mid_pct: f64,
    pub lower_pct: f64,
}

/// One projected offset: price levels `offset` bars after a trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub offset: usize,
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

/// Online memory of price displacement conditioned on regime and duration.
///
/// Every bucket is a bounded FIFO, so `len(bucket) <= capacity` always holds
/// and statistics from old regimes age out.
#[derive(Debug, Clone)]
pub struct RegimeMemory {
    capacity: usize,
    buckets: HashMap<(RegimeLabel, usize), DeviationBuffer>,
    last_observed: Option<usize>,
}

impl RegimeMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buckets: HashMap::new(),
            last_observed: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record one deviation sample for `(regime, duration)`.
    ///
    /// Samples must arrive in chronological bar order.
    pub fn observe(
        &mut self,
        bar_index: usize,
        regime: RegimeLabel,
        duration: usize,
        deviation: f64,
    ) {
        debug_assert!(
            self.last_observed.map_or(true, |last| bar_index >= last),
            "regime memory observed bar {bar_index} after bar {:?}",
            self.last_observed
        );
        self.last_observed = Some(bar_index);
        let capacity = self.capacity;
        self.buckets
            .entry((regime, duration))
            .or_insert_with(|| DeviationBuffer::with_capacity(capacity))
            .push(deviation);
    }

    pub fn bucket(&self, regime: RegimeLabel, duration: usize) -> Option<&DeviationBuffer> {
        self.buckets.get(&(regime, duration))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Largest bucket size currently held.
    pub fn max_bucket_len(&self) -> usize {
        self.buckets.values().map(|b| b.len()).max().unwrap_or(0)
    }

    /// Durations recorded for `regime`, ascending.
    pub fn durations(&self, regime: RegimeLabel) -> Vec<usize> {
        let mut durations: Vec<usize> = self
            .buckets
            .keys()
            .filter(|(r, _)| *r == regime)
            .map(|(_, d)| *d)
            .collect();
        durations.sort_unstable();
        durations
    }

    /// Project quantile price levels for offsets `0..horizon` after a trigger.
    ///
    /// Offsets whose bucket holds fewer than [`MIN_SAMPLES`] samples are
    /// omitted rather than reported as zero.
    pub fn project(
        &self,
        trigger_index: usize,
        regime: RegimeLabel,
        init_price: f64,
        horizon: usize,
        quantiles: Quantiles,
    ) -> Vec<Projection> {
        let projections: Vec<Projection> = (0..horizon)
            .filter_map(|offset| {
                let bucket = self.bucket(regime, offset)?;
                if bucket.len() < MIN_SAMPLES {
                    return None;
                }
                let sorted = bucket.sorted();
                Some(Projection {
                    offset,
                    upper: init_price + percentile(&sorted, quantiles.upper_pct)?,
                    mid: init_price + percentile(&sorted, quantiles.mid_pct)?,
                    lower: init_price + percentile(&sorted, quantiles.lower_pct)?,
                })
            })
            .collect();

        tracing::trace!(
            trigger_index,
            ?regime,
            offsets = projections.len(),
            "projected forecast band"
        );
        projections
    }
}
