//! Forward pass that turns regime flips into per-bar forecast bands.

use serde::{Deserialize, Serialize};

use crate::domain::{CandleSeries, RegimeLabel, SeriesError};

use super::memory::{Quantiles, RegimeMemory};
use super::{ForecastConfig, MemoryConstruction};

/// Column keys written by [`attach_forecast`].
pub const UPPER_FORECAST: &str = "upper_forecast";
pub const MID_FORECAST: &str = "mid_forecast";
pub const LOWER_FORECAST: &str = "lower_forecast";

/// Projected price levels for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastBand {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

/// Diagnostics gathered during a forecast pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastStats {
    /// Regime flips (excluding the first anchor).
    pub triggers: usize,
    /// Slots written directly by a projection, before propagation.
    pub explicit_writes: usize,
    /// Distinct (regime, duration) buckets in memory at the end of the pass.
    pub buckets: usize,
}

/// Bands aligned 1:1 with the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutput {
    pub bands: Vec<Option<ForecastBand>>,
    pub stats: ForecastStats,
}

/// Anchor of the regime currently in force.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    regime: RegimeLabel,
    index: usize,
    price: f64,
}

#[derive(Debug, Clone, Copy)]
struct Trigger {
    index: usize,
    regime: RegimeLabel,
    price: f64,
}

/// Compute forecast bands for every bar of `series`.
///
/// Every bar with a defined regime observes `close - close_at_flip` under its
/// duration since the flip. Each flip after the first anchor projects the
/// memory forward from the flip bar; later projections overwrite earlier ones
/// and unset slots inherit the most recent explicit write. A zero
/// `max_memory` keeps no samples, so no band is ever written.
pub fn build_forecast(series: &CandleSeries, config: &ForecastConfig) -> ForecastOutput {
    let n = series.len();
    let mut memory = RegimeMemory::new(config.max_memory);
    let mut explicit: Vec<Option<ForecastBand>> = vec![None; n];
    let mut deferred: Vec<Trigger> = Vec::new();
    let mut anchor: Option<Anchor> = None;
    let mut stats = ForecastStats::default();
    let quantiles = config.quantiles();

    for bar in series.bars() {
        let Some(regime) = config.regime.label(&bar) else {
            continue;
        };
        let i = bar.index;
        let close = bar.close;

        match anchor {
            None => {
                anchor = Some(Anchor {
                    regime,
                    index: i,
                    price: close,
                });
            }
            Some(active) if active.regime != regime => {
                stats.triggers += 1;
                let trigger = Trigger {
                    index: i,
                    regime,
                    price: close,
                };
                match config.construction {
                    // Samples recorded so far are strictly before the trigger bar.
                    MemoryConstruction::Causal => {
                        stats.explicit_writes +=
                            write_projection(&memory, trigger, config.horizon, quantiles, &mut explicit);
                    }
                    MemoryConstruction::FullPass => deferred.push(trigger),
                }
                anchor = Some(Anchor {
                    regime,
                    index: i,
                    price: close,
                });
            }
            Some(_) => {}
        }

        if let Some(active) = anchor {
            memory.observe(i, active.regime, i - active.index, close - active.price);
        }
    }

    for trigger in deferred {
        stats.explicit_writes +=
            write_projection(&memory, trigger, config.horizon, quantiles, &mut explicit);
    }
    stats.buckets = memory.bucket_count();

    tracing::debug!(
        bars = n,
        triggers = stats.triggers,
        explicit_writes = stats.explicit_writes,
        buckets = stats.buckets,
        "forecast pass complete"
    );

    ForecastOutput {
        bands: propagate_forward(explicit),
        stats,
    }
}

/// Write one trigger's projection into `slots`; returns the number of slots written.
fn write_projection(
    memory: &RegimeMemory,
    trigger: Trigger,
    horizon: usize,
    quantiles: Quantiles,
    slots: &mut [Option<ForecastBand>],
) -> usize {
    let mut written = 0;
    for p in memory.project(trigger.index, trigger.regime, trigger.price, horizon, quantiles) {
        let Some(slot) = slots.get_mut(trigger.index + p.offset) else {
            continue;
        };
        *slot = Some(ForecastBand {
            upper: p.upper,
            mid: p.mid,
            lower: p.lower,
        });
        written += 1;
    }
    written
}

/// Fill every unset slot with the most recent earlier explicit write.
/// Slots before the first write stay unset.
pub fn propagate_forward(mut bands: Vec<Option<ForecastBand>>) -> Vec<Option<ForecastBand>> {
    let mut last = None;
    for slot in bands.iter_mut() {
        match slot {
            Some(band) => last = Some(*band),
            None => *slot = last,
        }
    }
    bands
}

/// Return a copy of `series` with the three forecast columns attached.
/// Undefined bands are stored as NaN.
pub fn attach_forecast(
    series: &CandleSeries,
    config: &ForecastConfig,
) -> Result<(CandleSeries, ForecastStats), SeriesError> {
    let output = build_forecast(series, config);
    let column = |pick: fn(&ForecastBand) -> f64| -> Vec<f64> {
        output
            .bands
            .iter()
            .map(|b| b.as_ref().map_or(f64::NAN, pick))
            .collect()
    };
    let upper = column(|b| b.upper);
    let mid = column(|b| b.mid);
    let lower = column(|b| b.lower);

    let enriched = series
        .clone()
        .with_column(UPPER_FORECAST, upper)?
        .with_column(MID_FORECAST, mid)?
        .with_column(LOWER_FORECAST, lower)?;
    Ok((enriched, output.stats))
}
