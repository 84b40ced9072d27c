//! Regime-conditioned deviation memory and the forecast bands it projects.

pub mod buffer;
pub mod forecaster;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::domain::RegimeSource;

pub use buffer::{percentile, DeviationBuffer};
pub use forecaster::{
    attach_forecast, build_forecast, propagate_forward, ForecastBand, ForecastOutput,
    ForecastStats, LOWER_FORECAST, MID_FORECAST, UPPER_FORECAST,
};
pub use memory::{Projection, Quantiles, RegimeMemory, MIN_SAMPLES};

/// When the memory used for a trigger's projection is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryConstruction {
    /// Observe the whole series first, then project every trigger.
    /// Projections can see samples recorded after their trigger bar.
    #[default]
    FullPass,
    /// Project each trigger from samples recorded strictly before it.
    Causal,
}

/// Forecaster settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Capacity of every (regime, duration) bucket.
    pub max_memory: usize,
    /// Offsets projected per trigger.
    pub horizon: usize,
    pub upper_pct: f64,
    pub mid_pct: f64,
    pub lower_pct: f64,
    pub construction: MemoryConstruction,
    pub regime: RegimeSource,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_memory: 100,
            horizon: 50,
            upper_pct: 90.0,
            mid_pct: 50.0,
            lower_pct: 10.0,
            construction: MemoryConstruction::default(),
            regime: RegimeSource::default(),
        }
    }
}

impl ForecastConfig {
    pub fn quantiles(&self) -> Quantiles {
        Quantiles {
            upper_pct: self.upper_pct,
            mid_pct: self.mid_pct,
            lower_pct: self.lower_pct,
        }
    }
}
