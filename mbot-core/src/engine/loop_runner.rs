//! Bar loop: walks a candle series once and returns the run result.
//!
//! Per run:
//! 1. Attach forecast bands when the parameters ask for them
//! 2. Step the state machine over each (previous, current) bar pair
//! 3. Stop early if capital is exhausted
//! 4. Fold the tracker into a `RunResult`

use thiserror::Error;

use crate::config::{ConfigError, EngineParams};
use crate::domain::{CandleSeries, SeriesError};
use crate::forecast::attach_forecast;
use crate::signals::SignalProvider;

use super::machine::{step, StepContext};
use super::result::RunResult;
use super::state::EngineState;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),
}

/// A validated parameter set bound to its signal provider.
pub struct Engine {
    params: EngineParams,
    provider: Box<dyn SignalProvider>,
}

impl Engine {
    /// Validate `params` and build the configured strategy.
    pub fn new(params: EngineParams) -> Result<Self, ConfigError> {
        let provider = params.build_provider()?;
        Ok(Self { params, provider })
    }

    /// Use a caller-supplied provider instead of `params.strategy`.
    pub fn with_provider(params: EngineParams, provider: Box<dyn SignalProvider>) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params, provider })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn provider(&self) -> &dyn SignalProvider {
        self.provider.as_ref()
    }

    /// Run over `series`, attaching forecast columns first when configured.
    pub fn run(&self, series: &CandleSeries) -> Result<RunResult, SeriesError> {
        match &self.params.forecast {
            Some(forecast) => {
                let (enriched, stats) = attach_forecast(series, forecast)?;
                tracing::debug!(
                    triggers = stats.triggers,
                    explicit_writes = stats.explicit_writes,
                    "forecast attached"
                );
                Ok(self.run_prepared(&enriched))
            }
            None => Ok(self.run_prepared(series)),
        }
    }

    /// Run over a series that already carries every column the strategy needs.
    pub fn run_prepared(&self, series: &CandleSeries) -> RunResult {
        let params = &self.params;
        let sizer = params.sizer();
        let ctx = StepContext {
            provider: self.provider.as_ref(),
            sizer: &sizer,
            fees: params.fee_model(),
            behavior: params.behavior,
            columns: &params.columns,
            stop_buffer: params.stop_buffer(),
        };

        for key in self.provider.columns() {
            if !series.columns().contains(key) {
                tracing::warn!(column = key, strategy = self.provider.name(), "column missing from series");
            }
        }

        let mut state = EngineState::new(params.start_capital, params.win_policy);
        let mut bars_processed = 0;
        for i in 1..series.len() {
            if state.halted {
                break;
            }
            step(&series.bar(i - 1), &series.bar(i), &mut state, &ctx);
            bars_processed += 1;
        }

        tracing::debug!(
            strategy = self.provider.name(),
            bars = bars_processed,
            trades = state.tracker.trades(),
            capital = state.capital,
            halted = state.halted,
            "run complete"
        );

        RunResult::from_tracker(
            self.provider.name(),
            params.start_capital,
            state.capital,
            state.tracker,
            bars_processed,
            state.halted,
        )
    }
}

/// Validate, build and run in one call.
pub fn run_backtest(series: &CandleSeries, params: &EngineParams) -> Result<RunResult, EngineError> {
    let engine = Engine::new(params.clone())?;
    Ok(engine.run(series)?)
}
