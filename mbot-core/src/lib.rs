//! mbot core: candle series, regime forecaster, sizing and the backtest engine.
//!
//! This crate contains the replay-and-forecast engine:
//! - Domain types (candles, indicator columns, positions, trades)
//! - Regime memory that learns price displacement per (regime, duration)
//!   and projects quantile forecast bands
//! - Volatility-targeted leverage and the fee model
//! - Signal providers and composable entry filters
//! - The single-position state machine and its bar loop
//!
//! Nothing here performs I/O; loading and reporting live in `mbot-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod forecast;
pub mod signals;
pub mod sizers;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, EngineParams, StrategyConfig};
pub use domain::{Candle, CandleSeries, SeriesError, Side, TradeRecord};
pub use engine::{run_backtest, Engine, EngineError, RunResult, WinPolicy};
pub use forecast::{attach_forecast, build_forecast, ForecastConfig, MemoryConstruction};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a parallel sweep shares across
    /// worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::CandleSeries>();
        require_sync::<domain::CandleSeries>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        // Forecast
        require_send::<forecast::RegimeMemory>();
        require_sync::<forecast::RegimeMemory>();
        require_send::<forecast::ForecastConfig>();
        require_sync::<forecast::ForecastConfig>();

        // Engine
        require_send::<config::EngineParams>();
        require_sync::<config::EngineParams>();
        require_send::<engine::Engine>();
        require_sync::<engine::Engine>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();

        // Providers and filters
        require_send::<signals::StochRsiReversal>();
        require_sync::<signals::StochRsiReversal>();
        require_send::<signals::MacdCross>();
        require_sync::<signals::MacdCross>();
        require_send::<signals::AtrTarget>();
        require_sync::<signals::AtrTarget>();
        require_send::<signals::ForecastBandExit>();
        require_sync::<signals::ForecastBandExit>();
        require_send::<signals::Filtered<Box<dyn signals::SignalProvider>>>();
        require_sync::<signals::Filtered<Box<dyn signals::SignalProvider>>>();

        // Fingerprints
        require_send::<fingerprint::RunId>();
        require_sync::<fingerprint::RunId>();
    }

    /// Architecture contract: providers never see capital or the ledger.
    ///
    /// `entry` takes two bars and `exit` adds only the open position. If
    /// someone threads engine state into the trait, this stops compiling.
    #[test]
    fn signal_provider_has_no_engine_state_parameter() {
        fn _check_trait_object_builds(
            provider: &dyn signals::SignalProvider,
            prev: &domain::Bar<'_>,
            curr: &domain::Bar<'_>,
            position: &domain::Position,
        ) {
            let _ = provider.entry(prev, curr);
            let _ = provider.exit(position, prev, curr);
        }
    }
}
