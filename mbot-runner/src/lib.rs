//! mbot runner: configuration files, data loading, parameter search, export.
//!
//! This crate builds on `mbot-core` to provide:
//! - TOML backtest configs (data path, engine parameters, search settings)
//! - CSV candle loading with dataset fingerprinting
//! - Single runs packaged as reproducible `RunRecord`s
//! - Feasibility rules and the search objective
//! - Grid and seeded random search, evaluated in parallel with rayon
//! - A deterministic top-N leaderboard
//! - JSON/CSV/Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fitness;
pub mod leaderboard;
pub mod report;
pub mod rng;
pub mod runner;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{BacktestConfig, ConfigFileError, DataConfig, RandomConfig, SearchConfig};
pub use data_loader::{load_series, load_series_from_reader, LoadError, LoadedSeries};
pub use export::SweepReport;
pub use fitness::{FitnessMetric, Infeasibility, SearchConstraints};
pub use leaderboard::{InsertResult, Leaderboard, LeaderboardEntry};
pub use rng::RngHierarchy;
pub use runner::{run_single, Evaluation, Evaluator, RunError, RunRecord, Verdict, SCHEMA_VERSION};
pub use sweep::{Param, ParamGrid, ParamRange, ParamSpace, ParamSweep, RandomSearch, SweepError, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<SearchConstraints>();
        assert_sync::<SearchConstraints>();
    }

    #[test]
    fn evaluator_is_shared_across_workers() {
        assert_send::<Evaluator>();
        assert_sync::<Evaluator>();
        assert_send::<ParamSweep>();
        assert_sync::<ParamSweep>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<Evaluation>();
        assert_sync::<Evaluation>();
        assert_send::<RunRecord>();
        assert_sync::<RunRecord>();
        assert_send::<Leaderboard>();
        assert_sync::<Leaderboard>();
    }
}
