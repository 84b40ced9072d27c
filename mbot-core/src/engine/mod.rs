//! Backtesting engine: single-position state machine and the bar loop.

pub mod loop_runner;
pub mod machine;
pub mod result;
pub mod state;
pub mod tracker;

pub use loop_runner::{run_backtest, Engine, EngineError};
pub use machine::{step, StepContext, StepOutcome};
pub use result::{LedgerSummary, RunResult};
pub use state::EngineState;
pub use tracker::{PerformanceTracker, WinPolicy};
