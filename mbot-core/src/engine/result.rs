//! Run results and ledger-derived summaries.

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

use super::tracker::{PerformanceTracker, WinPolicy};

/// Complete outcome of one backtest. Never partially filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    pub start_capital: f64,
    pub end_capital: f64,
    /// `(end / start - 1) * 100`.
    pub total_pnl_pct: f64,
    pub trades_count: usize,
    /// Percentage of trades counted as wins under the run's win policy.
    pub win_rate: f64,
    /// Largest peak-to-trough decline of post-trade capital, in percent.
    pub max_drawdown_pct: f64,
    pub win_policy: WinPolicy,
    pub bars_processed: usize,
    /// Capital reached zero and the run stopped early.
    pub halted: bool,
    pub trade_log: Vec<TradeRecord>,
}

impl RunResult {
    pub(crate) fn from_tracker(
        strategy: &str,
        start_capital: f64,
        end_capital: f64,
        tracker: PerformanceTracker,
        bars_processed: usize,
        halted: bool,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            start_capital,
            end_capital,
            total_pnl_pct: pnl_pct(start_capital, end_capital),
            trades_count: tracker.trades(),
            win_rate: tracker.win_rate_pct(),
            max_drawdown_pct: tracker.max_drawdown() * 100.0,
            win_policy: tracker.policy(),
            bars_processed,
            halted,
            trade_log: tracker.into_ledger(),
        }
    }

    /// Max drawdown as a fraction in [0, 1].
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown_pct / 100.0
    }

    /// Largest single-trade loss as a percentage of the starting capital.
    pub fn worst_loss_pct(&self) -> f64 {
        self.trade_log
            .iter()
            .map(|t| t.loss_pct_of(self.start_capital))
            .fold(0.0, f64::max)
    }

    /// Statistics recomputed from the trade log alone.
    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary::from_trades(self.start_capital, &self.trade_log, self.win_policy)
    }
}

fn pnl_pct(start: f64, end: f64) -> f64 {
    if start > 0.0 {
        (end / start - 1.0) * 100.0
    } else {
        0.0
    }
}

/// Aggregate statistics rebuilt by replaying a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub end_capital: f64,
    pub total_pnl_pct: f64,
    pub max_drawdown_pct: f64,
}

impl LedgerSummary {
    /// Replay `trades` in order through a fresh tracker.
    ///
    /// End capital is the last trade's post-trade capital, or `start_capital`
    /// for an empty ledger.
    pub fn from_trades(start_capital: f64, trades: &[TradeRecord], policy: WinPolicy) -> Self {
        let mut tracker = PerformanceTracker::new(start_capital, policy);
        for trade in trades {
            tracker.record(trade.clone());
        }
        let end_capital = trades.last().map_or(start_capital, |t| t.capital);
        Self {
            trades: tracker.trades(),
            wins: tracker.wins(),
            win_rate: tracker.win_rate_pct(),
            end_capital,
            total_pnl_pct: pnl_pct(start_capital, end_capital),
            max_drawdown_pct: tracker.max_drawdown() * 100.0,
        }
    }
}
