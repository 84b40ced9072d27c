//! Feasibility rules and the search objective.
//!
//! A run is feasible when it trades often enough, never loses more than a set
//! share of the starting capital on one trade, and does not report an
//! implausible return. Feasible runs are ranked by [`FitnessMetric`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mbot_core::config::ConfigError;
use mbot_core::engine::RunResult;

/// Limits a run must respect to enter a leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConstraints {
    pub min_trades: usize,
    /// Largest single-trade loss, as a percentage of the starting capital.
    pub max_loss_per_trade_pct: f64,
    /// Returns above this are treated as artefacts of the data.
    pub max_pnl_pct: f64,
}

impl Default for SearchConstraints {
    fn default() -> Self {
        Self {
            min_trades: 10,
            max_loss_per_trade_pct: 2.0,
            max_pnl_pct: 50_000.0,
        }
    }
}

/// Why a candidate was excluded from ranking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Infeasibility {
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] ConfigError),

    #[error("{trades} trades, need at least {min}")]
    TooFewTrades { trades: usize, min: usize },

    #[error("worst trade lost {loss_pct:.2}% of start capital (limit {max:.2}%)")]
    LossTooLarge { loss_pct: f64, max: f64 },

    #[error("return of {pnl_pct:.2}% exceeds the plausibility cap of {max:.2}%")]
    ImplausiblePnl { pnl_pct: f64, max: f64 },
}

impl SearchConstraints {
    /// First violated rule, if any.
    pub fn check(&self, result: &RunResult) -> Result<(), Infeasibility> {
        if result.total_pnl_pct > self.max_pnl_pct {
            return Err(Infeasibility::ImplausiblePnl {
                pnl_pct: result.total_pnl_pct,
                max: self.max_pnl_pct,
            });
        }
        if result.trades_count < self.min_trades {
            return Err(Infeasibility::TooFewTrades {
                trades: result.trades_count,
                min: self.min_trades,
            });
        }
        let worst = result.worst_loss_pct();
        if worst > self.max_loss_per_trade_pct {
            return Err(Infeasibility::LossTooLarge {
                loss_pct: worst,
                max: self.max_loss_per_trade_pct,
            });
        }
        Ok(())
    }
}

/// Objective used to rank feasible runs. Higher is always better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// `pnl_pct * (1 - drawdown)`, drawdown as a fraction.
    #[default]
    RiskAdjustedPnl,
    PnlPct,
    /// Negated drawdown percentage, for drawdown-first ranking.
    LowDrawdown,
}

impl FitnessMetric {
    pub fn extract(self, result: &RunResult) -> f64 {
        match self {
            Self::RiskAdjustedPnl => result.total_pnl_pct * (1.0 - result.max_drawdown()),
            Self::PnlPct => result.total_pnl_pct,
            Self::LowDrawdown => -result.max_drawdown_pct,
        }
    }

    pub fn is_better(self, a: f64, b: f64) -> bool {
        a > b
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RiskAdjustedPnl => "risk_adjusted_pnl",
            Self::PnlPct => "pnl_pct",
            Self::LowDrawdown => "low_drawdown",
        }
    }
}
