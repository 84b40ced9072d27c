//! TradeRecord: an immutable snapshot written when a position closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Side;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StopLoss => write!(f, "Stop-Loss"),
            Self::TakeProfit => write!(f, "Take-Profit"),
        }
    }
}

/// A completed round-trip trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Timestamp of the exit bar.
    pub timestamp: DateTime<Utc>,
    pub entry_time: DateTime<Utc>,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    /// Round-trip fee already deducted from `pnl`.
    pub fee: f64,
    /// Realized, fee-adjusted PnL.
    pub pnl: f64,
    /// Capital after this trade (floored at zero).
    pub capital: f64,
    pub reason: ExitReason,
    pub leverage: u32,
}

impl TradeRecord {
    pub fn is_take_profit(&self) -> bool {
        self.reason == ExitReason::TakeProfit
    }

    pub fn is_profitable(&self) -> bool {
        self.pnl > 0.0
    }

    /// Loss of this trade as a percentage of `reference_capital` (0 for winners).
    pub fn loss_pct_of(&self, reference_capital: f64) -> f64 {
        if self.pnl >= 0.0 || reference_capital <= 0.0 {
            return 0.0;
        }
        -self.pnl / reference_capital * 100.0
    }
}
