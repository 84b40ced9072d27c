//! Position: the single open leveraged position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::candle::Candle;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Fields shared by both sides of an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLeg {
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    /// Contracts held.
    pub size: f64,
    pub stop_price: f64,
    pub take_profit: Option<f64>,
    pub leverage: u32,
}

/// An open position, tagged by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Position {
    Long(PositionLeg),
    Short(PositionLeg),
}

impl Position {
    pub fn open(side: Side, leg: PositionLeg) -> Self {
        match side {
            Side::Long => Self::Long(leg),
            Side::Short => Self::Short(leg),
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Self::Long(_) => Side::Long,
            Self::Short(_) => Side::Short,
        }
    }

    pub fn leg(&self) -> &PositionLeg {
        match self {
            Self::Long(leg) | Self::Short(leg) => leg,
        }
    }

    /// Intrabar stop touch: the low reaches the stop for longs, the high for shorts.
    pub fn stop_touched(&self, candle: &Candle) -> bool {
        match self {
            Self::Long(leg) => candle.low <= leg.stop_price,
            Self::Short(leg) => candle.high >= leg.stop_price,
        }
    }

    /// PnL before fees if the whole position is closed at `exit_price`.
    pub fn raw_pnl(&self, exit_price: f64) -> f64 {
        match self {
            Self::Long(leg) => (exit_price - leg.entry_price) * leg.size,
            Self::Short(leg) => (leg.entry_price - exit_price) * leg.size,
        }
    }

    pub fn entry_notional(&self) -> f64 {
        let leg = self.leg();
        leg.entry_price * leg.size
    }

    pub fn notional_at(&self, price: f64) -> f64 {
        price * self.leg().size
    }
}
