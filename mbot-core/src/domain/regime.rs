//! Regime labels and the indicator comparison that derives them.

use serde::{Deserialize, Serialize};

use super::series::Bar;

/// Directional state of the market per a chosen indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegimeLabel {
    Up,
    Down,
}

impl RegimeLabel {
    pub fn from_bool(up: bool) -> Self {
        if up {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// How a bar's regime is read from its indicator columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegimeSource {
    /// A single column: strictly positive = Up, otherwise Down.
    Column { key: String },
    /// Two columns: `fast > slow` = Up, otherwise Down.
    Crossover { fast: String, slow: String },
}

impl Default for RegimeSource {
    fn default() -> Self {
        Self::Crossover {
            fast: "macd".into(),
            slow: "macd_signal".into(),
        }
    }
}

impl RegimeSource {
    /// Regime on `bar`, or `None` while any input column is undefined.
    pub fn label(&self, bar: &Bar<'_>) -> Option<RegimeLabel> {
        match self {
            Self::Column { key } => bar.indicator(key).map(|v| RegimeLabel::from_bool(v > 0.0)),
            Self::Crossover { fast, slow } => {
                let fast = bar.indicator(fast)?;
                let slow = bar.indicator(slow)?;
                Some(RegimeLabel::from_bool(fast > slow))
            }
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Column { key } => vec![key.as_str()],
            Self::Crossover { fast, slow } => vec![fast.as_str(), slow.as_str()],
        }
    }
}
