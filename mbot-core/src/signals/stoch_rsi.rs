//! Stochastic RSI reversal: fade extremes on a %K/%D cross.

use crate::domain::{Bar, ExitReason, Position, Side};

use super::{crossed_above, crossed_below, SignalProvider};

/// Enters long when %K crosses above %D while the previous %K sat below the
/// oversold level, short on the mirror image above overbought. Exits at the
/// bar open once %K reaches the opposite extreme.
#[derive(Debug, Clone, PartialEq)]
pub struct StochRsiReversal {
    pub k_key: String,
    pub d_key: String,
    pub oversold: f64,
    pub overbought: f64,
}

impl StochRsiReversal {
    pub fn new(k_key: impl Into<String>, d_key: impl Into<String>, oversold: f64, overbought: f64) -> Self {
        Self {
            k_key: k_key.into(),
            d_key: d_key.into(),
            oversold,
            overbought,
        }
    }
}

impl Default for StochRsiReversal {
    fn default() -> Self {
        Self::new("stoch_k", "stoch_d", 20.0, 80.0)
    }
}

impl SignalProvider for StochRsiReversal {
    fn name(&self) -> &str {
        "stoch_rsi"
    }

    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        let pk = prev.indicator(&self.k_key)?;
        let pd = prev.indicator(&self.d_key)?;
        let ck = curr.indicator(&self.k_key)?;
        let cd = curr.indicator(&self.d_key)?;

        if crossed_above(pk, pd, ck, cd) && pk < self.oversold {
            Some(Side::Long)
        } else if crossed_below(pk, pd, ck, cd) && pk > self.overbought {
            Some(Side::Short)
        } else {
            None
        }
    }

    fn exit(&self, position: &Position, _prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)> {
        let k = curr.indicator(&self.k_key)?;
        let reached = match position.side() {
            Side::Long => k > self.overbought,
            Side::Short => k < self.oversold,
        };
        reached.then_some((curr.open, ExitReason::TakeProfit))
    }

    fn columns(&self) -> Vec<&str> {
        vec![self.k_key.as_str(), self.d_key.as_str()]
    }
}
