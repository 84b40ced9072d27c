//! Signal providers: entry and exit rules for one strategy variant.
//!
//! Providers read only the two bars they are handed plus, for exits, the open
//! position. They never see capital or the trade ledger.

pub mod atr_target;
pub mod filter;
pub mod forecast_band;
pub mod macd_cross;
pub mod stoch_rsi;

pub use atr_target::AtrTarget;
pub use filter::{
    EntryFilter, FilterVerdict, Filtered, ImpulseFilter, SidewaysFilter, TrendFilter,
};
pub use forecast_band::ForecastBandExit;
pub use macd_cross::MacdCross;
pub use stoch_rsi::StochRsiReversal;

use crate::domain::{Bar, ExitReason, Position, Side};

/// Strategy rules consulted by the position state machine once per bar.
///
/// # Invariants
/// - Deterministic for the same pair of bars.
/// - Undefined indicator values produce no signal rather than an error.
pub trait SignalProvider: Send + Sync {
    /// Strategy name for logging and reports.
    fn name(&self) -> &str;

    /// Side to open on `curr`, given the previous bar.
    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side>;

    /// Fixed take-profit price attached to a position opened on `entry_bar`.
    fn take_profit(&self, _side: Side, _entry_bar: &Bar<'_>) -> Option<f64> {
        None
    }

    /// Strategy exit for an open position on `curr`: exit price and reason.
    /// Stop-losses are handled by the engine, not here.
    fn exit(&self, position: &Position, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)>;

    /// Indicator columns the provider reads.
    fn columns(&self) -> Vec<&str>;
}

impl<P: SignalProvider + ?Sized> SignalProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        (**self).entry(prev, curr)
    }

    fn take_profit(&self, side: Side, entry_bar: &Bar<'_>) -> Option<f64> {
        (**self).take_profit(side, entry_bar)
    }

    fn exit(&self, position: &Position, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)> {
        (**self).exit(position, prev, curr)
    }

    fn columns(&self) -> Vec<&str> {
        (**self).columns()
    }
}

/// Two indicator lines whose strict crossing produces a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePair {
    pub fast: String,
    pub slow: String,
}

impl LinePair {
    pub fn new(fast: impl Into<String>, slow: impl Into<String>) -> Self {
        Self {
            fast: fast.into(),
            slow: slow.into(),
        }
    }

    fn values(&self, bar: &Bar<'_>) -> Option<(f64, f64)> {
        Some((bar.indicator(&self.fast)?, bar.indicator(&self.slow)?))
    }

    /// `Long` when fast moves from below slow to above it, `Short` for the
    /// reverse. Touching without crossing is not a cross.
    pub fn cross(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        let (pf, ps) = self.values(prev)?;
        let (cf, cs) = self.values(curr)?;
        if crossed_above(pf, ps, cf, cs) {
            Some(Side::Long)
        } else if crossed_below(pf, ps, cf, cs) {
            Some(Side::Short)
        } else {
            None
        }
    }
}

pub fn crossed_above(prev_a: f64, prev_b: f64, curr_a: f64, curr_b: f64) -> bool {
    prev_a < prev_b && curr_a > curr_b
}

pub fn crossed_below(prev_a: f64, prev_b: f64, curr_a: f64, curr_b: f64) -> bool {
    prev_a > prev_b && curr_a < curr_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{flat_series, with_columns};

    #[test]
    fn cross_helpers_are_strict() {
        assert!(crossed_above(1.0, 2.0, 3.0, 2.0));
        assert!(!crossed_above(2.0, 2.0, 3.0, 2.0));
        assert!(!crossed_above(1.0, 2.0, 2.0, 2.0));
        assert!(crossed_below(3.0, 2.0, 1.0, 2.0));
        assert!(!crossed_below(3.0, 2.0, 2.0, 2.0));
    }

    #[test]
    fn line_pair_reads_columns() {
        let s = with_columns(
            flat_series(4, 100.0),
            &[
                ("fast", vec![1.0, 3.0, 1.0, f64::NAN]),
                ("slow", vec![2.0, 2.0, 2.0, 2.0]),
            ],
        );
        let pair = LinePair::new("fast", "slow");
        assert_eq!(pair.cross(&s.bar(0), &s.bar(1)), Some(Side::Long));
        assert_eq!(pair.cross(&s.bar(1), &s.bar(2)), Some(Side::Short));
        assert_eq!(pair.cross(&s.bar(2), &s.bar(3)), None);
    }
}
