//! MACD / signal-line crossover.

use crate::domain::{Bar, ExitReason, Position, Side};

use super::{LinePair, SignalProvider};

/// Enters in the direction of a MACD cross and exits at the next bar open
/// after the lines cross back.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdCross {
    lines: LinePair,
}

impl MacdCross {
    pub fn new(macd_key: impl Into<String>, signal_key: impl Into<String>) -> Self {
        Self {
            lines: LinePair::new(macd_key, signal_key),
        }
    }

    pub fn lines(&self) -> &LinePair {
        &self.lines
    }
}

impl Default for MacdCross {
    fn default() -> Self {
        Self::new("macd", "macd_signal")
    }
}

impl SignalProvider for MacdCross {
    fn name(&self) -> &str {
        "macd_cross"
    }

    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        self.lines.cross(prev, curr)
    }

    fn exit(&self, position: &Position, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)> {
        let crossed = self.lines.cross(prev, curr)?;
        (crossed == position.side().opposite()).then_some((curr.open, ExitReason::TakeProfit))
    }

    fn columns(&self) -> Vec<&str> {
        vec![self.lines.fast.as_str(), self.lines.slow.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionLeg;
    use crate::test_support::{ohlc_series, t0, with_columns};

    fn long() -> Position {
        Position::open(
            Side::Long,
            PositionLeg {
                entry_index: 0,
                entry_time: t0(),
                entry_price: 100.0,
                size: 1.0,
                stop_price: 90.0,
                take_profit: None,
                leverage: 1,
            },
        )
    }

    #[test]
    fn enters_on_cross_and_exits_on_recross() {
        let s = with_columns(
            ohlc_series(&[
                (100.0, 101.0, 99.0, 100.0),
                (101.0, 102.0, 100.0, 101.0),
                (104.0, 105.0, 103.0, 104.0),
            ]),
            &[
                ("macd", vec![-1.0, 1.0, -0.5]),
                ("macd_signal", vec![0.0, 0.0, 0.0]),
            ],
        );
        let p = MacdCross::default();
        assert_eq!(p.entry(&s.bar(0), &s.bar(1)), Some(Side::Long));
        assert_eq!(p.exit(&long(), &s.bar(0), &s.bar(1)), None);
        assert_eq!(
            p.exit(&long(), &s.bar(1), &s.bar(2)),
            Some((104.0, ExitReason::TakeProfit))
        );
    }
}
