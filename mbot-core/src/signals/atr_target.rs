//! MACD entries with a fixed ATR-distance take-profit.

use crate::domain::{Bar, ExitReason, Position, Side};

use super::{LinePair, SignalProvider};

/// MACD-cross entry; the take-profit is fixed at entry as
/// `close ± distance`, where `distance` is read from the entry bar's
/// `distance_key` column (typically ATR times a multiplier).
#[derive(Debug, Clone, PartialEq)]
pub struct AtrTarget {
    lines: LinePair,
    pub distance_key: String,
}

impl AtrTarget {
    pub fn new(
        macd_key: impl Into<String>,
        signal_key: impl Into<String>,
        distance_key: impl Into<String>,
    ) -> Self {
        Self {
            lines: LinePair::new(macd_key, signal_key),
            distance_key: distance_key.into(),
        }
    }
}

impl Default for AtrTarget {
    fn default() -> Self {
        Self::new("macd", "macd_signal", "tp_atr_distance")
    }
}

impl SignalProvider for AtrTarget {
    fn name(&self) -> &str {
        "atr_target"
    }

    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        self.lines.cross(prev, curr)
    }

    fn take_profit(&self, side: Side, entry_bar: &Bar<'_>) -> Option<f64> {
        let distance = entry_bar.indicator(&self.distance_key)?;
        if distance <= 0.0 {
            return None;
        }
        Some(match side {
            Side::Long => entry_bar.close + distance,
            Side::Short => entry_bar.close - distance,
        })
    }

    /// Fills at the target, or at the open when the bar gapped through it.
    fn exit(&self, position: &Position, _prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)> {
        let target = position.leg().take_profit?;
        let price = match position {
            Position::Long(_) if curr.open >= target => curr.open,
            Position::Long(_) if curr.high >= target => target,
            Position::Short(_) if curr.open <= target => curr.open,
            Position::Short(_) if curr.low <= target => target,
            _ => return None,
        };
        Some((price, ExitReason::TakeProfit))
    }

    fn columns(&self) -> Vec<&str> {
        vec![
            self.lines.fast.as_str(),
            self.lines.slow.as_str(),
            self.distance_key.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionLeg;
    use crate::test_support::{ohlc_series, t0, with_columns};

    fn position(side: Side, take_profit: Option<f64>) -> Position {
        Position::open(
            side,
            PositionLeg {
                entry_index: 0,
                entry_time: t0(),
                entry_price: 100.0,
                size: 1.0,
                stop_price: if side == Side::Long { 90.0 } else { 110.0 },
                take_profit,
                leverage: 1,
            },
        )
    }

    #[test]
    fn target_is_fixed_from_entry_bar() {
        let s = with_columns(
            ohlc_series(&[(100.0, 101.0, 99.0, 100.0)]),
            &[("tp_atr_distance", vec![6.0])],
        );
        let p = AtrTarget::default();
        assert_eq!(p.take_profit(Side::Long, &s.bar(0)), Some(106.0));
        assert_eq!(p.take_profit(Side::Short, &s.bar(0)), Some(94.0));
    }

    #[test]
    fn undefined_distance_means_no_target() {
        let s = with_columns(
            ohlc_series(&[(100.0, 101.0, 99.0, 100.0)]),
            &[("tp_atr_distance", vec![f64::NAN])],
        );
        assert_eq!(AtrTarget::default().take_profit(Side::Long, &s.bar(0)), None);
    }

    #[test]
    fn exits_at_target_or_gap_open() {
        let s = ohlc_series(&[
            (100.0, 101.0, 99.0, 100.0),
            (101.0, 107.0, 100.0, 105.0),
            (108.0, 109.0, 107.0, 108.0),
            (101.0, 103.0, 100.0, 102.0),
        ]);
        let p = AtrTarget::default();
        let long = position(Side::Long, Some(106.0));
        assert_eq!(
            p.exit(&long, &s.bar(0), &s.bar(1)),
            Some((106.0, ExitReason::TakeProfit))
        );
        assert_eq!(
            p.exit(&long, &s.bar(1), &s.bar(2)),
            Some((108.0, ExitReason::TakeProfit))
        );
        assert_eq!(p.exit(&long, &s.bar(2), &s.bar(3)), None);

        let short = position(Side::Short, Some(100.5));
        assert_eq!(
            p.exit(&short, &s.bar(0), &s.bar(1)),
            Some((100.5, ExitReason::TakeProfit))
        );
        assert_eq!(p.exit(&position(Side::Short, None), &s.bar(0), &s.bar(1)), None);
    }
}
