//! MACD entries exited at the projected forecast band.

use crate::domain::{Bar, ExitReason, Position, Side};
use crate::forecast::{LOWER_FORECAST, UPPER_FORECAST};

use super::{LinePair, SignalProvider};

/// Longs close when the high reaches the upper band, shorts when the low
/// reaches the lower band. The fill is the band value, or the open when the
/// bar opened beyond the band.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBandExit {
    lines: LinePair,
}

impl ForecastBandExit {
    pub fn new(macd_key: impl Into<String>, signal_key: impl Into<String>) -> Self {
        Self {
            lines: LinePair::new(macd_key, signal_key),
        }
    }
}

impl Default for ForecastBandExit {
    fn default() -> Self {
        Self::new("macd", "macd_signal")
    }
}

impl SignalProvider for ForecastBandExit {
    fn name(&self) -> &str {
        "forecast_band"
    }

    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        self.lines.cross(prev, curr)
    }

    fn exit(&self, position: &Position, _prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)> {
        let price = match position.side() {
            Side::Long => {
                let upper = curr.indicator(UPPER_FORECAST)?;
                if curr.open >= upper {
                    curr.open
                } else if curr.high >= upper {
                    upper
                } else {
                    return None;
                }
            }
            Side::Short => {
                let lower = curr.indicator(LOWER_FORECAST)?;
                if curr.open <= lower {
                    curr.open
                } else if curr.low <= lower {
                    lower
                } else {
                    return None;
                }
            }
        };
        Some((price, ExitReason::TakeProfit))
    }

    fn columns(&self) -> Vec<&str> {
        vec![
            self.lines.fast.as_str(),
            self.lines.slow.as_str(),
            UPPER_FORECAST,
            LOWER_FORECAST,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionLeg;
    use crate::test_support::{ohlc_series, t0, with_columns};

    fn position(side: Side) -> Position {
        Position::open(
            side,
            PositionLeg {
                entry_index: 0,
                entry_time: t0(),
                entry_price: 100.0,
                size: 1.0,
                stop_price: if side == Side::Long { 90.0 } else { 110.0 },
                take_profit: None,
                leverage: 1,
            },
        )
    }

    #[test]
    fn exits_at_band_value() {
        let s = with_columns(
            ohlc_series(&[(100.0, 101.0, 99.0, 100.0), (100.0, 104.0, 96.0, 101.0)]),
            &[
                (UPPER_FORECAST, vec![f64::NAN, 103.0]),
                (LOWER_FORECAST, vec![f64::NAN, 97.0]),
            ],
        );
        let p = ForecastBandExit::default();
        assert_eq!(
            p.exit(&position(Side::Long), &s.bar(0), &s.bar(1)),
            Some((103.0, ExitReason::TakeProfit))
        );
        assert_eq!(
            p.exit(&position(Side::Short), &s.bar(0), &s.bar(1)),
            Some((97.0, ExitReason::TakeProfit))
        );
    }

    #[test]
    fn band_beyond_the_open_fills_at_open() {
        // Stale bands sit below the long's bar and above the short's bar.
        let s = with_columns(
            ohlc_series(&[(100.0, 101.0, 99.0, 100.0), (100.0, 102.0, 99.0, 101.0)]),
            &[
                (UPPER_FORECAST, vec![f64::NAN, 80.0]),
                (LOWER_FORECAST, vec![f64::NAN, 120.0]),
            ],
        );
        let p = ForecastBandExit::default();
        assert_eq!(
            p.exit(&position(Side::Long), &s.bar(0), &s.bar(1)),
            Some((100.0, ExitReason::TakeProfit))
        );
        assert_eq!(
            p.exit(&position(Side::Short), &s.bar(0), &s.bar(1)),
            Some((100.0, ExitReason::TakeProfit))
        );
    }

    #[test]
    fn band_out_of_reach_holds() {
        let s = with_columns(
            ohlc_series(&[(100.0, 101.0, 99.0, 100.0), (100.0, 102.0, 99.0, 101.0)]),
            &[
                (UPPER_FORECAST, vec![f64::NAN, 105.0]),
                (LOWER_FORECAST, vec![f64::NAN, 95.0]),
            ],
        );
        let p = ForecastBandExit::default();
        assert_eq!(p.exit(&position(Side::Long), &s.bar(0), &s.bar(1)), None);
        assert_eq!(p.exit(&position(Side::Short), &s.bar(0), &s.bar(1)), None);
    }

    #[test]
    fn undefined_band_holds() {
        let s = with_columns(
            ohlc_series(&[(100.0, 101.0, 99.0, 100.0), (100.0, 150.0, 50.0, 101.0)]),
            &[
                (UPPER_FORECAST, vec![f64::NAN, f64::NAN]),
                (LOWER_FORECAST, vec![f64::NAN, f64::NAN]),
            ],
        );
        let p = ForecastBandExit::default();
        assert_eq!(p.exit(&position(Side::Long), &s.bar(0), &s.bar(1)), None);
        assert_eq!(p.exit(&position(Side::Short), &s.bar(0), &s.bar(1)), None);
    }
}
