//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle for one interval of a single market.
///
/// Indicator values are not stored here; they live column-wise in
/// [`IndicatorColumns`](super::columns::IndicatorColumns) and are read through
/// a [`Bar`](super::series::Bar) view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the name of the first OHLCV field that is NaN, infinite or negative.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
        .map(|(name, _)| name)
    }

    /// Basic range sanity: high >= low and both bracket open/close.
    pub fn is_sane(&self) -> bool {
        self.invalid_field().is_none()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
        assert_eq!(sample_candle().invalid_field(), None);
    }

    #[test]
    fn candle_detects_nan() {
        let mut candle = sample_candle();
        candle.close = f64::NAN;
        assert_eq!(candle.invalid_field(), Some("close"));
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_negative_volume() {
        let mut candle = sample_candle();
        candle.volume = -1.0;
        assert_eq!(candle.invalid_field(), Some("volume"));
    }

    #[test]
    fn candle_detects_inverted_range() {
        let mut candle = sample_candle();
        candle.high = 97.0;
        assert!(!candle.is_sane());
    }
}
