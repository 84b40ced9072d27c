//! Shared fixtures for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Candle, CandleSeries};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Hourly series from `(open, high, low, close)` rows.
pub(crate) fn ohlc_series(rows: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let candles = rows
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle::new(t0() + Duration::hours(i as i64), o, h, l, c, 1.0))
        .collect();
    CandleSeries::new(candles).unwrap()
}

/// `n` identical bars at `price` with a one-point range either side.
pub(crate) fn flat_series(n: usize, price: f64) -> CandleSeries {
    ohlc_series(&vec![(price, price + 1.0, price - 1.0, price); n])
}

/// Attach several columns at once.
pub(crate) fn with_columns(series: CandleSeries, columns: &[(&str, Vec<f64>)]) -> CandleSeries {
    columns.iter().fold(series, |s, (name, values)| {
        s.with_column(*name, values.clone()).unwrap()
    })
}
