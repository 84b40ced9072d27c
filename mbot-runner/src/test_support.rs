//! Shared fixtures for unit tests.

use chrono::{Duration, TimeZone, Utc};

use mbot_core::config::{MacdParams, StrategyConfig};
use mbot_core::domain::{Candle, CandleSeries};
use mbot_core::EngineParams;

/// `n` hourly bars oscillating around 100 with MACD, swing and volatility
/// columns, so MACD-cross strategies trade several times.
pub(crate) fn oscillating_series(n: usize) -> CandleSeries {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let phase = |i: usize| i as f64 * 0.45;
    let candles = (0..n)
        .map(|i| {
            let c = 100.0 + phase(i).sin() * 4.0;
            Candle::new(base + Duration::hours(i as i64), c, c + 0.8, c - 0.8, c, 5.0)
        })
        .collect();
    let columns = [
        ("macd", (0..n).map(|i| phase(i).cos()).collect::<Vec<_>>()),
        ("macd_signal", vec![0.0; n]),
        ("swing_low", (0..n).map(|i| 100.0 + phase(i).sin() * 4.0 - 2.0).collect()),
        ("swing_high", (0..n).map(|i| 100.0 + phase(i).sin() * 4.0 + 2.0).collect()),
        ("atr_pct", vec![1.5; n]),
    ];
    columns
        .into_iter()
        .fold(CandleSeries::new(candles).unwrap(), |s, (name, values)| {
            s.with_column(name, values).unwrap()
        })
}

pub(crate) fn macd_params() -> EngineParams {
    EngineParams {
        strategy: StrategyConfig::MacdCross(MacdParams::default()),
        ..EngineParams::default()
    }
}
