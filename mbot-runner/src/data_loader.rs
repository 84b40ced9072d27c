//! Candle loading from CSV.
//!
//! Expected layout: `timestamp,open,high,low,close,volume` followed by any
//! number of indicator columns. Column order is free; header names are
//! matched case-insensitively for the six required fields.
//!
//! Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM:SS` (taken as UTC) or
//! integer epoch milliseconds. Empty indicator cells load as undefined.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use mbot_core::domain::{Candle, CandleSeries, SeriesError};
use mbot_core::fingerprint::DatasetHash;

const REQUIRED: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: cannot parse {column} value '{value}'")]
    Number {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),
}

/// A loaded series with its content hash.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: CandleSeries,
    /// BLAKE3 over every candle and column value.
    pub dataset_hash: DatasetHash,
}

pub fn load_series(path: &Path) -> Result<LoadedSeries, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = load_series_from_reader(file)?;
    tracing::info!(
        path = %path.display(),
        bars = loaded.series.len(),
        columns = loaded.series.columns().len(),
        "loaded candles"
    );
    Ok(loaded)
}

pub fn load_series_from_reader<R: Read>(reader: R) -> Result<LoadedSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut positions = [0usize; 6];
    for (slot, name) in positions.iter_mut().zip(REQUIRED) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))?;
    }
    let extra: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !positions.contains(i))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut candles = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); extra.len()];

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("");

        let ts_raw = cell(positions[0]);
        let timestamp = parse_timestamp(ts_raw).ok_or_else(|| LoadError::Timestamp {
            row,
            value: ts_raw.to_string(),
        })?;

        let mut ohlcv = [0.0; 5];
        for (k, value) in ohlcv.iter_mut().enumerate() {
            let raw = cell(positions[k + 1]);
            *value = raw.parse().map_err(|_| LoadError::Number {
                row,
                column: REQUIRED[k + 1].to_string(),
                value: raw.to_string(),
            })?;
        }
        let [open, high, low, close, volume] = ohlcv;
        candles.push(Candle::new(timestamp, open, high, low, close, volume));

        for ((i, name), values) in extra.iter().zip(columns.iter_mut()) {
            values.push(parse_optional(cell(*i)).ok_or_else(|| LoadError::Number {
                row,
                column: name.clone(),
                value: cell(*i).to_string(),
            })?);
        }
    }

    let mut series = CandleSeries::new(candles)?;
    for ((_, name), values) in extra.into_iter().zip(columns) {
        series.insert_column(name, values)?;
    }
    let dataset_hash = DatasetHash::of(&series);
    Ok(LoadedSeries {
        series,
        dataset_hash,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Empty cells are undefined; anything else must be a number.
fn parse_optional(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        Some(f64::NAN)
    } else {
        raw.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
timestamp,open,high,low,close,volume,stoch_k,atr_pct
2024-01-01T00:00:00Z,100,101,99,100.5,10,,1.2
2024-01-01T01:00:00Z,100.5,102,100,101,12,35.5,1.3
2024-01-01T02:00:00Z,101,101.5,99.5,100,8,18,1.1
";

    #[test]
    fn loads_candles_and_columns() {
        let loaded = load_series_from_reader(CSV.as_bytes()).unwrap();
        let s = &loaded.series;
        assert_eq!(s.len(), 3);
        assert_eq!(s.bar(1).close, 101.0);
        assert_eq!(s.bar(0).indicator("stoch_k"), None);
        assert_eq!(s.bar(1).indicator("stoch_k"), Some(35.5));
        assert_eq!(s.bar(2).indicator("atr_pct"), Some(1.1));
        assert_eq!(s.columns().len(), 2);
    }

    #[test]
    fn dataset_hash_is_stable() {
        let a = load_series_from_reader(CSV.as_bytes()).unwrap();
        let b = load_series_from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
    }

    #[test]
    fn epoch_millis_and_naive_timestamps() {
        let csv = "timestamp,open,high,low,close,volume\n\
                   1704067200000,1,1,1,1,0\n\
                   2024-01-01 01:00:00,1,1,1,1,0\n";
        let loaded = load_series_from_reader(csv.as_bytes()).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(loaded.series.bar(0).timestamp, t0);
        assert_eq!(loaded.series.bar(1).timestamp, t0 + chrono::Duration::hours(1));
    }

    #[test]
    fn header_case_and_order_are_free() {
        let csv = "Close,Timestamp,Open,High,Low,Volume\n5,2024-01-01T00:00:00Z,4,6,3,1\n";
        let loaded = load_series_from_reader(csv.as_bytes()).unwrap();
        let bar = loaded.series.bar(0);
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (4.0, 6.0, 3.0, 5.0));
    }

    #[test]
    fn missing_required_column() {
        let csv = "timestamp,open,high,low,close\n2024-01-01T00:00:00Z,1,1,1,1\n";
        let err = load_series_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("volume")));
    }

    #[test]
    fn bad_cells_report_row_and_column() {
        let csv = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,0\n";
        assert!(matches!(
            load_series_from_reader(csv.as_bytes()).unwrap_err(),
            LoadError::Timestamp { row: 0, .. }
        ));

        let csv = "timestamp,open,high,low,close,volume\n2024-01-01T00:00:00Z,1,x,1,1,0\n";
        match load_series_from_reader(csv.as_bytes()).unwrap_err() {
            LoadError::Number { row, column, .. } => {
                assert_eq!(row, 0);
                assert_eq!(column, "high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_monotonic_timestamps_are_rejected() {
        let csv = "timestamp,open,high,low,close,volume\n\
                   2024-01-01T01:00:00Z,1,1,1,1,0\n\
                   2024-01-01T00:00:00Z,1,1,1,1,0\n";
        assert!(matches!(
            load_series_from_reader(csv.as_bytes()).unwrap_err(),
            LoadError::Series(SeriesError::NonMonotonicTimestamp { .. })
        ));
    }
}
