//! Candle series: immutable, time-ordered candles plus indicator columns.

use chrono::{DateTime, Utc};
use std::ops::Deref;
use thiserror::Error;

use super::candle::Candle;
use super::columns::IndicatorColumns;

/// Rejections raised while assembling a series. The engine itself never
/// validates input; callers build a `CandleSeries` first.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamp at index {index} ({current}) is not after the previous one ({previous})")]
    NonMonotonicTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("candle {index} has an invalid {field} value")]
    InvalidPrice { index: usize, field: &'static str },

    #[error("column '{name}' has {actual} values but the series has {expected} candles")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Immutable candle sequence with its derived indicator columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    columns: IndicatorColumns,
}

impl CandleSeries {
    /// Build a series, rejecting non-monotonic timestamps and NaN/negative OHLCV.
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        for (index, candle) in candles.iter().enumerate() {
            if let Some(field) = candle.invalid_field() {
                return Err(SeriesError::InvalidPrice { index, field });
            }
            if index > 0 {
                let previous = candles[index - 1].timestamp;
                if candle.timestamp <= previous {
                    return Err(SeriesError::NonMonotonicTimestamp {
                        index,
                        previous,
                        current: candle.timestamp,
                    });
                }
            }
        }
        Ok(Self {
            candles,
            columns: IndicatorColumns::new(),
        })
    }

    /// Attach a named indicator column (builder style).
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), SeriesError> {
        let name = name.into();
        if values.len() != self.candles.len() {
            return Err(SeriesError::ColumnLength {
                name,
                expected: self.candles.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn columns(&self) -> &IndicatorColumns {
        &self.columns
    }

    /// View of the bar at `index`. Panics if out of range, like slice indexing.
    pub fn bar(&self, index: usize) -> Bar<'_> {
        Bar {
            index,
            candle: &self.candles[index],
            columns: &self.columns,
        }
    }

    pub fn get(&self, index: usize) -> Option<Bar<'_>> {
        (index < self.candles.len()).then(|| self.bar(index))
    }

    pub fn bars(&self) -> impl Iterator<Item = Bar<'_>> + '_ {
        (0..self.candles.len()).map(move |i| self.bar(i))
    }
}

/// Borrowed view of one candle together with its indicator row.
#[derive(Debug, Clone, Copy)]
pub struct Bar<'a> {
    pub index: usize,
    candle: &'a Candle,
    columns: &'a IndicatorColumns,
}

impl<'a> Bar<'a> {
    /// Indicator value on this bar; `None` when undefined.
    pub fn indicator(&self, key: &str) -> Option<f64> {
        self.columns.get(key, self.index)
    }

    pub fn candle(&self) -> &'a Candle {
        self.candle
    }
}

impl Deref for Bar<'_> {
    type Target = Candle;

    fn deref(&self) -> &Candle {
        self.candle
    }
}
