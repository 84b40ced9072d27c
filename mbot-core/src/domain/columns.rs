//! Column store for precomputed indicator values.
//!
//! Indicators are computed outside the engine (an external indicator stage)
//! and attached to a series as named columns. A NaN cell means "undefined",
//! typically a warm-up bar.

use std::collections::BTreeMap;

/// Named indicator columns, each the same length as the candle series.
///
/// `BTreeMap` keeps column order deterministic for export and hashing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorColumns {
    columns: BTreeMap<String, Vec<f64>>,
}

impl IndicatorColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a named column.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    /// Raw cell value, NaN included. `None` if the column or index is missing.
    pub fn raw(&self, name: &str, index: usize) -> Option<f64> {
        self.columns.get(name).and_then(|v| v.get(index).copied())
    }

    /// Defined cell value: `None` for missing columns, out-of-range indices and NaN.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.raw(name, index).filter(|v| !v.is_nan())
    }

    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cols = IndicatorColumns::new();
        cols.insert("atr_pct", vec![f64::NAN, 1.5, 2.0]);
        assert_eq!(cols.get("atr_pct", 0), None);
        assert!(cols.raw("atr_pct", 0).unwrap().is_nan());
        assert_eq!(cols.get("atr_pct", 1), Some(1.5));
        assert_eq!(cols.get("atr_pct", 3), None);
    }

    #[test]
    fn missing_column_is_undefined() {
        let cols = IndicatorColumns::new();
        assert_eq!(cols.get("macd", 0), None);
        assert!(!cols.contains("macd"));
    }

    #[test]
    fn names_are_sorted() {
        let mut cols = IndicatorColumns::new();
        cols.insert("swing_low", vec![]);
        cols.insert("atr_pct", vec![]);
        let names: Vec<&str> = cols.names().collect();
        assert_eq!(names, vec!["atr_pct", "swing_low"]);
        assert_eq!(cols.len(), 2);
    }
}
