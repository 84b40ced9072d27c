//! Entry filters: gate a provider's entry signals on market conditions.
//!
//! A filter sees the proposed side and the entry bar. A filter whose column
//! is undefined on that bar lets the signal through.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ExitReason, Position, Side};

use super::SignalProvider;

/// Outcome of one filter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterVerdict {
    Passed,
    FilteredByTrend,
    FilteredBySideways,
    FilteredByImpulse,
}

impl FilterVerdict {
    pub fn is_passed(self) -> bool {
        self == Self::Passed
    }
}

pub trait EntryFilter: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, side: Side, bar: &Bar<'_>) -> FilterVerdict;
}

/// Longs only above the trend line, shorts only below it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendFilter {
    pub key: String,
}

impl Default for TrendFilter {
    fn default() -> Self {
        Self {
            key: "ema_trend".into(),
        }
    }
}

impl EntryFilter for TrendFilter {
    fn name(&self) -> &str {
        "trend"
    }

    fn evaluate(&self, side: Side, bar: &Bar<'_>) -> FilterVerdict {
        let Some(trend) = bar.indicator(&self.key) else {
            return FilterVerdict::Passed;
        };
        let below = bar.close < trend;
        match (side, below) {
            (Side::Long, true) | (Side::Short, false) => FilterVerdict::FilteredByTrend,
            _ => FilterVerdict::Passed,
        }
    }
}

/// Blocks all entries while the recent cross count marks a choppy market.
#[derive(Debug, Clone, PartialEq)]
pub struct SidewaysFilter {
    pub key: String,
    pub max_crosses: f64,
}

impl Default for SidewaysFilter {
    fn default() -> Self {
        Self {
            key: "sideways_cross_count".into(),
            max_crosses: 8.0,
        }
    }
}

impl EntryFilter for SidewaysFilter {
    fn name(&self) -> &str {
        "sideways"
    }

    fn evaluate(&self, _side: Side, bar: &Bar<'_>) -> FilterVerdict {
        match bar.indicator(&self.key) {
            Some(crosses) if crosses > self.max_crosses => FilterVerdict::FilteredBySideways,
            _ => FilterVerdict::Passed,
        }
    }
}

/// Impulse MACD must agree with the side: positive for longs, negative for shorts.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseFilter {
    pub key: String,
}

impl Default for ImpulseFilter {
    fn default() -> Self {
        Self {
            key: "impulse_macd".into(),
        }
    }
}

impl EntryFilter for ImpulseFilter {
    fn name(&self) -> &str {
        "impulse"
    }

    fn evaluate(&self, side: Side, bar: &Bar<'_>) -> FilterVerdict {
        let Some(impulse) = bar.indicator(&self.key) else {
            return FilterVerdict::Passed;
        };
        let agrees = match side {
            Side::Long => impulse > 0.0,
            Side::Short => impulse < 0.0,
        };
        if agrees {
            FilterVerdict::Passed
        } else {
            FilterVerdict::FilteredByImpulse
        }
    }
}

/// A provider whose entries must pass every filter. Exits are untouched.
pub struct Filtered<P> {
    inner: P,
    filters: Vec<Box<dyn EntryFilter>>,
}

impl<P: SignalProvider> Filtered<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl EntryFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// First failing verdict for `side` on `bar`, or `Passed`.
    pub fn verdict(&self, side: Side, bar: &Bar<'_>) -> FilterVerdict {
        self.filters
            .iter()
            .map(|f| f.evaluate(side, bar))
            .find(|v| !v.is_passed())
            .unwrap_or(FilterVerdict::Passed)
    }
}

impl<P: SignalProvider> SignalProvider for Filtered<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn entry(&self, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<Side> {
        let side = self.inner.entry(prev, curr)?;
        let verdict = self.verdict(side, curr);
        if verdict.is_passed() {
            Some(side)
        } else {
            tracing::trace!(bar = curr.index, %side, ?verdict, "entry blocked");
            None
        }
    }

    fn take_profit(&self, side: Side, entry_bar: &Bar<'_>) -> Option<f64> {
        self.inner.take_profit(side, entry_bar)
    }

    fn exit(&self, position: &Position, prev: &Bar<'_>, curr: &Bar<'_>) -> Option<(f64, ExitReason)> {
        self.inner.exit(position, prev, curr)
    }

    fn columns(&self) -> Vec<&str> {
        self.inner.columns()
    }
}
