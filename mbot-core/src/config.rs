//! Engine parameters: the immutable record every backtest runs under.
//!
//! All fields carry serde defaults, so a TOML table only needs the values
//! that differ from the stock strategy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RegimeSource, Side};
use crate::engine::WinPolicy;
use crate::forecast::ForecastConfig;
use crate::signals::{
    AtrTarget, Filtered, ForecastBandExit, ImpulseFilter, MacdCross, SidewaysFilter,
    SignalProvider, StochRsiReversal, TrendFilter,
};
use crate::sizers::{FeeModel, VolatilityTargetSizer};

/// Parameter combinations the engine refuses to run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be in {range} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("both long and short entries are disabled")]
    NoSideEnabled,

    #[error("oversold level {oversold} must be below overbought level {overbought}")]
    ThresholdOrder { oversold: f64, overbought: f64 },

    #[error("column key for {field} is empty")]
    EmptyKey { field: &'static str },

    #[error("crossover needs two distinct columns (both are '{key}')")]
    SameLines { key: String },

    #[error("forecast percentiles must satisfy lower <= mid <= upper (got {lower}/{mid}/{upper})")]
    PercentileOrder { lower: f64, mid: f64, upper: f64 },

    #[error("forecast {field} must be at least {min} (got {value})")]
    ForecastTooSmall {
        field: &'static str,
        value: usize,
        min: usize,
    },

    #[error("strategy '{strategy}' needs a [forecast] section")]
    MissingForecast { strategy: &'static str },
}

/// Which sides the engine may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    pub use_longs: bool,
    pub use_shorts: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            use_longs: true,
            use_shorts: true,
        }
    }
}

impl Behavior {
    pub fn allows(&self, side: Side) -> bool {
        match side {
            Side::Long => self.use_longs,
            Side::Short => self.use_shorts,
        }
    }
}

/// Column keys the engine itself reads, independent of the strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKeys {
    pub swing_low: String,
    pub swing_high: String,
    /// Volatility in percent of price, used for leverage targeting.
    pub volatility: String,
}

impl Default for ColumnKeys {
    fn default() -> Self {
        Self {
            swing_low: "swing_low".into(),
            swing_high: "swing_high".into(),
            volatility: "atr_pct".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochRsiParams {
    pub k_key: String,
    pub d_key: String,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for StochRsiParams {
    fn default() -> Self {
        Self {
            k_key: "stoch_k".into(),
            d_key: "stoch_d".into(),
            oversold: 20.0,
            overbought: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub macd_key: String,
    pub signal_key: String,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            macd_key: "macd".into(),
            signal_key: "macd_signal".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrTargetParams {
    pub macd_key: String,
    pub signal_key: String,
    /// Column holding the take-profit distance in price units.
    pub distance_key: String,
}

impl Default for AtrTargetParams {
    fn default() -> Self {
        Self {
            macd_key: "macd".into(),
            signal_key: "macd_signal".into(),
            distance_key: "tp_atr_distance".into(),
        }
    }
}

/// Strategy variant and its thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    StochRsi(StochRsiParams),
    MacdCross(MacdParams),
    AtrTarget(AtrTargetParams),
    ForecastBand(MacdParams),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::StochRsi(StochRsiParams::default())
    }
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StochRsi(_) => "stoch_rsi",
            Self::MacdCross(_) => "macd_cross",
            Self::AtrTarget(_) => "atr_target",
            Self::ForecastBand(_) => "forecast_band",
        }
    }

    pub fn needs_forecast(&self) -> bool {
        matches!(self, Self::ForecastBand(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendFilterConfig {
    pub key: String,
}

impl Default for TrendFilterConfig {
    fn default() -> Self {
        Self {
            key: TrendFilter::default().key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidewaysFilterConfig {
    pub key: String,
    pub max_crosses: f64,
}

impl Default for SidewaysFilterConfig {
    fn default() -> Self {
        let filter = SidewaysFilter::default();
        Self {
            key: filter.key,
            max_crosses: filter.max_crosses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseFilterConfig {
    pub key: String,
}

impl Default for ImpulseFilterConfig {
    fn default() -> Self {
        Self {
            key: ImpulseFilter::default().key,
        }
    }
}

/// Entry filters; a present table enables the filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendFilterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sideways: Option<SidewaysFilterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impulse: Option<ImpulseFilterConfig>,
}

/// Complete parameter record for one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub start_capital: f64,
    /// Taker fee per fill as a fraction of notional.
    pub fee_rate: f64,
    /// Share of capital used as margin per position, in (0, 1].
    pub balance_fraction: f64,
    pub base_leverage: f64,
    pub max_leverage: f64,
    pub target_volatility_pct: f64,
    /// Stop distance beyond the swing level, in percent.
    pub stop_buffer_pct: f64,
    pub behavior: Behavior,
    pub win_policy: WinPolicy,
    pub columns: ColumnKeys,
    pub strategy: StrategyConfig,
    pub filters: FilterConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastConfig>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            start_capital: 1000.0,
            fee_rate: 0.0005,
            balance_fraction: 1.0,
            base_leverage: 10.0,
            max_leverage: 50.0,
            target_volatility_pct: 1.5,
            stop_buffer_pct: 0.1,
            behavior: Behavior::default(),
            win_policy: WinPolicy::default(),
            columns: ColumnKeys::default(),
            strategy: StrategyConfig::default(),
            filters: FilterConfig::default(),
            forecast: None,
        }
    }
}

fn require(ok: bool, field: &'static str, value: f64, range: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, range })
    }
}

fn require_key(key: &str, field: &'static str) -> Result<(), ConfigError> {
    if key.trim().is_empty() {
        Err(ConfigError::EmptyKey { field })
    } else {
        Ok(())
    }
}

fn require_distinct(fast: &str, slow: &str) -> Result<(), ConfigError> {
    if fast == slow {
        Err(ConfigError::SameLines { key: fast.to_string() })
    } else {
        Ok(())
    }
}

fn validate_macd(macd_key: &str, signal_key: &str) -> Result<(), ConfigError> {
    require_key(macd_key, "strategy.macd_key")?;
    require_key(signal_key, "strategy.signal_key")?;
    require_distinct(macd_key, signal_key)
}

impl EngineParams {
    /// Reject parameter sets the engine cannot run meaningfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sc = self.start_capital;
        require(sc.is_finite() && sc > 0.0, "start_capital", sc, "(0, inf)")?;
        let fee = self.fee_rate;
        require((0.0..1.0).contains(&fee), "fee_rate", fee, "[0, 1)")?;
        let bf = self.balance_fraction;
        require(bf > 0.0 && bf <= 1.0, "balance_fraction", bf, "(0, 1]")?;
        let base = self.base_leverage;
        require(base.is_finite() && base > 0.0, "base_leverage", base, "(0, inf)")?;
        let max = self.max_leverage;
        require(max.is_finite() && max >= 1.0, "max_leverage", max, "[1, inf)")?;
        let tv = self.target_volatility_pct;
        require(tv.is_finite() && tv > 0.0, "target_volatility_pct", tv, "(0, inf)")?;
        let buf = self.stop_buffer_pct;
        require((0.0..100.0).contains(&buf), "stop_buffer_pct", buf, "[0, 100)")?;

        if !self.behavior.use_longs && !self.behavior.use_shorts {
            return Err(ConfigError::NoSideEnabled);
        }

        require_key(&self.columns.swing_low, "columns.swing_low")?;
        require_key(&self.columns.swing_high, "columns.swing_high")?;
        require_key(&self.columns.volatility, "columns.volatility")?;

        match &self.strategy {
            StrategyConfig::StochRsi(p) => {
                require_key(&p.k_key, "strategy.k_key")?;
                require_key(&p.d_key, "strategy.d_key")?;
                require_distinct(&p.k_key, &p.d_key)?;
                let in_scale = |v: f64| (0.0..=100.0).contains(&v);
                if !in_scale(p.oversold) || !in_scale(p.overbought) || p.oversold >= p.overbought {
                    return Err(ConfigError::ThresholdOrder {
                        oversold: p.oversold,
                        overbought: p.overbought,
                    });
                }
            }
            StrategyConfig::MacdCross(p) | StrategyConfig::ForecastBand(p) => {
                validate_macd(&p.macd_key, &p.signal_key)?;
            }
            StrategyConfig::AtrTarget(p) => {
                validate_macd(&p.macd_key, &p.signal_key)?;
                require_key(&p.distance_key, "strategy.distance_key")?;
            }
        }

        if let Some(trend) = &self.filters.trend {
            require_key(&trend.key, "filters.trend.key")?;
        }
        if let Some(sideways) = &self.filters.sideways {
            require_key(&sideways.key, "filters.sideways.key")?;
            let mc = sideways.max_crosses;
            require(mc >= 0.0, "filters.sideways.max_crosses", mc, "[0, inf)")?;
        }
        if let Some(impulse) = &self.filters.impulse {
            require_key(&impulse.key, "filters.impulse.key")?;
        }

        match &self.forecast {
            Some(f) => validate_forecast(f)?,
            None if self.strategy.needs_forecast() => {
                return Err(ConfigError::MissingForecast {
                    strategy: self.strategy.name(),
                })
            }
            None => {}
        }

        Ok(())
    }

    /// Stop buffer as a fraction.
    pub fn stop_buffer(&self) -> f64 {
        self.stop_buffer_pct / 100.0
    }

    pub fn fee_model(&self) -> FeeModel {
        FeeModel::new(self.fee_rate)
    }

    pub fn sizer(&self) -> VolatilityTargetSizer {
        VolatilityTargetSizer::new(
            self.base_leverage,
            self.target_volatility_pct,
            self.max_leverage,
            self.balance_fraction,
        )
    }

    /// Validate, then assemble the configured strategy with its entry filters.
    pub fn build_provider(&self) -> Result<Box<dyn SignalProvider>, ConfigError> {
        self.validate()?;

        let base: Box<dyn SignalProvider> = match &self.strategy {
            StrategyConfig::StochRsi(p) => Box::new(StochRsiReversal::new(
                p.k_key.as_str(),
                p.d_key.as_str(),
                p.oversold,
                p.overbought,
            )),
            StrategyConfig::MacdCross(p) => {
                Box::new(MacdCross::new(p.macd_key.as_str(), p.signal_key.as_str()))
            }
            StrategyConfig::AtrTarget(p) => Box::new(AtrTarget::new(
                p.macd_key.as_str(),
                p.signal_key.as_str(),
                p.distance_key.as_str(),
            )),
            StrategyConfig::ForecastBand(p) => Box::new(ForecastBandExit::new(
                p.macd_key.as_str(),
                p.signal_key.as_str(),
            )),
        };

        let mut provider = Filtered::new(base);
        if let Some(trend) = &self.filters.trend {
            provider = provider.with_filter(TrendFilter {
                key: trend.key.clone(),
            });
        }
        if let Some(sideways) = &self.filters.sideways {
            provider = provider.with_filter(SidewaysFilter {
                key: sideways.key.clone(),
                max_crosses: sideways.max_crosses,
            });
        }
        if let Some(impulse) = &self.filters.impulse {
            provider = provider.with_filter(ImpulseFilter {
                key: impulse.key.clone(),
            });
        }
        Ok(Box::new(provider))
    }
}

fn validate_forecast(f: &ForecastConfig) -> Result<(), ConfigError> {
    if f.max_memory < 2 {
        return Err(ConfigError::ForecastTooSmall {
            field: "max_memory",
            value: f.max_memory,
            min: 2,
        });
    }
    if f.horizon < 1 {
        return Err(ConfigError::ForecastTooSmall {
            field: "horizon",
            value: f.horizon,
            min: 1,
        });
    }
    let in_scale = |v: f64| (0.0..=100.0).contains(&v);
    let ordered = f.lower_pct <= f.mid_pct && f.mid_pct <= f.upper_pct;
    if !ordered || !in_scale(f.lower_pct) || !in_scale(f.upper_pct) {
        return Err(ConfigError::PercentileOrder {
            lower: f.lower_pct,
            mid: f.mid_pct,
            upper: f.upper_pct,
        });
    }
    for key in f.regime.keys() {
        require_key(key, "forecast.regime")?;
    }
    if let RegimeSource::Crossover { fast, slow } = &f.regime {
        require_distinct(fast, slow)?;
    }
    Ok(())
}
