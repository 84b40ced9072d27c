//! Backtest configuration files.
//!
//! A config file names the candle CSV, the engine parameters and, optionally,
//! a parameter search:
//!
//! ```toml
//! [data]
//! path = "data/BTCUSDT_1h.csv"
//!
//! [params]
//! base_leverage = 10
//! target_volatility_pct = 1.5
//!
//! [params.strategy]
//! type = "stoch_rsi"
//! oversold = 20
//!
//! [search]
//! top_n = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mbot_core::config::{ConfigError, EngineParams};

use crate::fitness::SearchConstraints;
use crate::sweep::{ParamGrid, ParamSpace};

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid engine parameters: {0}")]
    Params(#[from] ConfigError),
}

/// Where the candle series comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file; relative paths resolve against the config file's directory.
    pub path: PathBuf,
}

/// Seeded random sampling of a parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomConfig {
    pub samples: usize,
    #[serde(default)]
    pub seed: u64,
    pub space: ParamSpace,
}

/// Parameter search settings. Grid and random search may both be present;
/// their candidates are pooled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_n: usize,
    pub parallel: bool,
    pub constraints: SearchConstraints,
    pub grid: Option<ParamGrid>,
    pub random: Option<RandomConfig>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            parallel: true,
            constraints: SearchConstraints::default(),
            grid: None,
            random: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub params: EngineParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,
}

impl BacktestConfig {
    /// Parse and validate the base parameters.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(content)?;
        config.params.validate()?;
        Ok(config)
    }

    /// Load from disk, resolving `data.path` relative to the file.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.data.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data.path = dir.join(&config.data.path);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbot_core::config::StrategyConfig;

    #[test]
    fn minimal_config_uses_engine_defaults() {
        let config = BacktestConfig::from_toml_str(
            r#"
            [data]
            path = "candles.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.data.path, PathBuf::from("candles.csv"));
        assert_eq!(config.params, EngineParams::default());
        assert!(config.search.is_none());
    }

    #[test]
    fn strategy_and_search_sections_parse() {
        let config = BacktestConfig::from_toml_str(
            r#"
            [data]
            path = "candles.csv"

            [params]
            base_leverage = 12
            stop_buffer_pct = 0.3

            [params.strategy]
            type = "macd_cross"

            [search]
            top_n = 3

            [search.constraints]
            min_trades = 5

            [[search.grid.axes]]
            param = "base_leverage"
            values = [5, 10, 15]

            [search.random]
            samples = 20
            seed = 7

            [[search.random.space.ranges]]
            param = "stop_buffer_pct"
            min = 0.1
            max = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.params.base_leverage, 12.0);
        assert!(matches!(config.params.strategy, StrategyConfig::MacdCross(_)));
        let search = config.search.unwrap();
        assert_eq!(search.top_n, 3);
        assert!(search.parallel);
        assert_eq!(search.constraints.min_trades, 5);
        assert_eq!(search.constraints.max_loss_per_trade_pct, 2.0);
        assert_eq!(search.grid.unwrap().size(), 3);
        let random = search.random.unwrap();
        assert_eq!(random.samples, 20);
        assert_eq!(random.space.ranges.len(), 1);
    }

    #[test]
    fn invalid_base_params_are_rejected() {
        let err = BacktestConfig::from_toml_str(
            r#"
            [data]
            path = "candles.csv"

            [params]
            fee_rate = 1.5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigFileError::Params(_)));
    }

    #[test]
    fn load_resolves_relative_data_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bt.toml");
        std::fs::write(&path, "[data]\npath = \"candles.csv\"\n").unwrap();

        let config = BacktestConfig::load(&path).unwrap();
        assert_eq!(config.data.path, dir.path().join("candles.csv"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::load(Path::new("/nonexistent/mbot.toml")).unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
    }
}
