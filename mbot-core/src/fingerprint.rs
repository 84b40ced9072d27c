//! Run fingerprinting: content hashes identifying parameters, data and runs.
//!
//! - `ParamsHash`: BLAKE3 of the canonical JSON of an `EngineParams`.
//! - `DatasetHash`: BLAKE3 over every candle and indicator value.
//! - `RunId`: both hashes combined, so identical inputs share an id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineParams;
use crate::domain::CandleSeries;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamsHash(pub String);

impl ParamsHash {
    /// Struct fields serialize in declaration order, so the JSON is canonical.
    pub fn of(params: &EngineParams) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(params)?;
        Ok(Self(blake3::hash(&json).to_hex().to_string()))
    }
}

impl fmt::Display for ParamsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of(series: &CandleSeries) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(series.len() as u64).to_le_bytes());
        for c in series.candles() {
            hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
            for v in [c.open, c.high, c.low, c.close, c.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        // BTreeMap iteration keeps column order stable.
        for name in series.columns().names() {
            hasher.update(name.as_bytes());
            if let Some(values) = series.columns().series(name) {
                for v in values {
                    hasher.update(&v.to_bits().to_le_bytes());
                }
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic identity of one (params, dataset) evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new(params: &ParamsHash, dataset: &DatasetHash) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(params.0.as_bytes());
        hasher.update(b":");
        hasher.update(dataset.0.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex characters, for logs and file names.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    /// 64-bit seed derived from the id, for per-run RNG streams.
    pub fn seed(&self) -> u64 {
        let hash = blake3::hash(self.0.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
