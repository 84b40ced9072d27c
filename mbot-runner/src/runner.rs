//! Backtest runner: wires parameters, data fingerprints and the engine.
//!
//! Two entry points:
//! - `run_single()`: one run, packaged as a persistable [`RunRecord`]. Used by the CLI.
//! - `Evaluator::evaluate()`: one search candidate, judged against
//!   [`SearchConstraints`] and scored. Used by sweeps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mbot_core::config::{ConfigError, EngineParams};
use mbot_core::domain::{CandleSeries, SeriesError};
use mbot_core::engine::{Engine, EngineError, RunResult};
use mbot_core::fingerprint::{DatasetHash, ParamsHash, RunId};

use crate::fitness::{FitnessMetric, Infeasibility, SearchConstraints};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
    #[error("failed to fingerprint parameters: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl From<EngineError> for RunError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config(e) => Self::Config(e),
            EngineError::Series(e) => Self::Series(e),
        }
    }
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete, reproducible record of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub params_hash: ParamsHash,
    pub dataset_hash: DatasetHash,
    pub params: EngineParams,
    pub result: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn run_id_for(params: &EngineParams, dataset: &DatasetHash) -> Result<(ParamsHash, RunId), RunError> {
    let params_hash = ParamsHash::of(params)?;
    let run_id = RunId::new(&params_hash, dataset);
    Ok((params_hash, run_id))
}

/// Validate `params`, run once over `series` and package the outcome.
pub fn run_single(
    series: &CandleSeries,
    dataset_hash: &DatasetHash,
    params: &EngineParams,
) -> Result<RunRecord, RunError> {
    let (params_hash, run_id) = run_id_for(params, dataset_hash)?;
    let engine = Engine::new(params.clone())?;
    let result = engine.run(series)?;

    tracing::info!(
        run_id = run_id.short(),
        strategy = %result.strategy,
        trades = result.trades_count,
        end_capital = result.end_capital,
        pnl_pct = result.total_pnl_pct,
        max_drawdown_pct = result.max_drawdown_pct,
        "backtest complete"
    );

    Ok(RunRecord {
        schema_version: SCHEMA_VERSION,
        run_id,
        params_hash,
        dataset_hash: dataset_hash.clone(),
        params: params.clone(),
        result,
    })
}

/// Outcome of judging one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Feasible {
        score: f64,
        result: RunResult,
    },
    /// `result` is absent when the parameters never reached the engine.
    Infeasible {
        reason: Infeasibility,
        result: Option<RunResult>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub run_id: RunId,
    pub params: EngineParams,
    pub verdict: Verdict,
}

impl Evaluation {
    pub fn is_feasible(&self) -> bool {
        matches!(self.verdict, Verdict::Feasible { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match &self.verdict {
            Verdict::Feasible { score, .. } => Some(*score),
            Verdict::Infeasible { .. } => None,
        }
    }

    pub fn result(&self) -> Option<&RunResult> {
        match &self.verdict {
            Verdict::Feasible { result, .. } => Some(result),
            Verdict::Infeasible { result, .. } => result.as_ref(),
        }
    }
}

/// Evaluates candidates against one shared, read-only series.
#[derive(Debug, Clone)]
pub struct Evaluator {
    series: Arc<CandleSeries>,
    dataset_hash: DatasetHash,
    constraints: SearchConstraints,
    metric: FitnessMetric,
}

impl Evaluator {
    pub fn new(series: Arc<CandleSeries>, dataset_hash: DatasetHash, constraints: SearchConstraints) -> Self {
        Self {
            series,
            dataset_hash,
            constraints,
            metric: FitnessMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: FitnessMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn dataset_hash(&self) -> &DatasetHash {
        &self.dataset_hash
    }

    pub fn constraints(&self) -> &SearchConstraints {
        &self.constraints
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    /// Run one candidate. Invalid parameters are infeasible, not errors.
    pub fn evaluate(&self, params: &EngineParams) -> Result<Evaluation, RunError> {
        let (_, run_id) = run_id_for(params, &self.dataset_hash)?;

        let engine = match Engine::new(params.clone()) {
            Ok(engine) => engine,
            Err(err) => {
                tracing::debug!(run_id = run_id.short(), %err, "candidate rejected");
                return Ok(Evaluation {
                    run_id,
                    params: params.clone(),
                    verdict: Verdict::Infeasible {
                        reason: err.into(),
                        result: None,
                    },
                });
            }
        };

        let result = engine.run(&self.series)?;
        let verdict = match self.constraints.check(&result) {
            Ok(()) => Verdict::Feasible {
                score: self.metric.extract(&result),
                result,
            },
            Err(reason) => Verdict::Infeasible {
                reason,
                result: Some(result),
            },
        };

        Ok(Evaluation {
            run_id,
            params: params.clone(),
            verdict,
        })
    }
}
