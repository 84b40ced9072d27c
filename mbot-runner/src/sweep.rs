//! Parameter search: grid and seeded random candidates, evaluated in parallel.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mbot_core::config::{EngineParams, StrategyConfig};
use mbot_core::fingerprint::RunId;

use crate::leaderboard::Leaderboard;
use crate::rng::RngHierarchy;
use crate::runner::{Evaluation, Evaluator, RunError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    #[error("parameter '{param}' does not apply to this configuration")]
    NotApplicable { param: Param },

    #[error("range for '{param}' is empty or not finite ({min}..={max})")]
    BadRange { param: Param, min: f64, max: f64 },
}

/// A tunable field of [`EngineParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    BaseLeverage,
    MaxLeverage,
    TargetVolatilityPct,
    BalanceFraction,
    StopBufferPct,
    /// StochRSI strategies only.
    Oversold,
    /// StochRSI strategies only.
    Overbought,
    /// Requires the sideways filter.
    SidewaysMaxCrosses,
    /// The `forecast_*` axes require a forecast section.
    ForecastMaxMemory,
    ForecastHorizon,
    ForecastUpperPct,
    ForecastMidPct,
    ForecastLowerPct,
}

impl Param {
    pub fn name(self) -> &'static str {
        match self {
            Self::BaseLeverage => "base_leverage",
            Self::MaxLeverage => "max_leverage",
            Self::TargetVolatilityPct => "target_volatility_pct",
            Self::BalanceFraction => "balance_fraction",
            Self::StopBufferPct => "stop_buffer_pct",
            Self::Oversold => "oversold",
            Self::Overbought => "overbought",
            Self::SidewaysMaxCrosses => "sideways_max_crosses",
            Self::ForecastMaxMemory => "forecast_max_memory",
            Self::ForecastHorizon => "forecast_horizon",
            Self::ForecastUpperPct => "forecast_upper_pct",
            Self::ForecastMidPct => "forecast_mid_pct",
            Self::ForecastLowerPct => "forecast_lower_pct",
        }
    }

    /// Integer-valued parameters are rounded when set.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::BaseLeverage | Self::SidewaysMaxCrosses | Self::ForecastMaxMemory | Self::ForecastHorizon
        )
    }

    /// Current value, or `None` when the field is absent from `params`.
    pub fn read(self, params: &EngineParams) -> Option<f64> {
        match self {
            Self::BaseLeverage => Some(params.base_leverage),
            Self::MaxLeverage => Some(params.max_leverage),
            Self::TargetVolatilityPct => Some(params.target_volatility_pct),
            Self::BalanceFraction => Some(params.balance_fraction),
            Self::StopBufferPct => Some(params.stop_buffer_pct),
            Self::Oversold => match &params.strategy {
                StrategyConfig::StochRsi(p) => Some(p.oversold),
                _ => None,
            },
            Self::Overbought => match &params.strategy {
                StrategyConfig::StochRsi(p) => Some(p.overbought),
                _ => None,
            },
            Self::SidewaysMaxCrosses => params.filters.sideways.as_ref().map(|s| s.max_crosses),
            Self::ForecastMaxMemory => params.forecast.as_ref().map(|f| f.max_memory as f64),
            Self::ForecastHorizon => params.forecast.as_ref().map(|f| f.horizon as f64),
            Self::ForecastUpperPct => params.forecast.as_ref().map(|f| f.upper_pct),
            Self::ForecastMidPct => params.forecast.as_ref().map(|f| f.mid_pct),
            Self::ForecastLowerPct => params.forecast.as_ref().map(|f| f.lower_pct),
        }
    }

    pub fn apply(self, params: &mut EngineParams, value: f64) -> Result<(), SweepError> {
        let value = if self.is_integer() { value.round() } else { value };
        let not_applicable = SweepError::NotApplicable { param: self };
        match self {
            Self::BaseLeverage => params.base_leverage = value,
            Self::MaxLeverage => params.max_leverage = value,
            Self::TargetVolatilityPct => params.target_volatility_pct = value,
            Self::BalanceFraction => params.balance_fraction = value,
            Self::StopBufferPct => params.stop_buffer_pct = value,
            Self::Oversold | Self::Overbought => match &mut params.strategy {
                StrategyConfig::StochRsi(p) if self == Self::Oversold => p.oversold = value,
                StrategyConfig::StochRsi(p) => p.overbought = value,
                _ => return Err(not_applicable),
            },
            Self::SidewaysMaxCrosses => {
                params.filters.sideways.as_mut().ok_or(not_applicable)?.max_crosses = value
            }
            _ => {
                let forecast = params.forecast.as_mut().ok_or(not_applicable)?;
                match self {
                    Self::ForecastMaxMemory => forecast.max_memory = value.max(0.0) as usize,
                    Self::ForecastHorizon => forecast.horizon = value.max(0.0) as usize,
                    Self::ForecastUpperPct => forecast.upper_pct = value,
                    Self::ForecastMidPct => forecast.mid_pct = value,
                    _ => forecast.lower_pct = value,
                }
            }
        }
        Ok(())
    }

    fn check(self, params: &EngineParams) -> Result<(), SweepError> {
        self.read(params)
            .map(|_| ())
            .ok_or(SweepError::NotApplicable { param: self })
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One grid dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub param: Param,
    pub values: Vec<f64>,
}

/// Cartesian product of axis values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub axes: Vec<GridAxis>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(mut self, param: Param, values: Vec<f64>) -> Self {
        self.axes.push(GridAxis { param, values });
        self
    }

    /// Number of configurations; a grid without axes yields the base alone.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    /// Every combination applied to `base`, first axis varying slowest.
    pub fn generate(&self, base: &EngineParams) -> Result<Vec<EngineParams>, SweepError> {
        for axis in &self.axes {
            axis.param.check(base)?;
        }
        let mut configs = vec![base.clone()];
        for axis in &self.axes {
            let mut next = Vec::with_capacity(configs.len() * axis.values.len());
            for config in &configs {
                for &value in &axis.values {
                    let mut candidate = config.clone();
                    axis.param.apply(&mut candidate, value)?;
                    next.push(candidate);
                }
            }
            configs = next;
        }
        Ok(configs)
    }
}

/// Inclusive sampling bounds for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub param: Param,
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    fn validate(&self) -> Result<(), SweepError> {
        if self.min.is_finite() && self.max.is_finite() && self.min <= self.max {
            Ok(())
        } else {
            Err(SweepError::BadRange {
                param: self.param,
                min: self.min,
                max: self.max,
            })
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// Box of parameter ranges for random search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpace {
    pub ranges: Vec<ParamRange>,
}

impl ParamSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, param: Param, min: f64, max: f64) -> Self {
        self.ranges.push(ParamRange { param, min, max });
        self
    }

    /// A narrower space centred on `center`'s values, for local refinement.
    ///
    /// Each range shrinks to `width` (a fraction of its span) around the
    /// candidate's value and stays inside the original bounds.
    pub fn around(&self, center: &EngineParams, width: f64) -> Self {
        let width = width.clamp(0.0, 1.0);
        let ranges = self
            .ranges
            .iter()
            .map(|r| {
                let mid = r.param.read(center).unwrap_or((r.min + r.max) / 2.0);
                let mid = mid.clamp(r.min, r.max);
                let half = (r.max - r.min) * width / 2.0;
                ParamRange {
                    param: r.param,
                    min: (mid - half).max(r.min),
                    max: (mid + half).min(r.max),
                }
            })
            .collect();
        Self { ranges }
    }

    fn sample_into<R: Rng>(&self, base: &EngineParams, rng: &mut R) -> Result<EngineParams, SweepError> {
        let mut params = base.clone();
        for range in &self.ranges {
            range.param.apply(&mut params, range.sample(rng))?;
        }
        Ok(params)
    }
}

/// Seeded uniform sampling of a [`ParamSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSearch {
    pub samples: usize,
    pub seed: u64,
}

impl RandomSearch {
    const STREAM: &'static str = "random_search";

    pub fn new(samples: usize, seed: u64) -> Self {
        Self { samples, seed }
    }

    /// Sample `i` depends only on `(seed, i)`.
    pub fn generate(&self, space: &ParamSpace, base: &EngineParams) -> Result<Vec<EngineParams>, SweepError> {
        for range in &space.ranges {
            range.validate()?;
            range.param.check(base)?;
        }
        let rngs = RngHierarchy::new(self.seed);
        (0..self.samples)
            .map(|i| space.sample_into(base, &mut rngs.rng_for(Self::STREAM, i as u64)))
            .collect()
    }
}

/// Parameter sweep executor.
///
/// Runs every candidate through an [`Evaluator`], optionally in parallel.
/// Output order always matches input order.
pub struct ParamSweep {
    evaluator: Evaluator,
    parallel: bool,
}

impl ParamSweep {
    pub fn new(evaluator: Evaluator) -> Self {
        Self {
            evaluator,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn sweep(&self, candidates: &[EngineParams]) -> Result<SweepResults, RunError> {
        self.sweep_with_progress(candidates, |_, _, _| {})
    }

    /// The callback receives `(index, total, evaluation)` as each candidate
    /// finishes; with parallelism on, completion order is arbitrary.
    pub fn sweep_with_progress<F>(
        &self,
        candidates: &[EngineParams],
        progress_callback: F,
    ) -> Result<SweepResults, RunError>
    where
        F: Fn(usize, usize, &Evaluation) + Send + Sync,
    {
        let total = candidates.len();
        let run = |(idx, params): (usize, &EngineParams)| -> Result<Evaluation, RunError> {
            let evaluation = self.evaluator.evaluate(params)?;
            progress_callback(idx, total, &evaluation);
            Ok(evaluation)
        };

        let evaluations: Vec<Evaluation> = if self.parallel {
            candidates
                .par_iter()
                .enumerate()
                .map(run)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            candidates
                .iter()
                .enumerate()
                .map(run)
                .collect::<Result<Vec<_>, _>>()?
        };

        let results = SweepResults::new(evaluations);
        tracing::info!(
            candidates = total,
            feasible = results.feasible().count(),
            parallel = self.parallel,
            "sweep complete"
        );
        Ok(results)
    }
}

/// Results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    evaluations: Vec<Evaluation>,
    by_run_id: HashMap<RunId, usize>,
}

impl SweepResults {
    fn new(evaluations: Vec<Evaluation>) -> Self {
        let by_run_id = evaluations
            .iter()
            .enumerate()
            .map(|(i, e)| (e.run_id.clone(), i))
            .collect();
        Self {
            evaluations,
            by_run_id,
        }
    }

    pub fn all(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    pub fn get(&self, run_id: &RunId) -> Option<&Evaluation> {
        self.by_run_id.get(run_id).map(|&i| &self.evaluations[i])
    }

    pub fn feasible(&self) -> impl Iterator<Item = &Evaluation> {
        self.evaluations.iter().filter(|e| e.is_feasible())
    }

    /// Best `n` feasible candidates, deduplicated by run id.
    pub fn leaderboard(&self, n: usize) -> Leaderboard {
        let mut board = Leaderboard::new(n);
        for evaluation in &self.evaluations {
            board.insert_evaluation(evaluation);
        }
        board
    }

    pub fn best(&self) -> Option<&Evaluation> {
        let board = self.leaderboard(1);
        let run_id = board.entries().first().map(|e| e.run_id.clone())?;
        self.get(&run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::SearchConstraints;
    use crate::test_support::{macd_params, oscillating_series};
    use mbot_core::config::SidewaysFilterConfig;
    use mbot_core::fingerprint::DatasetHash;
    use mbot_core::forecast::ForecastConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn lenient_sweep(parallel: bool) -> ParamSweep {
        let series = oscillating_series(150);
        let hash = DatasetHash::of(&series);
        let constraints = SearchConstraints {
            min_trades: 1,
            max_loss_per_trade_pct: 100.0,
            max_pnl_pct: f64::INFINITY,
        };
        ParamSweep::new(Evaluator::new(Arc::new(series), hash, constraints)).with_parallelism(parallel)
    }

    #[test]
    fn apply_rounds_integer_params() {
        let mut params = EngineParams::default();
        Param::BaseLeverage.apply(&mut params, 7.6).unwrap();
        assert_eq!(params.base_leverage, 8.0);
        Param::StopBufferPct.apply(&mut params, 0.35).unwrap();
        assert_eq!(params.stop_buffer_pct, 0.35);
        Param::Oversold.apply(&mut params, 15.0).unwrap();
        assert_eq!(Param::Oversold.read(&params), Some(15.0));
    }

    #[test]
    fn strategy_specific_params_need_their_strategy() {
        let mut params = macd_params();
        assert_eq!(
            Param::Overbought.apply(&mut params, 70.0),
            Err(SweepError::NotApplicable { param: Param::Overbought })
        );
        assert!(Param::ForecastHorizon.read(&params).is_none());
        assert!(Param::SidewaysMaxCrosses.apply(&mut params, 4.0).is_err());

        params.forecast = Some(ForecastConfig::default());
        params.filters.sideways = Some(SidewaysFilterConfig::default());
        Param::ForecastHorizon.apply(&mut params, 20.2).unwrap();
        Param::SidewaysMaxCrosses.apply(&mut params, 4.0).unwrap();
        assert_eq!(Param::ForecastHorizon.read(&params), Some(20.0));
        assert_eq!(Param::SidewaysMaxCrosses.read(&params), Some(4.0));
    }

    #[test]
    fn grid_is_cartesian_first_axis_slowest() {
        let grid = ParamGrid::new()
            .axis(Param::BaseLeverage, vec![5.0, 10.0])
            .axis(Param::StopBufferPct, vec![0.1, 0.2, 0.3]);
        assert_eq!(grid.size(), 6);
        let configs = grid.generate(&EngineParams::default()).unwrap();
        assert_eq!(configs.len(), 6);
        assert_eq!(configs[0].base_leverage, 5.0);
        assert_eq!(configs[2].stop_buffer_pct, 0.3);
        assert_eq!(configs[3].base_leverage, 10.0);
        assert_eq!(configs[3].stop_buffer_pct, 0.1);
    }

    #[test]
    fn empty_grid_yields_base() {
        let configs = ParamGrid::new().generate(&EngineParams::default()).unwrap();
        assert_eq!(configs, vec![EngineParams::default()]);
    }

    #[test]
    fn grid_rejects_inapplicable_axis_up_front() {
        let grid = ParamGrid::new().axis(Param::ForecastMidPct, vec![40.0, 60.0]);
        assert!(grid.generate(&EngineParams::default()).is_err());
    }

    #[test]
    fn random_search_is_seeded_and_bounded() {
        let space = ParamSpace::new()
            .range(Param::BaseLeverage, 5.0, 50.0)
            .range(Param::TargetVolatilityPct, 1.0, 5.0);
        let base = EngineParams::default();
        let a = RandomSearch::new(25, 3).generate(&space, &base).unwrap();
        let b = RandomSearch::new(25, 3).generate(&space, &base).unwrap();
        let c = RandomSearch::new(25, 4).generate(&space, &base).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        for p in &a {
            assert!((5.0..=50.0).contains(&p.base_leverage));
            assert_eq!(p.base_leverage, p.base_leverage.round());
            assert!((1.0..=5.0).contains(&p.target_volatility_pct));
        }
        // Sample i does not depend on how many samples are drawn.
        let short = RandomSearch::new(5, 3).generate(&space, &base).unwrap();
        assert_eq!(&a[..5], &short[..]);
    }

    #[test]
    fn random_search_rejects_bad_range() {
        let space = ParamSpace::new().range(Param::StopBufferPct, 1.0, 0.5);
        assert!(matches!(
            RandomSearch::new(3, 0).generate(&space, &EngineParams::default()),
            Err(SweepError::BadRange { .. })
        ));
    }

    #[test]
    fn around_narrows_inside_original_bounds() {
        let space = ParamSpace::new()
            .range(Param::BaseLeverage, 5.0, 45.0)
            .range(Param::StopBufferPct, 0.1, 1.0);
        let center = EngineParams {
            base_leverage: 40.0,
            stop_buffer_pct: 0.2,
            ..EngineParams::default()
        };
        let local = space.around(&center, 0.25);
        assert_eq!(local.ranges[0].min, 35.0);
        assert_eq!(local.ranges[0].max, 45.0);
        assert!((local.ranges[1].min - 0.1).abs() < 1e-12);
        assert!((local.ranges[1].max - 0.3125).abs() < 1e-12);
    }

    #[test]
    fn parallel_and_sequential_sweeps_agree() {
        let grid = ParamGrid::new()
            .axis(Param::BaseLeverage, vec![2.0, 5.0, 10.0])
            .axis(Param::StopBufferPct, vec![0.0, 0.5]);
        let candidates = grid.generate(&macd_params()).unwrap();

        let par = lenient_sweep(true).sweep(&candidates).unwrap();
        let seq = lenient_sweep(false).sweep(&candidates).unwrap();
        assert_eq!(par.all(), seq.all());
        assert_eq!(par.len(), 6);
        let best = par.best().unwrap();
        assert_eq!(Some(best.run_id.clone()), seq.best().map(|e| e.run_id.clone()));
        assert!(par.get(&best.run_id).is_some());
    }

    #[test]
    fn progress_callback_sees_every_candidate() {
        let candidates = ParamGrid::new()
            .axis(Param::BaseLeverage, vec![1.0, 2.0, 3.0, 4.0])
            .generate(&macd_params())
            .unwrap();
        let seen = AtomicUsize::new(0);
        let results = lenient_sweep(true)
            .sweep_with_progress(&candidates, |_, total, _| {
                assert_eq!(total, 4);
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        assert_eq!(results.len(), 4);
    }
}
