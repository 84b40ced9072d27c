//! Export: JSON and CSV artifacts for runs and sweeps.
//!
//! - **JSON**: full round-trip of a [`RunRecord`] or sweep report, schema-versioned
//! - **CSV**: trade ledger (re-importable) and forecast bands
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use mbot_core::domain::{CandleSeries, TradeRecord};
use mbot_core::fingerprint::DatasetHash;
use mbot_core::forecast::{LOWER_FORECAST, MID_FORECAST, UPPER_FORECAST};

use crate::fitness::{FitnessMetric, SearchConstraints};
use crate::leaderboard::Leaderboard;
use crate::report::generate_report;
use crate::runner::{RunRecord, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(record: &RunRecord) -> Result<String> {
    serde_json::to_string_pretty(record).context("failed to serialize RunRecord to JSON")
}

pub fn import_json(json: &str) -> Result<RunRecord> {
    let record: RunRecord =
        serde_json::from_str(json).context("failed to deserialize RunRecord from JSON")?;
    check_schema(record.schema_version)?;
    Ok(record)
}

fn check_schema(version: u32) -> Result<()> {
    if version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            version,
            SCHEMA_VERSION
        );
    }
    Ok(())
}

/// Persisted outcome of a parameter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub schema_version: u32,
    pub dataset_hash: DatasetHash,
    pub metric: FitnessMetric,
    pub constraints: SearchConstraints,
    pub candidates: usize,
    pub feasible: usize,
    pub leaderboard: Leaderboard,
}

pub fn export_sweep_json(report: &SweepReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SweepReport to JSON")
}

pub fn import_sweep_json(json: &str) -> Result<SweepReport> {
    let report: SweepReport =
        serde_json::from_str(json).context("failed to deserialize SweepReport from JSON")?;
    check_schema(report.schema_version)?;
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade ledger, one row per closed trade, lossless for re-import.
///
/// Columns: timestamp, entry_time, side, entry_price, exit_price, size, fee,
/// pnl, capital, reason, leverage
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for trade in trades {
        wtr.serialize(trade)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn import_trades_csv(content: &str) -> Result<Vec<TradeRecord>> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    rdr.deserialize::<TradeRecord>()
        .enumerate()
        .map(|(row, rec)| rec.with_context(|| format!("bad trade row {row}")))
        .collect()
}

/// Forecast bands next to the close. Undefined bands are empty cells.
///
/// Expects a series returned by `attach_forecast`.
pub fn export_forecast_csv(series: &CandleSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "close", UPPER_FORECAST, MID_FORECAST, LOWER_FORECAST])?;
    let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for bar in series.bars() {
        wtr.write_record([
            bar.timestamp.to_rfc3339(),
            bar.close.to_string(),
            cell(bar.indicator(UPPER_FORECAST)),
            cell(bar.indicator(MID_FORECAST)),
            cell(bar.indicator(LOWER_FORECAST)),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a single run under `output_dir/run_<id>/`:
/// - `manifest.json`: the full `RunRecord`
/// - `trades.csv`: trade ledger
/// - `report.md`: human-readable summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(record: &RunRecord, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("run_{}", record.run_id.short()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_artifact(&run_dir.join("manifest.json"), &export_json(record)?)?;
    write_artifact(
        &run_dir.join("trades.csv"),
        &export_trades_csv(&record.result.trade_log)?,
    )?;
    write_artifact(&run_dir.join("report.md"), &generate_report(record))?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

fn write_artifact(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_artifacts(dir: &Path) -> Result<RunRecord> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
