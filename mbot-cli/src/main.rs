//! mbot CLI: backtest, parameter search and forecast commands.
//!
//! Commands:
//! - `run`: one backtest from a TOML config; prints a summary and saves artifacts
//! - `sweep`: grid/random search from the config's `[search]` section, with an
//!   optional local refinement around the best candidate
//! - `forecast`: write the regime forecast bands for the configured data as CSV

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mbot_core::forecast::attach_forecast;
use mbot_runner::export::{export_forecast_csv, export_sweep_json, save_artifacts};
use mbot_runner::{
    load_series, run_single, BacktestConfig, Evaluator, ParamSweep, RandomSearch, RunRecord,
    SweepReport, SCHEMA_VERSION,
};

#[derive(Parser)]
#[command(name = "mbot", about = "mbot: regime forecaster and leveraged backtest engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Search parameters as described by the config's [search] section.
    Sweep {
        #[arg(long)]
        config: PathBuf,

        /// Where to write the leaderboard JSON.
        #[arg(long, default_value = "results/sweep.json")]
        output: PathBuf,

        /// Evaluate candidates on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Extra random samples drawn around the best candidate (0 disables).
        #[arg(long, default_value_t = 0)]
        refine_samples: usize,

        /// Width of the refinement space as a fraction of each range.
        #[arg(long, default_value_t = 0.2)]
        refine_width: f64,
    },
    /// Write forecast bands for the config's data to CSV.
    Forecast {
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value = "results/forecast.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mbot=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, &output_dir),
        Commands::Sweep {
            config,
            output,
            sequential,
            refine_samples,
            refine_width,
        } => sweep_cmd(&config, &output, sequential, refine_samples, refine_width),
        Commands::Forecast { config, output } => forecast_cmd(&config, &output),
    }
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn run_cmd(config_path: &Path, output_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let loaded = load_series(&config.data.path)?;
    let record = run_single(&loaded.series, &loaded.dataset_hash, &config.params)?;

    print_summary(&record);

    let run_dir = save_artifacts(&record, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn sweep_cmd(
    config_path: &Path,
    output: &Path,
    sequential: bool,
    refine_samples: usize,
    refine_width: f64,
) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(search) = config.search.clone() else {
        bail!("{} has no [search] section", config_path.display());
    };

    let mut candidates = Vec::new();
    if let Some(grid) = &search.grid {
        candidates.extend(grid.generate(&config.params)?);
    }
    if let Some(random) = &search.random {
        candidates.extend(RandomSearch::new(random.samples, random.seed).generate(&random.space, &config.params)?);
    }
    if candidates.is_empty() {
        bail!("[search] defines no grid axes or random samples");
    }

    let loaded = load_series(&config.data.path)?;
    let evaluator = Evaluator::new(
        Arc::new(loaded.series),
        loaded.dataset_hash.clone(),
        search.constraints,
    );
    let metric = evaluator.metric();
    let sweep = ParamSweep::new(evaluator).with_parallelism(search.parallel && !sequential);

    let done = AtomicUsize::new(0);
    let results = sweep.sweep_with_progress(&candidates, |_, total, _| {
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        if n == total || n % (total / 10).max(1) == 0 {
            tracing::info!(done = n, total, "evaluating candidates");
        }
    })?;
    let mut feasible = results.feasible().count();
    let mut evaluated = results.len();
    let mut board = results.leaderboard(search.top_n);

    if refine_samples > 0 {
        let best = board.entries().first().map(|e| e.params.clone());
        match (best, &search.random) {
            (Some(best), Some(random)) => {
                // Parameters outside the space keep the best candidate's values.
                let local = random.space.around(&best, refine_width);
                let refined = RandomSearch::new(refine_samples, random.seed.wrapping_add(1))
                    .generate(&local, &best)?;
                let refined_results = sweep.sweep(&refined)?;
                feasible += refined_results.feasible().count();
                evaluated += refined_results.len();
                for evaluation in refined_results.all() {
                    board.insert_evaluation(evaluation);
                }
            }
            (None, _) => tracing::warn!("no feasible candidate to refine"),
            (_, None) => tracing::warn!("refinement needs a [search.random] space"),
        }
    }

    println!(
        "{evaluated} candidates, {feasible} feasible, top {} by {}:",
        board.len(),
        metric.name()
    );
    println!(
        "{:>3}  {:>10}  {:>9}  {:>7}  {:>8}  {:>6}  run",
        "#", "score", "pnl %", "dd %", "win %", "trades"
    );
    for (i, entry) in board.entries().iter().enumerate() {
        let r = &entry.result;
        println!(
            "{:>3}  {:>10.2}  {:>9.2}  {:>7.2}  {:>8.2}  {:>6}  {}",
            i + 1,
            entry.score,
            r.total_pnl_pct,
            r.max_drawdown_pct,
            r.win_rate,
            r.trades_count,
            entry.run_id.short()
        );
    }

    let report = SweepReport {
        schema_version: SCHEMA_VERSION,
        dataset_hash: loaded.dataset_hash,
        metric,
        constraints: search.constraints,
        candidates: evaluated,
        feasible,
        leaderboard: board,
    };
    write_file(output, &export_sweep_json(&report)?)?;
    println!("Leaderboard saved to: {}", output.display());
    Ok(())
}

fn forecast_cmd(config_path: &Path, output: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let forecast = config.params.forecast.clone().unwrap_or_default();
    let loaded = load_series(&config.data.path)?;

    let (enriched, stats) = attach_forecast(&loaded.series, &forecast)?;
    write_file(output, &export_forecast_csv(&enriched)?)?;

    println!(
        "{} bars, {} regime flips, {} projected slots, {} memory buckets",
        enriched.len(),
        stats.triggers,
        stats.explicit_writes,
        stats.buckets
    );
    println!("Forecast saved to: {}", output.display());
    Ok(())
}

fn print_summary(record: &RunRecord) {
    let r = &record.result;
    println!("\n=== Backtest Summary ===");
    println!("Run:            {}", record.run_id.short());
    println!("Strategy:       {}", r.strategy);
    println!("Bars:           {}", r.bars_processed);
    println!("Start capital:  {:.2}", r.start_capital);
    println!("End capital:    {:.2}", r.end_capital);
    println!("Total PnL:      {:.2} %", r.total_pnl_pct);
    println!("Trades:         {}", r.trades_count);
    println!("Win rate:       {:.2} %", r.win_rate);
    println!("Max drawdown:   {:.2} %", r.max_drawdown_pct);
    if r.halted {
        println!("Status:         HALTED (capital exhausted)");
    }
    println!();
}
