//! Markdown run report: summary table plus an excerpt of the trade log.

use std::fmt::Write;

use mbot_core::domain::TradeRecord;

use crate::runner::RunRecord;

/// Trades shown at each end of the log.
pub const EXCERPT: usize = 10;

pub fn generate_report(record: &RunRecord) -> String {
    let r = &record.result;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    let rows = [
        ("Run", record.run_id.short().to_string()),
        ("Strategy", r.strategy.clone()),
        ("Dataset", record.dataset_hash.0.chars().take(12).collect()),
        ("Bars processed", r.bars_processed.to_string()),
        ("Start capital", format!("{:.2}", r.start_capital)),
        ("End capital", format!("{:.2}", r.end_capital)),
        ("Total PnL", format!("{:.2} %", r.total_pnl_pct)),
        ("Trades", r.trades_count.to_string()),
        ("Win rate", format!("{:.2} %", r.win_rate)),
        ("Max drawdown", format!("{:.2} %", r.max_drawdown_pct)),
        ("Worst trade", format!("{:.2} % of start", r.worst_loss_pct())),
    ];
    for (field, value) in rows {
        let _ = writeln!(md, "| {field} | {value} |");
    }
    if r.halted {
        md.push_str("| Status | **HALTED (capital exhausted)** |\n");
    }
    md.push('\n');

    md.push_str("## Trades\n\n");
    let trades = &r.trade_log;
    if trades.is_empty() {
        md.push_str("No trades.\n");
        return md;
    }
    md.push_str("| Exit time | Side | Entry | Exit | Lev | PnL | Capital | Reason |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
    if trades.len() <= 2 * EXCERPT {
        for t in trades {
            push_trade(&mut md, t);
        }
    } else {
        for t in &trades[..EXCERPT] {
            push_trade(&mut md, t);
        }
        let _ = writeln!(
            md,
            "| … {} more … | | | | | | | |",
            trades.len() - 2 * EXCERPT
        );
        for t in &trades[trades.len() - EXCERPT..] {
            push_trade(&mut md, t);
        }
    }
    md
}

fn push_trade(md: &mut String, t: &TradeRecord) {
    let _ = writeln!(
        md,
        "| {} | {} | {:.4} | {:.4} | {}x | {:+.2} | {:.2} | {} |",
        t.timestamp.format("%Y-%m-%d %H:%M"),
        t.side,
        t.entry_price,
        t.exit_price,
        t.leverage,
        t.pnl,
        t.capital,
        t.reason
    );
}
