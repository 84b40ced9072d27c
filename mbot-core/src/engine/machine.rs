//! Position state machine: advances the engine by exactly one bar.
//!
//! Order of evaluation on each bar:
//! 1. Exit: stop-loss touch first, then the provider's take-profit rule.
//! 2. Entry: only when flat (including right after an exit on this bar).

use crate::config::{Behavior, ColumnKeys};
use crate::domain::{Bar, ExitReason, Position, PositionLeg, Side, TradeRecord};
use crate::signals::SignalProvider;
use crate::sizers::{FeeModel, Sizer};

use super::state::EngineState;

/// Read-only collaborators consulted on every step.
pub struct StepContext<'a> {
    pub provider: &'a dyn SignalProvider,
    pub sizer: &'a dyn Sizer,
    pub fees: FeeModel,
    pub behavior: Behavior,
    pub columns: &'a ColumnKeys,
    /// Stop distance beyond the swing level, as a fraction.
    pub stop_buffer: f64,
}

/// What happened on one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    pub exited: Option<ExitReason>,
    pub entered: Option<Side>,
    pub halted: bool,
}

/// Advance `state` over `curr`, with `prev` as the preceding bar.
pub fn step(prev: &Bar<'_>, curr: &Bar<'_>, state: &mut EngineState, ctx: &StepContext<'_>) -> StepOutcome {
    let mut outcome = StepOutcome {
        halted: state.halted,
        ..StepOutcome::default()
    };
    if state.halted {
        return outcome;
    }

    if let Some(position) = &state.position {
        let exit = if position.stop_touched(curr) {
            Some((position.leg().stop_price, ExitReason::StopLoss))
        } else {
            ctx.provider.exit(position, prev, curr)
        };
        if let Some((price, reason)) = exit {
            close_position(curr, price, reason, state, ctx);
            outcome.exited = Some(reason);
            if state.halted {
                outcome.halted = true;
                return outcome;
            }
        }
    }

    if state.is_flat() {
        outcome.entered = try_enter(prev, curr, state, ctx);
    }
    outcome
}

fn close_position(
    curr: &Bar<'_>,
    exit_price: f64,
    reason: ExitReason,
    state: &mut EngineState,
    ctx: &StepContext<'_>,
) {
    let Some(position) = state.position.take() else {
        return;
    };
    let side = position.side();
    let leg = position.leg();
    let fee = ctx.fees.round_trip(leg.entry_price, exit_price, leg.size);
    let pnl = position.raw_pnl(exit_price) - fee;
    state.capital = (state.capital + pnl).max(0.0);

    tracing::debug!(
        bar = curr.index,
        %side,
        entry = leg.entry_price,
        exit = exit_price,
        pnl,
        capital = state.capital,
        %reason,
        "position closed"
    );

    state.tracker.record(TradeRecord {
        timestamp: curr.timestamp,
        entry_time: leg.entry_time,
        side,
        entry_price: leg.entry_price,
        exit_price,
        size: leg.size,
        fee,
        pnl,
        capital: state.capital,
        reason,
        leverage: leg.leverage,
    });

    if state.capital == 0.0 {
        state.halted = true;
        tracing::debug!(bar = curr.index, "capital exhausted, halting");
    }
}

fn try_enter(prev: &Bar<'_>, curr: &Bar<'_>, state: &mut EngineState, ctx: &StepContext<'_>) -> Option<Side> {
    let side = ctx.provider.entry(prev, curr)?;
    if !ctx.behavior.allows(side) {
        return None;
    }

    let entry_price = curr.close;
    let stop_price = match side {
        Side::Long => prev.indicator(&ctx.columns.swing_low)? * (1.0 - ctx.stop_buffer),
        Side::Short => prev.indicator(&ctx.columns.swing_high)? * (1.0 + ctx.stop_buffer),
    };
    let adverse = match side {
        Side::Long => stop_price < entry_price,
        Side::Short => stop_price > entry_price,
    };
    if !adverse {
        tracing::trace!(bar = curr.index, %side, stop_price, entry_price, "stop on wrong side, entry skipped");
        return None;
    }

    let volatility = curr.indicator(&ctx.columns.volatility);
    let sizing = ctx.sizer.size(state.capital, entry_price, volatility)?;
    if !(sizing.size.is_finite() && sizing.size > 0.0) {
        return None;
    }

    let take_profit = ctx.provider.take_profit(side, curr);
    tracing::debug!(
        bar = curr.index,
        %side,
        entry = entry_price,
        stop = stop_price,
        ?take_profit,
        leverage = sizing.leverage,
        size = sizing.size,
        "position opened"
    );

    state.position = Some(Position::open(
        side,
        PositionLeg {
            entry_index: curr.index,
            entry_time: curr.timestamp,
            entry_price,
            size: sizing.size,
            stop_price,
            take_profit,
            leverage: sizing.leverage,
        },
    ));
    Some(side)
}
