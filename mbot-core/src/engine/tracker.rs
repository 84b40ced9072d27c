//! Performance tracker: capital high-water mark, drawdown and the ledger.

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

/// Which closed trades count as wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinPolicy {
    /// Only strategy take-profit exits are wins, whatever their PnL.
    #[default]
    TakeProfitOnly,
    /// Any trade with a positive fee-adjusted PnL is a win.
    PositivePnl,
}

impl WinPolicy {
    pub fn is_win(self, trade: &TradeRecord) -> bool {
        match self {
            Self::TakeProfitOnly => trade.is_take_profit(),
            Self::PositivePnl => trade.is_profitable(),
        }
    }
}

/// Running statistics updated once per closed trade.
///
/// # Invariants
/// - `peak` never decreases.
/// - `max_drawdown` is a fraction in [0, 1] and never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceTracker {
    peak: f64,
    max_drawdown: f64,
    wins: usize,
    policy: WinPolicy,
    ledger: Vec<TradeRecord>,
}

impl PerformanceTracker {
    pub fn new(start_capital: f64, policy: WinPolicy) -> Self {
        Self {
            peak: start_capital,
            max_drawdown: 0.0,
            wins: 0,
            policy,
            ledger: Vec::new(),
        }
    }

    /// Append a closed trade and fold its post-trade capital into the drawdown.
    pub fn record(&mut self, trade: TradeRecord) {
        if self.policy.is_win(&trade) {
            self.wins += 1;
        }
        let capital = trade.capital;
        self.peak = self.peak.max(capital);
        let drawdown = if self.peak > 0.0 {
            (self.peak - capital) / self.peak
        } else {
            0.0
        };
        self.max_drawdown = self.max_drawdown.max(drawdown);
        self.ledger.push(trade);
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn trades(&self) -> usize {
        self.ledger.len()
    }

    pub fn wins(&self) -> usize {
        self.wins
    }

    /// Wins as a percentage of trades; 0 with no trades.
    pub fn win_rate_pct(&self) -> f64 {
        if self.ledger.is_empty() {
            0.0
        } else {
            self.wins as f64 / self.ledger.len() as f64 * 100.0
        }
    }

    pub fn policy(&self) -> WinPolicy {
        self.policy
    }

    pub fn ledger(&self) -> &[TradeRecord] {
        &self.ledger
    }

    pub fn into_ledger(self) -> Vec<TradeRecord> {
        self.ledger
    }
}
