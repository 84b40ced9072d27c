//! Leaderboard: bounded, deduplicated, sorted by score.
//!
//! Deduplication key: `run_id` (parameters + dataset). Ties in score are
//! broken by run id so the ordering never depends on evaluation order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use mbot_core::config::EngineParams;
use mbot_core::engine::RunResult;
use mbot_core::fingerprint::RunId;

use crate::runner::{Evaluation, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub run_id: RunId,
    pub score: f64,
    pub params: EngineParams,
    pub result: RunResult,
}

/// Outcome of an insert operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    /// Replaced an entry with the same run id (better score).
    Replaced,
    /// Duplicate with worse or equal score, non-finite score, or below the cut.
    Skipped,
}

/// Top-N feasible candidates, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    max_size: usize,
    entries: Vec<LeaderboardEntry>,
}

fn rank(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.run_id.cmp(&b.run_id))
}

impl Leaderboard {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            entries: Vec::with_capacity(max_size.min(1024)),
        }
    }

    pub fn insert(&mut self, entry: LeaderboardEntry) -> InsertResult {
        if !entry.score.is_finite() || self.max_size == 0 {
            return InsertResult::Skipped;
        }

        if let Some(idx) = self.entries.iter().position(|e| e.run_id == entry.run_id) {
            if entry.score > self.entries[idx].score {
                self.entries[idx] = entry;
                self.entries.sort_by(rank);
                return InsertResult::Replaced;
            }
            return InsertResult::Skipped;
        }

        if self.entries.len() == self.max_size {
            match self.entries.last() {
                Some(worst) if rank(&entry, worst) == Ordering::Less => {
                    self.entries.pop();
                }
                _ => return InsertResult::Skipped,
            }
        }
        self.entries.push(entry);
        self.entries.sort_by(rank);
        InsertResult::Inserted
    }

    /// Insert a feasible evaluation; infeasible ones are skipped.
    pub fn insert_evaluation(&mut self, evaluation: &Evaluation) -> InsertResult {
        match &evaluation.verdict {
            Verdict::Feasible { score, result } => self.insert(LeaderboardEntry {
                run_id: evaluation.run_id.clone(),
                score: *score,
                params: evaluation.params.clone(),
                result: result.clone(),
            }),
            Verdict::Infeasible { .. } => InsertResult::Skipped,
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbot_core::engine::WinPolicy;

    fn entry(id: &str, score: f64) -> LeaderboardEntry {
        LeaderboardEntry {
            run_id: RunId(id.to_string()),
            score,
            params: EngineParams::default(),
            result: RunResult {
                strategy: "stoch_rsi".into(),
                start_capital: 1000.0,
                end_capital: 1000.0,
                total_pnl_pct: score,
                trades_count: 0,
                win_rate: 0.0,
                max_drawdown_pct: 0.0,
                win_policy: WinPolicy::TakeProfitOnly,
                bars_processed: 0,
                halted: false,
                trade_log: vec![],
            },
        }
    }

    fn ids(board: &Leaderboard) -> Vec<&str> {
        board.entries().iter().map(|e| e.run_id.0.as_str()).collect()
    }

    #[test]
    fn keeps_best_n_sorted() {
        let mut board = Leaderboard::new(3);
        for (id, score) in [("a", 1.0), ("b", 5.0), ("c", 3.0), ("d", 4.0), ("e", 0.5)] {
            board.insert(entry(id, score));
        }
        assert_eq!(ids(&board), vec!["b", "d", "c"]);
    }

    #[test]
    fn below_the_cut_is_skipped() {
        let mut board = Leaderboard::new(1);
        assert_eq!(board.insert(entry("a", 2.0)), InsertResult::Inserted);
        assert_eq!(board.insert(entry("b", 1.0)), InsertResult::Skipped);
        assert_eq!(board.insert(entry("c", 3.0)), InsertResult::Inserted);
        assert_eq!(ids(&board), vec!["c"]);
    }

    #[test]
    fn duplicates_replace_only_when_better() {
        let mut board = Leaderboard::new(5);
        board.insert(entry("a", 1.0));
        assert_eq!(board.insert(entry("a", 0.5)), InsertResult::Skipped);
        assert_eq!(board.insert(entry("a", 2.0)), InsertResult::Replaced);
        assert_eq!(board.len(), 1);
        assert_eq!(board.entries()[0].score, 2.0);
    }

    #[test]
    fn ties_break_by_run_id() {
        let mut forward = Leaderboard::new(2);
        let mut backward = Leaderboard::new(2);
        for id in ["x", "m", "c"] {
            forward.insert(entry(id, 1.0));
        }
        for id in ["c", "m", "x"] {
            backward.insert(entry(id, 1.0));
        }
        assert_eq!(ids(&forward), vec!["c", "m"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn non_finite_and_zero_capacity() {
        let mut board = Leaderboard::new(2);
        assert_eq!(board.insert(entry("a", f64::NAN)), InsertResult::Skipped);
        assert!(board.is_empty());
        let mut none = Leaderboard::new(0);
        assert_eq!(none.insert(entry("a", 1.0)), InsertResult::Skipped);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bounded_sorted_and_order_independent(
                cap in 1usize..6,
                items in prop::collection::vec((0u8..12, -100.0f64..100.0), 0..40),
            ) {
                let mut board = Leaderboard::new(cap);
                for (id, score) in &items {
                    board.insert(entry(&format!("r{id}"), *score));
                }
                prop_assert!(board.len() <= cap);
                for pair in board.entries().windows(2) {
                    prop_assert!(rank(&pair[0], &pair[1]) != Ordering::Greater);
                }

                let mut reversed = Leaderboard::new(cap);
                for (id, score) in items.iter().rev() {
                    reversed.insert(entry(&format!("r{id}"), *score));
                }
                prop_assert_eq!(ids(&board), ids(&reversed));
            }
        }
    }
}
