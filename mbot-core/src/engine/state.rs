//! Mutable state that evolves bar-by-bar during a run.

use crate::domain::Position;

use super::tracker::{PerformanceTracker, WinPolicy};

/// Capital, the open position and running statistics.
///
/// # Invariants
/// - `capital >= 0`.
/// - At most one position is open.
/// - Once `halted` is set no further bars are processed.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub capital: f64,
    pub position: Option<Position>,
    pub tracker: PerformanceTracker,
    /// Set when capital reaches exactly zero.
    pub halted: bool,
}

impl EngineState {
    pub fn new(start_capital: f64, policy: WinPolicy) -> Self {
        Self {
            capital: start_capital,
            position: None,
            tracker: PerformanceTracker::new(start_capital, policy),
            halted: false,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_flat_with_capital() {
        let state = EngineState::new(1000.0, WinPolicy::TakeProfitOnly);
        assert!(state.is_flat());
        assert!(!state.halted);
        assert_eq!(state.capital, 1000.0);
        assert_eq!(state.tracker.peak(), 1000.0);
    }
}
