//! Position Sizers: leverage and contract quantity for a new position.
//!
//! Sizers are capital-aware but signal-agnostic: they never decide whether to
//! trade, only how large the position is once a signal fires.

pub mod fee;
pub mod volatility_target;

pub use fee::FeeModel;
pub use volatility_target::{leverage, VolatilityTargetSizer};

/// Leverage and quantity chosen for one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    pub leverage: u32,
    /// Contracts to hold.
    pub size: f64,
}

/// Position sizing logic.
pub trait Sizer: Send + Sync {
    /// Size a position opened at `entry_price` with `capital` available.
    ///
    /// `volatility_pct` is the bar's volatility reading, `None` when undefined.
    /// Returns `None` when no position can be opened (no capital, bad price).
    fn size(&self, capital: f64, entry_price: f64, volatility_pct: Option<f64>) -> Option<Sizing>;

    /// Sizer name for logging.
    fn name(&self) -> &str;
}
