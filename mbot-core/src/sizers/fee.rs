//! Taker fee model.

/// Proportional fee charged on notional at both entry and exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeModel {
    pub rate: f64,
}

impl FeeModel {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Fee on a single fill.
    pub fn on_notional(&self, notional: f64) -> f64 {
        notional * self.rate
    }

    /// Fee for opening and closing `size` contracts.
    pub fn round_trip(&self, entry_price: f64, exit_price: f64, size: f64) -> f64 {
        self.on_notional(entry_price * size) + self.on_notional(exit_price * size)
    }
}
