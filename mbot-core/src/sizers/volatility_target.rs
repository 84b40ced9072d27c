//! Volatility-targeted leverage sizer.
//!
//! Leverage scales inversely with the bar's volatility so that the position's
//! expected swing stays near a target:
//!
//! ```text
//! raw      = base * target_pct / current_pct     (current_pct > 0)
//!          = base                                (otherwise)
//! leverage = round(max(1, min(raw, max)))        (ties to even)
//! size     = capital * balance_fraction * leverage / entry_price
//! ```

use super::{Sizer, Sizing};

/// Integer leverage for the current volatility reading.
///
/// An undefined, non-finite or non-positive reading falls back to `base`.
pub fn leverage(base: f64, target_pct: f64, current_pct: Option<f64>, max: f64) -> u32 {
    let raw = match current_pct {
        Some(current) if current.is_finite() && current > 0.0 => base * (target_pct / current),
        _ => base,
    };
    let bounded = raw.min(max).max(1.0);
    bounded.round_ties_even() as u32
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityTargetSizer {
    pub base_leverage: f64,
    pub target_volatility_pct: f64,
    pub max_leverage: f64,
    /// Share of capital committed as margin, in (0, 1].
    pub balance_fraction: f64,
}

impl VolatilityTargetSizer {
    pub fn new(
        base_leverage: f64,
        target_volatility_pct: f64,
        max_leverage: f64,
        balance_fraction: f64,
    ) -> Self {
        Self {
            base_leverage,
            target_volatility_pct,
            max_leverage,
            balance_fraction,
        }
    }
}

impl Sizer for VolatilityTargetSizer {
    fn size(&self, capital: f64, entry_price: f64, volatility_pct: Option<f64>) -> Option<Sizing> {
        if capital <= 0.0 || !entry_price.is_finite() || entry_price <= 0.0 {
            return None;
        }
        let leverage = leverage(
            self.base_leverage,
            self.target_volatility_pct,
            volatility_pct,
            self.max_leverage,
        );
        let size = capital * self.balance_fraction * leverage as f64 / entry_price;
        Some(Sizing { leverage, size })
    }

    fn name(&self) -> &str {
        "VolatilityTarget"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_inversely_with_volatility() {
        assert_eq!(leverage(10.0, 1.5, Some(3.0), 50.0), 5);
        assert_eq!(leverage(10.0, 1.5, Some(0.75), 50.0), 20);
    }

    #[test]
    fn clamps_to_bounds() {
        assert_eq!(leverage(10.0, 1.5, Some(0.1), 50.0), 50);
        assert_eq!(leverage(10.0, 1.5, Some(100.0), 50.0), 1);
    }

    #[test]
    fn undefined_volatility_uses_base() {
        assert_eq!(leverage(10.0, 1.5, None, 50.0), 10);
        assert_eq!(leverage(10.0, 1.5, Some(0.0), 50.0), 10);
        assert_eq!(leverage(10.0, 1.5, Some(f64::NAN), 50.0), 10);
    }

    #[test]
    fn rounds_half_to_even() {
        // 10 * 1.5 / 6 = 2.5 → 2; 10 * 1.5 / 4 = 3.75 → 4
        assert_eq!(leverage(10.0, 1.5, Some(6.0), 50.0), 2);
        assert_eq!(leverage(10.0, 1.5, Some(4.0), 50.0), 4);
        // 7 * 1.5 / 3 = 3.5 → 4
        assert_eq!(leverage(7.0, 1.5, Some(3.0), 50.0), 4);
    }

    #[test]
    fn sizes_from_capital() {
        let sizer = VolatilityTargetSizer::new(10.0, 1.5, 50.0, 0.5);
        let sizing = sizer.size(1000.0, 100.0, Some(3.0)).unwrap();
        assert_eq!(sizing.leverage, 5);
        assert!((sizing.size - 25.0).abs() < 1e-12);
    }

    #[test]
    fn no_capital_no_position() {
        let sizer = VolatilityTargetSizer::new(10.0, 1.5, 50.0, 1.0);
        assert_eq!(sizer.size(0.0, 100.0, Some(1.5)), None);
        assert_eq!(sizer.size(1000.0, 0.0, Some(1.5)), None);
    }
}
