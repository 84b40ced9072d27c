//! Domain types for the mbot engine.

pub mod candle;
pub mod columns;
pub mod position;
pub mod regime;
pub mod series;
pub mod trade;

pub use candle::Candle;
pub use columns::IndicatorColumns;
pub use position::{Position, PositionLeg, Side};
pub use regime::{RegimeLabel, RegimeSource};
pub use series::{Bar, CandleSeries, SeriesError};
pub use trade::{ExitReason, TradeRecord};
