//! Market data types.
//!
//! - `Candle`: one OHLCV observation, validated by `CandleBuilder`.
//! - `Series`: strictly time-ordered candles, shared and immutable.
//! - `AssetClass`: market segment and the per-symbol reference tables.

mod asset;
mod candle;
mod series;

pub use asset::*;
pub use candle::*;
pub use series::*;
