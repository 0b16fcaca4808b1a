//! # tradechart: Synthetic Market Data and Trading Charts
//!
//! **tradechart** is the chart core of a trading dashboard. It builds trading-calendar aware
//! candle series, either synthesized deterministically or fetched from a market-data provider,
//! and composes them with indicators, backtest trades and user drawings into multi-pane figures.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`TimeframeSpec`** | Table of timeframe tokens ("1m".."1mo") with their sampling rule and lookback bounds.  |
//! | **`PricePathSynthesizer`** | Seeded random-walk OHLCV generator, bit-identical per symbol and timestamps.      |
//! | **`get_candles`** | Boundary function returning a series or an explicit `NoData`.                            |
//! | **`ChartComposer`** | Stacks price, volume and oscillator panes into a `Figure`.                               |
//! | **`DrawingOverlayRenderer`** | Turns trendlines, rays, rectangles and Fibonacci retracements into geometry.    |
//! | **`Draw`** | Renders a `Figure` to SVG or PNG.                                                                 |
//!
//! ## Timeframes
//! | Token | Sampling | Lookback |
//! |-------|----------|----------|
//! | `1m` `2m` `3m` `5m` `15m` `30m` `1h` | session grid from 09:30 to 16:00, weekdays | at most 7 to 30 days |
//! | `4h` | 09:30 and 13:30, weekdays | at most 60 days |
//! | `1d` | business days | unbounded |
//! | `1w` | Fridays | at least 365 days |
//! | `1mo` | last business day of the month | at least 730 days |
//!
//! ## Getting Started
//! ```rust
//! use tradechart::prelude::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
//! let end = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
//! let range = DateRange::new(start, end).unwrap();
//!
//! let candles = get_candles("AAPL", "1d", range, DataSource::Synthetic).unwrap();
//! let series = candles.series().cloned().unwrap_or_default();
//!
//! let request = ChartRequest::new("AAPL", "1d")
//!     .overlay(Overlay::Sma(20))
//!     .oscillator(Oscillator::Rsi(14));
//! let figure = render_chart(&series, &request, &[]);
//!
//! assert_eq!(figure.panes().len(), 3);
//! assert!(figure.omissions().is_empty());
//! ```
//!
//! ## Degraded Output
//! Composition never fails. An empty series yields a figure with a
//! [`Placeholder::NoData`](chart::Placeholder::NoData) annotation, a bad request
//! a [`Placeholder::Fault`](chart::Placeholder::Fault) naming the failing component,
//! and an overlay, oscillator, drawing or trade that cannot be rendered is left out
//! and listed in [`Figure::omissions`](chart::Figure::omissions).
//!
//! ## Integrations
//! | Crate          | Purpose                                                                                     |
//! |----------------|---------------------------------------------------------------------------------------------|
//! | [`ta`](https://crates.io/crates/ta) | Moving averages, Bollinger bands, RSI, stochastic and MACD.                |
//! | [`rayon`](https://crates.io/crates/rayon) | Parallel batch rendering (`parallel` feature).                       |
//! | [`serde`](https://crates.io/crates/serde) | Serialize figures, requests and themes (`serde` feature).            |
//! | [`plotters`](https://crates.io/crates/plotters) | SVG and PNG output (`draws` feature, default).                 |
//! | [`tracing`](https://crates.io/crates/tracing) | Structured logs of fetch fallbacks and omitted elements.         |
//!
//! ## License
//! MIT

/// Trading calendar: timeframe table and session timestamps.
pub mod calendar;

/// Chart composition: figures, panes, indicators, drawings and trades.
pub mod chart;

/// Error types for the library.
pub mod errors;

/// Candles, series and asset classes.
pub mod market;

/// Candle sources: synthetic generator, external fetchers, cache.
pub mod source;

/// Deterministic synthetic price paths.
pub mod synth;

/// Utility functions and helpers.
pub mod utils;

/// Draw figures with plotters backends: png, svg.
#[cfg(feature = "draws")]
pub mod draws;

/// Parallel batch composition.
#[cfg(feature = "parallel")]
pub mod batch;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::calendar::*;
    pub use crate::chart::*;
    pub use crate::errors::*;
    pub use crate::market::*;
    pub use crate::source::*;
    pub use crate::synth::*;

    #[cfg(feature = "draws")]
    pub use crate::draws::*;

    #[cfg(feature = "parallel")]
    pub use crate::batch::*;
}
