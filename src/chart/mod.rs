//! Multi-pane chart composition.
//!
//! [`ChartComposer`] turns a [`Series`], a [`ChartRequest`] and the trade list
//! of a backtest into a [`Figure`]: a price pane, a volume pane and one pane
//! per oscillator, sharing one time axis. Overlays, drawings and trades that
//! fail to render are left out and recorded in [`Figure::omissions`].

mod composer;
mod drawing;
mod figure;
mod indicators;
mod theme;
mod trades;

use chrono::Local;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calendar::{DateRange, TimeframeSpec};
use crate::errors::{Error, Result};
use crate::market::Series;
use crate::source::{Candles, DataSource, get_candles};

pub use composer::ChartComposer;
pub use drawing::{DrawingOverlayRenderer, DrawingShape, FIBONACCI_RATIOS, Geometry, Point, fibonacci_levels};
pub use figure::{
    Anchor, Axis, Backdrop, Bar, Color, Dash, Figure, Guide, Label, MarkerSymbol, OhlcPoint, Omission, Pane,
    PaneKind, Placeholder, Shape, Stroke, TimePoint, Trace,
};
pub use indicators::{Oscillator, Overlay};
pub use theme::ChartTheme;
pub use trades::{EquityPoint, TradeAnnotation, TradeSide};

/// Primary price trace.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    /// Close prices only.
    Line,
    #[default]
    Candlestick,
    OhlcBar,
}

/// What to draw, one per render call.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub symbol: String,
    pub timeframe: String,
    /// Requested dates; `None` uses the timeframe's default lookback.
    pub range: Option<DateRange>,
    pub kind: ChartKind,
    pub overlays: Vec<Overlay>,
    pub oscillators: Vec<Oscillator>,
    pub drawings: Vec<DrawingShape>,
    /// Free text shown at the top of the figure.
    pub notice: Option<String>,
}

impl ChartRequest {
    pub fn new(symbol: impl ToString, timeframe: impl ToString) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            range: None,
            kind: ChartKind::default(),
            overlays: Vec::new(),
            oscillators: Vec::new(),
            drawings: Vec::new(),
            notice: None,
        }
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn kind(mut self, kind: ChartKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn overlay(mut self, overlay: Overlay) -> Self {
        self.overlays.push(overlay);
        self
    }

    pub fn oscillator(mut self, oscillator: Oscillator) -> Self {
        self.oscillators.push(oscillator);
        self
    }

    pub fn drawing(mut self, drawing: DrawingShape) -> Self {
        self.drawings.push(drawing);
        self
    }

    pub fn notice(mut self, notice: impl ToString) -> Self {
        self.notice = Some(notice.to_string());
        self
    }

    /// Checks the request and resolves its timeframe.
    ///
    /// ### Errors
    /// `InvalidRequest` for a blank symbol, `UnknownTimeframe` for an unsupported token.
    pub fn validate(&self) -> Result<&'static TimeframeSpec> {
        if self.symbol.trim().is_empty() {
            return Err(Error::InvalidRequest("symbol is empty".to_string()));
        }
        TimeframeSpec::lookup(&self.timeframe)
    }

    /// Figure title, `"{symbol} - {timeframe}"`.
    pub fn title(&self) -> String {
        format!("{} - {}", self.symbol, self.timeframe)
    }

    /// Loads the candles this request asks for.
    ///
    /// Without an explicit range the timeframe's default lookback ending today is used.
    pub fn load(&self, source: DataSource<'_>) -> Result<Candles> {
        let spec = self.validate()?;
        let range = self
            .range
            .unwrap_or_else(|| spec.default_range(Local::now().date_naive()));
        get_candles(&self.symbol, spec.token, range, source)
    }
}

/// Composes `candles` with the default dark theme.
pub fn render_chart(candles: &Series, request: &ChartRequest, trades: &[TradeAnnotation]) -> Figure {
    ChartComposer::default().compose(candles, request, trades)
}
