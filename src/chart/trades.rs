//! Backtest trades overlaid on the price pane.

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::figure::{Dash, MarkerSymbol, Shape, Stroke, TimePoint};
use super::theme::ChartTheme;
use crate::errors::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Marker of the opening fill; the closing fill points the other way.
    pub fn entry_symbol(&self) -> MarkerSymbol {
        match self {
            Self::Long => MarkerSymbol::TriangleUp,
            Self::Short => MarkerSymbol::TriangleDown,
        }
    }

    pub fn exit_symbol(&self) -> MarkerSymbol {
        match self {
            Self::Long => MarkerSymbol::TriangleDown,
            Self::Short => MarkerSymbol::TriangleUp,
        }
    }
}

/// One trade reported by the backtest engine. Read-only for the chart.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeAnnotation {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,
    pub side: TradeSide,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl TradeAnnotation {
    pub fn open(side: TradeSide, entry_time: NaiveDateTime, entry_price: f64) -> Self {
        Self {
            entry_time,
            entry_price,
            exit_time: None,
            exit_price: None,
            side,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn closed_at(mut self, exit_time: NaiveDateTime, exit_price: f64) -> Self {
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self
    }

    pub fn stop_loss(mut self, price: f64) -> Self {
        self.stop_loss = Some(price);
        self
    }

    pub fn take_profit(mut self, price: f64) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Exit fill, if the trade is closed.
    ///
    /// ### Errors
    /// `RenderFault` when only one of exit time and exit price is known.
    pub fn exit(&self) -> Result<Option<TimePoint>> {
        match (self.exit_time, self.exit_price) {
            (Some(time), Some(price)) => Ok(Some((time, price))),
            (None, None) => Ok(None),
            _ => Err(Error::render(self.describe(), "exit time and exit price must come together")),
        }
    }

    fn describe(&self) -> String {
        format!("trade@{}", self.entry_time)
    }
}

/// One sample of the backtest's equity curve.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub equity: f64,
    /// Drawdown from the running peak, in percent (`0` or negative).
    pub drawdown: f64,
}

/// Markers and rails of one trade.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TradeMarks {
    pub markers: Vec<(TimePoint, MarkerSymbol)>,
    pub rails: Vec<Shape>,
}

/// Validates `trade` and lays out its markers; open trades extend their rails to `series_end`.
pub(crate) fn trade_marks(trade: &TradeAnnotation, series_end: NaiveDateTime, theme: &ChartTheme) -> Result<TradeMarks> {
    let fault = |reason: String| Error::render(trade.describe(), reason);
    let positive = |name: &str, price: f64| {
        if price.is_finite() && price > 0.0 {
            Ok(price)
        } else {
            Err(fault(format!("{name} must be positive (got: {price})")))
        }
    };

    let entry = (trade.entry_time, positive("entry price", trade.entry_price)?);
    let exit = trade.exit()?;
    if let Some((time, price)) = exit {
        positive("exit price", price)?;
        if time < trade.entry_time {
            return Err(fault(format!("exit {time} precedes entry")));
        }
    }

    let mut markers = vec![(entry, trade.side.entry_symbol())];
    if let Some(exit) = exit {
        markers.push((exit, trade.side.exit_symbol()));
    }

    let rail_end = exit.map_or(series_end, |(time, _)| time).max(trade.entry_time);
    let mut rails = Vec::new();
    for (name, level, color) in [
        ("stop loss", trade.stop_loss, theme.danger),
        ("take profit", trade.take_profit, theme.success),
    ] {
        if let Some(level) = level {
            let level = positive(name, level)?;
            rails.push(Shape::Segment {
                from: (trade.entry_time, level),
                to: (rail_end, level),
                stroke: Stroke::new(color, 1, Dash::Dash),
            });
        }
    }

    Ok(TradeMarks { markers, rails })
}
