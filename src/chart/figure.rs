//! Renderable figure: stacked panes sharing one time axis.
//!
//! A `Figure` is plain data. It can be serialized for a browser charting
//! library or drawn to SVG/PNG with the `draws` feature.

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Oscillator;

/// A (time, value) coordinate on a pane.
pub type TimePoint = (NaiveDateTime, f64);

/// RGB color with an opacity in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    pub const fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    /// Parses `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dash {
    #[default]
    Solid,
    Dash,
    Dot,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: u32,
    pub dash: Dash,
}

impl Stroke {
    pub fn new(color: Color, width: u32, dash: Dash) -> Self {
        Self { color, width, dash }
    }

    pub fn solid(color: Color, width: u32) -> Self {
        Self::new(color, width, Dash::Solid)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSymbol {
    TriangleUp,
    TriangleDown,
    Circle,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcPoint {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub time: NaiveDateTime,
    pub value: f64,
    pub color: Color,
}

/// A data series drawn on a pane.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Trace {
    Line {
        name: String,
        points: Vec<TimePoint>,
        stroke: Stroke,
    },
    Candlestick {
        name: String,
        points: Vec<OhlcPoint>,
        rising: Color,
        falling: Color,
    },
    OhlcBars {
        name: String,
        points: Vec<OhlcPoint>,
        rising: Color,
        falling: Color,
    },
    Bars {
        name: String,
        bars: Vec<Bar>,
        opacity: f64,
    },
    Markers {
        name: String,
        points: Vec<TimePoint>,
        symbol: MarkerSymbol,
        color: Color,
        size: u32,
    },
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Self::Line { name, .. }
            | Self::Candlestick { name, .. }
            | Self::OhlcBars { name, .. }
            | Self::Bars { name, .. }
            | Self::Markers { name, .. } => name,
        }
    }

    /// Every value the trace spans vertically.
    pub(crate) fn values(&self) -> Vec<f64> {
        match self {
            Self::Line { points, .. } | Self::Markers { points, .. } => points.iter().map(|(_, v)| *v).collect(),
            Self::Candlestick { points, .. } | Self::OhlcBars { points, .. } => {
                points.iter().flat_map(|p| [p.low, p.high]).collect()
            }
            Self::Bars { bars, .. } => bars.iter().flat_map(|b| [0.0, b.value]).collect(),
        }
    }
}

/// Free geometry on a pane, in data coordinates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Segment {
        from: TimePoint,
        to: TimePoint,
        stroke: Stroke,
    },
    Rect {
        corner: TimePoint,
        opposite: TimePoint,
        stroke: Stroke,
        fill: Color,
    },
}

/// Where a label is anchored.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Fractions of the figure (or pane) area, `(0, 0)` bottom-left.
    Paper { x: f64, y: f64 },
    Data(TimePoint),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub anchor: Anchor,
    pub text: String,
    pub color: Color,
    pub size: u32,
}

/// Horizontal reference line across a whole pane, independent of the data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub value: f64,
    pub stroke: Stroke,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum PaneKind {
    Price,
    Volume,
    Oscillator(Oscillator),
    Equity,
    Drawdown,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axis {
    pub title: String,
    /// Fixed vertical range; `None` fits the data.
    pub range: Option<(f64, f64)>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    pub kind: PaneKind,
    /// Share of the figure height.
    pub height: f64,
    pub axis: Axis,
    pub traces: Vec<Trace>,
    pub shapes: Vec<Shape>,
    pub labels: Vec<Label>,
    pub guides: Vec<Guide>,
}

impl Pane {
    pub fn new(kind: PaneKind, axis_title: impl ToString) -> Self {
        Self {
            kind,
            height: 0.0,
            axis: Axis {
                title: axis_title.to_string(),
                range: None,
            },
            traces: Vec::new(),
            shapes: Vec::new(),
            labels: Vec::new(),
            guides: Vec::new(),
        }
    }

    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name() == name)
    }

    /// Vertical extent to draw: the fixed range, or the data extent padded by 10 %.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.axis.range.is_some() {
            return self.axis.range;
        }
        let shapes = self.shapes.iter().flat_map(|s| match s {
            Shape::Segment { from, to, .. } => [from.1, to.1],
            Shape::Rect { corner, opposite, .. } => [corner.1, opposite.1],
        });
        let values = self
            .traces
            .iter()
            .flat_map(Trace::values)
            .chain(shapes)
            .chain(self.guides.iter().map(|g| g.value))
            .filter(|v| v.is_finite());
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if min > max {
            return None;
        }
        let padding = ((max - min) * 0.1).max(max.abs() * 1e-3).max(1e-9);
        Some((min - padding, max + padding))
    }
}

/// Stand-in content when there is nothing to plot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    /// The request was valid but produced no candles.
    NoData,
    /// A fault stopped the render; `component` names where it happened.
    Fault { component: String, message: String },
}

/// A chart element left out of the figure because it failed to render.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Omission {
    pub element: String,
    pub reason: String,
}

/// Figure-wide colors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backdrop {
    pub background: Color,
    pub text: Color,
    pub grid: Color,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    title: String,
    panes: Vec<Pane>,
    labels: Vec<Label>,
    placeholder: Option<Placeholder>,
    time_range: Option<(NaiveDateTime, NaiveDateTime)>,
    hide_weekends: bool,
    backdrop: Backdrop,
    omissions: Vec<Omission>,
}

impl Figure {
    pub(crate) fn new(title: impl ToString, backdrop: Backdrop) -> Self {
        Self {
            title: title.to_string(),
            panes: Vec::new(),
            labels: Vec::new(),
            placeholder: None,
            time_range: None,
            hide_weekends: false,
            backdrop,
            omissions: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn pane(&self, kind: &PaneKind) -> Option<&Pane> {
        self.panes.iter().find(|p| &p.kind == kind)
    }

    pub fn price_pane(&self) -> Option<&Pane> {
        self.pane(&PaneKind::Price)
    }

    /// Figure-level labels, anchored on paper coordinates.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self.placeholder, Some(Placeholder::NoData))
    }

    pub fn is_fault(&self) -> bool {
        matches!(self.placeholder, Some(Placeholder::Fault { .. }))
    }

    /// Shared time axis extent.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.time_range
    }

    /// Whether weekend gaps should be collapsed on the time axis.
    pub fn hide_weekends(&self) -> bool {
        self.hide_weekends
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    /// Elements that failed to render and were left out.
    pub fn omissions(&self) -> &[Omission] {
        &self.omissions
    }

    pub(crate) fn set_time_range(&mut self, range: (NaiveDateTime, NaiveDateTime)) {
        self.time_range = Some(range);
    }

    pub(crate) fn set_hide_weekends(&mut self, hide: bool) {
        self.hide_weekends = hide;
    }

    pub(crate) fn set_placeholder(&mut self, placeholder: Placeholder, label: Label) {
        self.placeholder = Some(placeholder);
        self.labels.push(label);
    }

    pub(crate) fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub(crate) fn push_omission(&mut self, omission: Omission) {
        self.omissions.push(omission);
    }

    /// Stacks `panes` top to bottom. The first pane takes `lead_share` of the
    /// height when there are others; the rest split the remainder equally.
    pub(crate) fn stack(&mut self, mut panes: Vec<Pane>, lead_share: f64) {
        let others = panes.len().saturating_sub(1);
        for (i, pane) in panes.iter_mut().enumerate() {
            pane.height = match (i, others) {
                (_, 0) => 1.0,
                (0, _) => lead_share,
                _ => (1.0 - lead_share) / others as f64,
            };
        }
        self.panes = panes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let color = Color::from_hex("#3B82F6").unwrap();
        assert_eq!(color, Color::rgb(0x3B, 0x82, 0xF6));
        assert_eq!(color.to_hex(), "#3B82F6");
        assert!(Color::from_hex("3B82F6").is_none());
        assert!(Color::from_hex("#3B82").is_none());
    }

    #[test]
    fn fixed_range_wins() {
        let mut pane = Pane::new(PaneKind::Volume, "Volume");
        pane.axis.range = Some((0.0, 100.0));
        assert_eq!(pane.value_range(), Some((0.0, 100.0)));
    }

    #[test]
    fn empty_pane_has_no_range() {
        assert!(Pane::new(PaneKind::Price, "Price").value_range().is_none());
    }

    #[test]
    fn stack_splits_heights() {
        let backdrop = Backdrop {
            background: Color::rgb(0, 0, 0),
            text: Color::rgb(255, 255, 255),
            grid: Color::rgb(20, 20, 20),
        };
        let mut figure = Figure::new("t", backdrop);
        let panes = vec![
            Pane::new(PaneKind::Price, ""),
            Pane::new(PaneKind::Volume, ""),
            Pane::new(PaneKind::Equity, ""),
        ];
        figure.stack(panes, 0.6);
        let heights = figure.panes().iter().map(|p| p.height).collect::<Vec<_>>();
        assert_eq!(heights[0], 0.6);
        assert!((heights[1] - 0.2).abs() < 1e-12);
        assert!((heights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
