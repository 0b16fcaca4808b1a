//! User drawings on the price pane.

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::figure::{Anchor, Dash, Label, Shape, Stroke};
use super::theme::ChartTheme;
use crate::errors::{Error, Result};

/// Retracement fractions of a Fibonacci drawing, in drawing order.
pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// An anchor in chart coordinates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub time: NaiveDateTime,
    pub price: f64,
}

impl Point {
    pub fn new(time: NaiveDateTime, price: f64) -> Self {
        Self { time, price }
    }
}

/// A user-authored drawing, one variant per tool.
///
/// With the `serde` feature, an entry that does not parse as any tool (a missing
/// anchor, an unknown `type`) deserializes to [`DrawingShape::Malformed`] instead of
/// failing the whole request. The renderer reports it as a fault for that shape only.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawingShape {
    Trendline { p0: Point, p1: Point },
    Horizontal { y: f64 },
    Rectangle { p0: Point, p1: Point },
    Fibonacci { p0: Point, p1: Point },
    /// An entry that could not be read as a drawing. `kind` is its `type` tag when present.
    Malformed { kind: String, reason: String },
}

impl DrawingShape {
    pub fn name(&self) -> &str {
        match self {
            Self::Trendline { .. } => "trendline",
            Self::Horizontal { .. } => "horizontal",
            Self::Rectangle { .. } => "rectangle",
            Self::Fibonacci { .. } => "fibonacci",
            Self::Malformed { kind, .. } => kind,
        }
    }
}

/// Strict wire form of [`DrawingShape`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Tool {
    Trendline { p0: Point, p1: Point },
    Horizontal { y: f64 },
    Rectangle { p0: Point, p1: Point },
    Fibonacci { p0: Point, p1: Point },
    Malformed { kind: String, reason: String },
}

#[cfg(feature = "serde")]
impl From<Tool> for DrawingShape {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Trendline { p0, p1 } => Self::Trendline { p0, p1 },
            Tool::Horizontal { y } => Self::Horizontal { y },
            Tool::Rectangle { p0, p1 } => Self::Rectangle { p0, p1 },
            Tool::Fibonacci { p0, p1 } => Self::Fibonacci { p0, p1 },
            Tool::Malformed { kind, reason } => Self::Malformed { kind, reason },
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for DrawingShape {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or("drawing").to_string();
        Ok(match serde_json::from_value::<Tool>(value) {
            Ok(tool) => tool.into(),
            Err(e) => Self::Malformed {
                kind,
                reason: e.to_string(),
            },
        })
    }
}

/// The seven Fibonacci levels between `y0` and `y1`, keeping the direction of the move.
pub fn fibonacci_levels(y0: f64, y1: f64) -> [f64; 7] {
    FIBONACCI_RATIOS.map(|fraction| y0 + (y1 - y0) * fraction)
}

/// Geometry produced for one drawing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub shapes: Vec<Shape>,
    pub labels: Vec<Label>,
}

/// Turns [`DrawingShape`]s into pane geometry.
pub struct DrawingOverlayRenderer<'t> {
    theme: &'t ChartTheme,
}

impl<'t> DrawingOverlayRenderer<'t> {
    pub fn new(theme: &'t ChartTheme) -> Self {
        Self { theme }
    }

    /// Renders `shape`. `visible` is the time span of the price pane, used by full-width lines.
    ///
    /// ### Errors
    /// `RenderFault` when the shape is malformed, an anchor price is not finite or a
    /// two-anchor shape is degenerate.
    pub fn render(&self, shape: &DrawingShape, visible: (NaiveDateTime, NaiveDateTime)) -> Result<Geometry> {
        let color = self.theme.warning;
        match *shape {
            DrawingShape::Malformed { ref kind, ref reason } => Err(Error::render(kind, reason)),
            DrawingShape::Trendline { p0, p1 } => {
                check_pair(shape, p0, p1)?;
                Ok(Geometry {
                    shapes: vec![Shape::Segment {
                        from: (p0.time, p0.price),
                        to: (p1.time, p1.price),
                        stroke: Stroke::solid(color, 2),
                    }],
                    labels: Vec::new(),
                })
            }
            DrawingShape::Horizontal { y } => {
                check_price(shape, y)?;
                let (start, end) = visible;
                Ok(Geometry {
                    shapes: vec![Shape::Segment {
                        from: (start, y),
                        to: (end, y),
                        stroke: Stroke::new(color, 2, Dash::Dash),
                    }],
                    labels: Vec::new(),
                })
            }
            DrawingShape::Rectangle { p0, p1 } => {
                check_pair(shape, p0, p1)?;
                Ok(Geometry {
                    shapes: vec![Shape::Rect {
                        corner: (p0.time, p0.price),
                        opposite: (p1.time, p1.price),
                        stroke: Stroke::solid(color, 2),
                        fill: color.with_alpha(0.2),
                    }],
                    labels: Vec::new(),
                })
            }
            DrawingShape::Fibonacci { p0, p1 } => {
                check_pair(shape, p0, p1)?;
                let (left, right) = if p0.time <= p1.time { (p0.time, p1.time) } else { (p1.time, p0.time) };
                let levels = fibonacci_levels(p0.price, p1.price);
                let shapes = levels
                    .iter()
                    .map(|y| Shape::Segment {
                        from: (left, *y),
                        to: (right, *y),
                        stroke: Stroke::new(color, 1, Dash::Dot),
                    })
                    .collect();
                let labels = levels
                    .iter()
                    .zip(FIBONACCI_RATIOS)
                    .map(|(y, fraction)| Label {
                        anchor: Anchor::Data((right, *y)),
                        text: format!("{fraction:.3}"),
                        color,
                        size: 10,
                    })
                    .collect();
                Ok(Geometry { shapes, labels })
            }
        }
    }
}

fn check_price(shape: &DrawingShape, price: f64) -> Result<()> {
    if price.is_finite() {
        Ok(())
    } else {
        Err(Error::render(shape.name(), format!("anchor price is not finite ({price})")))
    }
}

fn check_pair(shape: &DrawingShape, p0: Point, p1: Point) -> Result<()> {
    check_price(shape, p0.price)?;
    check_price(shape, p1.price)?;
    if p0 == p1 {
        return Err(Error::render(shape.name(), "both anchors are the same point"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn visible() -> (NaiveDateTime, NaiveDateTime) {
        (t(2), t(31))
    }

    #[test]
    fn fibonacci_levels_upward() {
        let levels = fibonacci_levels(100.0, 200.0);
        let expected = [100.0, 123.6, 138.2, 150.0, 161.8, 178.6, 200.0];
        for (level, want) in levels.iter().zip(expected) {
            assert!((level - want).abs() < 1e-9, "{level} != {want}");
        }
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn fibonacci_levels_downward_keep_direction() {
        let levels = fibonacci_levels(200.0, 100.0);
        assert_eq!(levels[0], 200.0);
        assert!((levels[1] - 176.4).abs() < 1e-9);
        assert_eq!(levels[6], 100.0);
    }

    #[test]
    fn fibonacci_draws_seven_labeled_segments_in_span() {
        let theme = ChartTheme::default();
        let shape = DrawingShape::Fibonacci {
            p0: Point::new(t(20), 100.0),
            p1: Point::new(t(10), 200.0),
        };
        let geometry = DrawingOverlayRenderer::new(&theme).render(&shape, visible()).unwrap();
        assert_eq!(geometry.shapes.len(), 7);
        assert_eq!(geometry.labels.len(), 7);
        assert_eq!(geometry.labels[1].text, "0.236");
        for s in &geometry.shapes {
            let Shape::Segment { from, to, .. } = s else {
                panic!("expected a segment");
            };
            assert_eq!((from.0, to.0), (t(10), t(20)));
        }
    }

    #[test]
    fn horizontal_spans_visible_axis() {
        let theme = ChartTheme::default();
        let geometry = DrawingOverlayRenderer::new(&theme)
            .render(&DrawingShape::Horizontal { y: 150.0 }, visible())
            .unwrap();
        assert_eq!(
            geometry.shapes,
            vec![Shape::Segment {
                from: (t(2), 150.0),
                to: (t(31), 150.0),
                stroke: Stroke::new(theme.warning, 2, Dash::Dash),
            }]
        );
    }

    #[test]
    fn rectangle_is_translucent() {
        let theme = ChartTheme::default();
        let shape = DrawingShape::Rectangle {
            p0: Point::new(t(3), 10.0),
            p1: Point::new(t(3) + Duration::days(4), 12.0),
        };
        let geometry = DrawingOverlayRenderer::new(&theme).render(&shape, visible()).unwrap();
        let Shape::Rect { fill, .. } = geometry.shapes[0] else {
            panic!("expected a rectangle");
        };
        assert!(fill.alpha < 0.5);
    }

    #[test]
    fn malformed_shapes_fail() {
        let theme = ChartTheme::default();
        let renderer = DrawingOverlayRenderer::new(&theme);
        let nan = DrawingShape::Trendline {
            p0: Point::new(t(3), f64::NAN),
            p1: Point::new(t(4), 1.0),
        };
        assert!(matches!(renderer.render(&nan, visible()), Err(Error::RenderFault { .. })));
        let degenerate = DrawingShape::Rectangle {
            p0: Point::new(t(3), 1.0),
            p1: Point::new(t(3), 1.0),
        };
        assert!(renderer.render(&degenerate, visible()).is_err());
        assert!(renderer.render(&DrawingShape::Horizontal { y: f64::INFINITY }, visible()).is_err());
        let unread = DrawingShape::Malformed {
            kind: "trendline".to_string(),
            reason: "missing field `p1`".to_string(),
        };
        assert!(matches!(
            renderer.render(&unread, visible()),
            Err(Error::RenderFault { element, .. }) if element == "trendline"
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn unreadable_entries_deserialize_as_malformed() {
        let json = r#"[
            {"type": "trendline", "p0": {"time": "2023-01-03T00:00:00", "price": 100.0}},
            {"type": "horizontal", "y": 150.0},
            {"type": "spiral"},
            42
        ]"#;
        let shapes: Vec<DrawingShape> = serde_json::from_str(json).unwrap();
        assert!(matches!(&shapes[0], DrawingShape::Malformed { kind, reason } if kind == "trendline" && reason.contains("p1")));
        assert_eq!(shapes[1], DrawingShape::Horizontal { y: 150.0 });
        assert_eq!(shapes[2].name(), "spiral");
        assert_eq!(shapes[3].name(), "drawing");

        let round_trip: DrawingShape = serde_json::from_str(&serde_json::to_string(&shapes[0]).unwrap()).unwrap();
        assert_eq!(round_trip, shapes[0]);
    }
}
