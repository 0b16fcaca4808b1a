//! Draws a [`Figure`] to SVG or PNG with plotters.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime};
use plotters::backend::{BitMapBackend, DrawingBackend, SVGBackend};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::info;

use crate::chart::{Anchor, Color as ChartColor, Dash, Figure, Label, MarkerSymbol, Pane, Shape, Stroke, Trace};
use crate::errors::{Error, Result};

/// Size of the X-axis labels.
const X_LABEL_SIZE: u32 = 30;
/// Size of the Y-axis labels.
const Y_LABEL_SIZE: u32 = 70;
const TITLE_SIZE: u32 = 24;
const FONT: &str = "sans-serif";

/// Output formats for the generated charts with output filename.
pub enum DrawOutput {
    Svg(PathBuf),
    Png(PathBuf),
}

impl Default for DrawOutput {
    fn default() -> Self {
        Self::Svg(PathBuf::from("chart.svg"))
    }
}

/// Configuration options for chart generation.
pub struct DrawOptions {
    /// Replaces the figure title.
    title: Option<String>,
    output: DrawOutput,
    width: u32,
    height: u32,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            title: None,
            output: DrawOutput::default(),
            width: 1280,
            height: 720,
        }
    }
}

impl DrawOptions {
    pub fn title(mut self, title: impl ToString) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn draw_output(mut self, output: DrawOutput) -> Self {
        self.output = output;
        self
    }

    /// Image size in pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Chart drawing utility for composed figures.
pub struct Draw<'d> {
    figure: &'d Figure,
    options: DrawOptions,
}

impl<'d> Draw<'d> {
    pub fn with_figure(figure: &'d Figure) -> Self {
        Self {
            figure,
            options: DrawOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DrawOptions) -> Self {
        self.options = options;
        self
    }

    /// Generates and saves the chart based on the configured options.
    pub fn plot(&self) -> Result<()> {
        let size = (self.options.width, self.options.height);
        match &self.options.output {
            DrawOutput::Svg(path) => {
                let root = SVGBackend::new(path, size).into_drawing_area();
                self.draw_figure(&root)?;
                info!(path = %path.display(), "svg chart written");
            }
            DrawOutput::Png(path) => {
                let root = BitMapBackend::new(path, size).into_drawing_area();
                self.draw_figure(&root)?;
                info!(path = %path.display(), "png chart written");
            }
        }
        Ok(())
    }

    fn draw_figure<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let backdrop = self.figure.backdrop();
        root.fill(&rgba(backdrop.background)).map_err(plotters_error)?;

        let title = self.options.title.as_deref().unwrap_or(self.figure.title());
        let body = root
            .titled(title, (FONT, TITLE_SIZE).into_font().color(&rgba(backdrop.text)))
            .map_err(plotters_error)?;

        if let Some(time_range) = self.figure.time_range() {
            let axis = TimeAxis::new(self.figure.hide_weekends());
            let x_range = axis.padded_range(time_range);
            let panes = self.figure.panes();
            let total = body.dim_in_pixel().1 as f64;
            let mut rest = body.clone();
            for (i, pane) in panes.iter().enumerate() {
                let last = i + 1 == panes.len();
                let area = if last {
                    rest.clone()
                } else {
                    let (top, bottom) = rest.split_vertically((total * pane.height) as u32);
                    rest = bottom;
                    top
                };
                self.draw_pane(&area, pane, axis, x_range.clone(), last)?;
            }
        }

        let (width, height) = root.dim_in_pixel();
        for label in self.figure.labels() {
            if let Anchor::Paper { x, y } = label.anchor {
                let at = ((x * width as f64) as i32, ((1.0 - y) * height as f64) as i32);
                root.draw(&Text::new(label.text.clone(), at, label_style(label)))
                    .map_err(plotters_error)?;
            }
        }

        root.present().map_err(plotters_error)
    }

    fn draw_pane<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        pane: &Pane,
        axis: TimeAxis,
        x_range: std::ops::Range<f64>,
        with_time_axis: bool,
    ) -> Result<()> {
        let backdrop = self.figure.backdrop();
        let (y0, y1) = pane.value_range().unwrap_or((0.0, 1.0));
        let (x0, x1) = (x_range.start, x_range.end);

        let mut chart = ChartBuilder::on(area)
            .margin_left(10)
            .margin_right(20)
            .margin_top(5)
            .x_label_area_size(if with_time_axis { X_LABEL_SIZE } else { 0 })
            .y_label_area_size(Y_LABEL_SIZE)
            .build_cartesian_2d(x_range, y0..y1)
            .map_err(plotters_error)?;

        let date_format = if self.figure.hide_weekends() { "%Y-%m-%d" } else { "%m-%d %H:%M" };
        let format_time = |x: &f64| axis.time(*x).map(|t| t.format(date_format).to_string()).unwrap_or_default();
        let text = rgba(backdrop.text);
        {
            let mut mesh = chart.configure_mesh();
            mesh.y_desc(pane.axis.title.as_str())
                .bold_line_style(rgba(backdrop.grid))
                .light_line_style(TRANSPARENT)
                .axis_style(rgba(backdrop.grid))
                .label_style((FONT, 12).into_font().color(&text))
                .axis_desc_style((FONT, 14).into_font().color(&text))
                .y_labels(5);
            if with_time_axis {
                mesh.x_labels(8).x_label_formatter(&format_time);
            } else {
                mesh.disable_x_axis();
            }
            mesh.draw().map_err(plotters_error)?;
        }

        for guide in &pane.guides {
            let points = [(x0, guide.value), (x1, guide.value)];
            draw_line(&mut chart, points, &guide.stroke)?;
        }

        let slots = pane
            .traces
            .iter()
            .map(|t| match t {
                Trace::Candlestick { points, .. } | Trace::OhlcBars { points, .. } => points.len(),
                Trace::Bars { bars, .. } => bars.len(),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
            .max(1);
        let slot = (x1 - x0) / slots as f64;
        let candle_px = ((area.dim_in_pixel().0.saturating_sub(Y_LABEL_SIZE) as f64 / slots as f64) * 0.6).max(1.0) as u32;

        for trace in &pane.traces {
            match trace {
                Trace::Line { points, stroke, .. } => {
                    draw_line(&mut chart, points.iter().map(|(t, v)| (axis.x(*t), *v)), stroke)?;
                }
                Trace::Candlestick {
                    points, rising, falling, ..
                } => {
                    chart
                        .draw_series(points.iter().map(|p| {
                            CandleStick::new(
                                axis.x(p.time),
                                p.open,
                                p.high,
                                p.low,
                                p.close,
                                rgba(*rising).filled(),
                                rgba(*falling).filled(),
                                candle_px,
                            )
                        }))
                        .map_err(plotters_error)?;
                }
                Trace::OhlcBars {
                    points, rising, falling, ..
                } => {
                    let tick = slot * 0.3;
                    chart
                        .draw_series(points.iter().flat_map(|p| {
                            let x = axis.x(p.time);
                            let color = rgba(if p.close >= p.open { *rising } else { *falling });
                            [
                                PathElement::new(vec![(x, p.low), (x, p.high)], color),
                                PathElement::new(vec![(x - tick, p.open), (x, p.open)], color),
                                PathElement::new(vec![(x, p.close), (x + tick, p.close)], color),
                            ]
                        }))
                        .map_err(plotters_error)?;
                }
                Trace::Bars { bars, opacity, .. } => {
                    let half = slot * 0.4;
                    chart
                        .draw_series(bars.iter().map(|b| {
                            let x = axis.x(b.time);
                            let color = rgba(b.color.with_alpha(*opacity));
                            Rectangle::new([(x - half, 0.0), (x + half, b.value)], color.filled())
                        }))
                        .map_err(plotters_error)?;
                }
                Trace::Markers {
                    points,
                    symbol,
                    color,
                    size,
                    ..
                } => {
                    let style = rgba(*color).filled();
                    let s = (*size / 2).max(2) as i32;
                    let outline = match symbol {
                        MarkerSymbol::TriangleUp => vec![(-s, s), (s, s), (0, -s)],
                        MarkerSymbol::TriangleDown => vec![(-s, -s), (s, -s), (0, s)],
                        MarkerSymbol::Circle => Vec::new(),
                    };
                    if outline.is_empty() {
                        chart
                            .draw_series(points.iter().map(|(t, v)| Circle::new((axis.x(*t), *v), s, style)))
                            .map_err(plotters_error)?;
                    } else {
                        chart
                            .draw_series(points.iter().map(|(t, v)| {
                                EmptyElement::at((axis.x(*t), *v)) + Polygon::new(outline.clone(), style)
                            }))
                            .map_err(plotters_error)?;
                    }
                }
            }
        }

        for shape in &pane.shapes {
            match shape {
                Shape::Segment { from, to, stroke } => {
                    draw_line(&mut chart, [(axis.x(from.0), from.1), (axis.x(to.0), to.1)], stroke)?;
                }
                Shape::Rect {
                    corner,
                    opposite,
                    stroke,
                    fill,
                } => {
                    let corners = [(axis.x(corner.0), corner.1), (axis.x(opposite.0), opposite.1)];
                    chart
                        .draw_series([
                            Rectangle::new(corners, rgba(*fill).filled()),
                            Rectangle::new(corners, rgba(stroke.color).stroke_width(stroke.width)),
                        ])
                        .map_err(plotters_error)?;
                }
            }
        }

        for label in &pane.labels {
            let at = match label.anchor {
                Anchor::Data((t, v)) => (axis.x(t), v),
                Anchor::Paper { x, y } => (x0 + (x1 - x0) * x, y0 + (y1 - y0) * y),
            };
            let style = label_style(label).pos(Pos::new(HPos::Left, VPos::Center));
            chart
                .draw_series(std::iter::once(Text::new(label.text.clone(), at, style)))
                .map_err(plotters_error)?;
        }

        Ok(())
    }
}

impl<'d> From<&'d Figure> for Draw<'d> {
    fn from(figure: &'d Figure) -> Self {
        Self::with_figure(figure)
    }
}

fn draw_line<DB, I>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
    points: I,
    stroke: &Stroke,
) -> Result<()>
where
    DB: DrawingBackend,
    I: IntoIterator<Item = (f64, f64)>,
{
    let style = rgba(stroke.color).stroke_width(stroke.width);
    let points: Vec<(f64, f64)> = points.into_iter().collect();
    match stroke.dash {
        Dash::Solid => chart.draw_series(LineSeries::new(points, style)),
        Dash::Dash => chart.draw_series(DashedLineSeries::new(points.into_iter(), 8, 4, style)),
        Dash::Dot => chart.draw_series(DashedLineSeries::new(points.into_iter(), 2, 3, style)),
    }
    .map(|_| ())
    .map_err(plotters_error)
}

fn label_style(label: &Label) -> TextStyle<'static> {
    (FONT, label.size).into_font().color(&rgba(label.color)).pos(Pos::new(HPos::Center, VPos::Center))
}

fn rgba(color: ChartColor) -> RGBAColor {
    RGBColor(color.r, color.g, color.b).mix(color.alpha)
}

const DAY: i64 = 86_400;
/// Days from 1970-01-01 (a Thursday) to the following Monday.
const FIRST_MONDAY: i64 = 4;

/// Maps timestamps to x coordinates in seconds.
///
/// With weekends hidden the axis counts business-day seconds from 1970-01-05, so Saturday
/// and Sunday take no room and Friday's session is followed directly by Monday's.
#[derive(Debug, Clone, Copy)]
struct TimeAxis {
    hide_weekends: bool,
}

impl TimeAxis {
    fn new(hide_weekends: bool) -> Self {
        Self { hide_weekends }
    }

    fn x(&self, time: NaiveDateTime) -> f64 {
        let secs = time.and_utc().timestamp();
        if !self.hide_weekends {
            return secs as f64;
        }
        let days = secs.div_euclid(DAY) - FIRST_MONDAY;
        let (week, weekday) = (days.div_euclid(7), days.rem_euclid(7));
        // weekend instants collapse onto the next Monday's open
        let of_day = if weekday < 5 { secs.rem_euclid(DAY) } else { 0 };
        ((week * 5 + weekday.min(5)) * DAY + of_day) as f64
    }

    /// Inverse of [`TimeAxis::x`], used for tick labels.
    fn time(&self, x: f64) -> Option<NaiveDateTime> {
        let x = x as i64;
        let secs = if self.hide_weekends {
            let days = x.div_euclid(DAY);
            let (week, weekday) = (days.div_euclid(5), days.rem_euclid(5));
            (week * 7 + weekday + FIRST_MONDAY) * DAY + x.rem_euclid(DAY)
        } else {
            x
        };
        DateTime::from_timestamp(secs, 0).map(|t| t.naive_utc())
    }

    /// Axis range widened so edge candles are not clipped.
    fn padded_range(&self, (start, end): (NaiveDateTime, NaiveDateTime)) -> std::ops::Range<f64> {
        let (start, end) = (self.x(start), self.x(end));
        let padding = ((end - start) * 0.02).max(3600.0);
        start - padding..end + padding
    }
}

fn plotters_error(e: impl std::fmt::Display) -> Error {
    Error::Plotters(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day).unwrap().and_hms_opt(hour, min, 0).unwrap()
    }

    #[test]
    fn padded_range_covers_single_instant() {
        let axis = TimeAxis::new(false);
        let t = at(2, 9, 30);
        let range = axis.padded_range((t, t));
        assert!(range.start < axis.x(t) && axis.x(t) < range.end);
    }

    #[test]
    fn hidden_weekends_take_no_room() {
        let axis = TimeAxis::new(true);
        // Friday 2023-01-06 to Monday 2023-01-09
        assert_eq!(axis.x(at(9, 0, 0)) - axis.x(at(6, 0, 0)), DAY as f64);
        assert_eq!(axis.x(at(7, 12, 0)), axis.x(at(9, 0, 0)));
        assert!(axis.x(at(6, 15, 30)) < axis.x(at(9, 9, 30)));
    }

    #[test]
    fn axis_labels_map_back_to_timestamps() {
        let hidden = TimeAxis::new(true);
        let visible = TimeAxis::new(false);
        for t in [at(2, 9, 30), at(6, 15, 59), at(9, 0, 0), at(31, 13, 30)] {
            assert_eq!(hidden.time(hidden.x(t)), Some(t));
            assert_eq!(visible.time(visible.x(t)), Some(t));
        }
        assert_eq!(visible.x(at(7, 0, 0)) - visible.x(at(6, 0, 0)), DAY as f64);
    }

    #[test]
    fn dashed_and_dotted_lines_are_drawn() {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (200, 100)).into_drawing_area();
            let mut chart = ChartBuilder::on(&root).build_cartesian_2d(0.0..10.0, 0.0..10.0).unwrap();
            let color = ChartColor::rgb(38, 166, 154);
            for dash in [Dash::Dash, Dash::Dot] {
                let stroke = Stroke::new(color, 1, dash);
                draw_line(&mut chart, [(0.0, 1.0), (5.0, 8.0), (10.0, 2.0)], &stroke).unwrap();
            }
            root.present().unwrap();
        }
        assert!(svg.matches("<polyline").count() > 2);
    }
}
