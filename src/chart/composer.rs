use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::drawing::DrawingOverlayRenderer;
use super::figure::{
    Anchor, Bar, Color, Figure, Label, MarkerSymbol, OhlcPoint, Omission, Pane, PaneKind, Placeholder, Stroke,
    TimePoint, Trace,
};
use super::theme::ChartTheme;
use super::trades::{EquityPoint, TradeAnnotation, trade_marks};
use super::{ChartKind, ChartRequest};
use crate::errors::{Error, Result};
use crate::market::{Series, price_axis_title};
use crate::source::{Candles, Origin};

const NO_DATA_TEXT: &str = "No data available";
const FALLBACK_TEXT: &str = "Fallback data shown: the market-data provider failed";
const VOLUME_OPACITY: f64 = 0.7;
const MARKER_SIZE: u32 = 12;

/// Assembles [`Figure`]s from candles, a [`ChartRequest`] and backtest trades.
///
/// The composer never fails: an invalid request yields a fault placeholder,
/// empty candles a no-data placeholder, and a failing overlay, oscillator,
/// drawing or trade is omitted while the rest of the figure renders.
#[derive(Debug, Clone, Default)]
pub struct ChartComposer {
    theme: ChartTheme,
}

impl ChartComposer {
    pub fn new(theme: ChartTheme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &ChartTheme {
        &self.theme
    }

    /// Composes the figure for `candles`.
    ///
    /// ### Arguments
    /// * `candles` - the series to plot, possibly empty
    /// * `request` - chart kind, overlays, oscillators, drawings
    /// * `trades` - backtest trades annotated on the price pane
    ///
    /// ### Returns
    /// The figure. Check [`Figure::placeholder`] and [`Figure::omissions`] for degraded output.
    pub fn compose(&self, candles: &Series, request: &ChartRequest, trades: &[TradeAnnotation]) -> Figure {
        let spec = match request.validate() {
            Ok(spec) => spec,
            Err(e) => return self.fault(request.title(), &e),
        };

        let mut figure = Figure::new(request.title(), self.theme.backdrop());
        figure.set_hide_weekends(!spec.is_intraday());
        if let Some(notice) = &request.notice {
            self.push_notice(&mut figure, notice);
        }

        let Some(span) = candles.time_span() else {
            debug!(symbol = %request.symbol, timeframe = spec.token, "empty series, no-data figure");
            figure.set_placeholder(Placeholder::NoData, self.placeholder_label(NO_DATA_TEXT, self.theme.danger, 20));
            return figure;
        };
        figure.set_time_range(span);

        let mut price = Pane::new(PaneKind::Price, price_axis_title(&request.symbol));
        price.traces.push(self.primary_trace(candles, request));

        for (i, overlay) in request.overlays.iter().enumerate() {
            let stroke = Stroke::solid(self.theme.overlay_color(i), 1);
            match overlay.traces(candles, stroke) {
                Ok(traces) => price.traces.extend(traces),
                Err(e) => omit(&mut figure, &e),
            }
        }

        let renderer = DrawingOverlayRenderer::new(&self.theme);
        for drawing in &request.drawings {
            match renderer.render(drawing, span) {
                Ok(geometry) => {
                    price.shapes.extend(geometry.shapes);
                    price.labels.extend(geometry.labels);
                }
                Err(e) => omit(&mut figure, &e),
            }
        }

        self.annotate_trades(&mut figure, &mut price, trades, span.1);

        let mut panes = vec![price, self.volume_pane(candles)];
        for oscillator in &request.oscillators {
            match oscillator.pane(candles, &self.theme) {
                Ok(pane) => panes.push(pane),
                Err(e) => omit(&mut figure, &e),
            }
        }

        let lead = (1.0 - 0.2 * (panes.len() - 1) as f64).max(0.6);
        figure.stack(panes, lead);
        debug!(
            symbol = %request.symbol,
            timeframe = spec.token,
            panes = figure.panes().len(),
            omitted = figure.omissions().len(),
            "figure composed"
        );
        figure
    }

    /// Composes the outcome of a candle request, keeping a fault distinct from an empty result.
    pub fn compose_outcome(&self, outcome: Result<Candles>, request: &ChartRequest, trades: &[TradeAnnotation]) -> Figure {
        match outcome {
            Ok(Candles::Series { series, origin }) => {
                let mut figure = self.compose(&series, request, trades);
                if origin == Origin::SyntheticFallback {
                    self.push_notice(&mut figure, FALLBACK_TEXT);
                }
                figure
            }
            Ok(Candles::NoData) => self.compose(&Series::empty(), request, trades),
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "candle request failed");
                self.fault(request.title(), &e)
            }
        }
    }

    /// Two-pane figure of a backtest's equity curve: equity on top (70 %), drawdown below.
    pub fn compose_equity(&self, title: &str, curve: &[EquityPoint]) -> Figure {
        let mut figure = Figure::new(title, self.theme.backdrop());
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            figure.set_placeholder(Placeholder::NoData, self.placeholder_label(NO_DATA_TEXT, self.theme.danger, 20));
            return figure;
        };
        if let Some(i) = curve.windows(2).position(|w| w[0].time >= w[1].time) {
            return self.fault(title, &Error::UnorderedTimestamps { index: i + 1 });
        }
        figure.set_time_range((first.time, last.time));

        let line = |name: &str, pick: fn(&EquityPoint) -> f64, color: Color| Trace::Line {
            name: name.to_string(),
            points: curve.iter().map(|p| (p.time, pick(p))).collect(),
            stroke: Stroke::solid(color, 2),
        };
        let mut equity = Pane::new(PaneKind::Equity, "Equity");
        equity.traces.push(line("Equity", |p| p.equity, self.theme.primary));
        let mut drawdown = Pane::new(PaneKind::Drawdown, "Drawdown (%)");
        drawdown.traces.push(line("Drawdown", |p| p.drawdown, self.theme.danger));

        figure.stack(vec![equity, drawdown], 0.7);
        figure
    }

    fn primary_trace(&self, candles: &Series, request: &ChartRequest) -> Trace {
        let name = request.symbol.clone();
        let ohlc = || {
            candles
                .iter()
                .map(|c| OhlcPoint {
                    time: c.timestamp(),
                    open: c.open(),
                    high: c.high(),
                    low: c.low(),
                    close: c.close(),
                })
                .collect::<Vec<_>>()
        };
        match request.kind {
            ChartKind::Line => Trace::Line {
                name,
                points: candles.iter().map(|c| (c.timestamp(), c.close())).collect(),
                stroke: Stroke::solid(self.theme.primary, 2),
            },
            ChartKind::Candlestick => Trace::Candlestick {
                name,
                points: ohlc(),
                rising: self.theme.success,
                falling: self.theme.danger,
            },
            ChartKind::OhlcBar => Trace::OhlcBars {
                name,
                points: ohlc(),
                rising: self.theme.success,
                falling: self.theme.danger,
            },
        }
    }

    fn volume_pane(&self, candles: &Series) -> Pane {
        let bars = candles
            .iter()
            .map(|c| Bar {
                time: c.timestamp(),
                value: c.volume(),
                color: if c.close() < c.open() { self.theme.danger } else { self.theme.success },
            })
            .collect();
        let mut pane = Pane::new(PaneKind::Volume, "Volume");
        pane.traces.push(Trace::Bars {
            name: "Volume".to_string(),
            bars,
            opacity: VOLUME_OPACITY,
        });
        pane
    }

    fn annotate_trades(&self, figure: &mut Figure, price: &mut Pane, trades: &[TradeAnnotation], series_end: NaiveDateTime) {
        let mut buys: Vec<TimePoint> = Vec::new();
        let mut sells: Vec<TimePoint> = Vec::new();
        for trade in trades {
            match trade_marks(trade, series_end, &self.theme) {
                Ok(marks) => {
                    for (point, symbol) in marks.markers {
                        match symbol {
                            MarkerSymbol::TriangleDown => sells.push(point),
                            _ => buys.push(point),
                        }
                    }
                    price.shapes.extend(marks.rails);
                }
                Err(e) => omit(figure, &e),
            }
        }

        for (name, points, symbol, color) in [
            ("Buy", buys, MarkerSymbol::TriangleUp, self.theme.success),
            ("Sell", sells, MarkerSymbol::TriangleDown, self.theme.danger),
        ] {
            if !points.is_empty() {
                price.traces.push(Trace::Markers {
                    name: name.to_string(),
                    points,
                    symbol,
                    color,
                    size: MARKER_SIZE,
                });
            }
        }
    }

    fn fault(&self, title: impl ToString, error: &Error) -> Figure {
        let component = error.component();
        let mut figure = Figure::new(title, self.theme.backdrop());
        let text = format!("Chart error ({component}): {error}");
        figure.set_placeholder(
            Placeholder::Fault {
                component: component.to_string(),
                message: error.to_string(),
            },
            self.placeholder_label(&text, self.theme.warning, 14),
        );
        figure
    }

    fn placeholder_label(&self, text: &str, color: Color, size: u32) -> Label {
        Label {
            anchor: Anchor::Paper { x: 0.5, y: 0.5 },
            text: text.to_string(),
            color,
            size,
        }
    }

    fn push_notice(&self, figure: &mut Figure, text: &str) {
        figure.push_label(Label {
            anchor: Anchor::Paper { x: 0.5, y: 0.99 },
            text: text.to_string(),
            color: self.theme.warning,
            size: 12,
        });
    }
}

fn omit(figure: &mut Figure, error: &Error) {
    let omission = match error {
        Error::RenderFault { element, reason } => Omission {
            element: element.clone(),
            reason: reason.clone(),
        },
        other => Omission {
            element: other.component().to_string(),
            reason: other.to_string(),
        },
    };
    warn!(element = %omission.element, reason = %omission.reason, "chart element omitted");
    figure.push_omission(omission);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{DrawingShape, Oscillator, Overlay, Point, TradeSide};
    use crate::market::AssetClass;
    use crate::synth::synthesize;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn series(n: i64) -> Series {
        let timestamps = (0..n).map(|i| t0() + Duration::days(i)).collect::<Vec<_>>();
        synthesize("AAPL", &timestamps, AssetClass::Equity).unwrap()
    }

    #[test]
    fn price_and_volume_split_80_20() {
        let figure = ChartComposer::default().compose(&series(40), &ChartRequest::new("AAPL", "1d"), &[]);
        assert!(figure.placeholder().is_none());
        let heights = figure.panes().iter().map(|p| p.height).collect::<Vec<_>>();
        assert_eq!(heights.len(), 2);
        assert!((heights[0] - 0.8).abs() < 1e-12);
        assert!((heights[1] - 0.2).abs() < 1e-12);
        assert_eq!(figure.title(), "AAPL - 1d");
        assert!(figure.hide_weekends());
    }

    #[test]
    fn price_share_never_drops_below_60_percent() {
        let request = ChartRequest::new("AAPL", "1h")
            .oscillator(Oscillator::Rsi(14))
            .oscillator(Oscillator::Stochastic { period: 14, smoothing: 3 })
            .oscillator(Oscillator::Macd { fast: 12, slow: 26, signal: 9 });
        let figure = ChartComposer::default().compose(&series(80), &request, &[]);
        assert_eq!(figure.panes().len(), 5);
        assert_eq!(figure.panes()[0].height, 0.6);
        assert!((figure.panes()[1].height - 0.1).abs() < 1e-12);
        assert!(!figure.hide_weekends());
    }

    #[test]
    fn line_chart_uses_closes() {
        let candles = series(10);
        let request = ChartRequest::new("AAPL", "1d").kind(ChartKind::Line);
        let figure = ChartComposer::default().compose(&candles, &request, &[]);
        let Some(Trace::Line { points, .. }) = figure.price_pane().and_then(|p| p.trace("AAPL")) else {
            panic!("expected a line trace");
        };
        assert_eq!(points.iter().map(|(_, v)| *v).collect::<Vec<_>>(), candles.closes().collect::<Vec<_>>());
    }

    #[test]
    fn volume_bars_follow_candle_direction() {
        let candles = series(30);
        let theme = ChartTheme::default();
        let figure = ChartComposer::new(theme.clone()).compose(&candles, &ChartRequest::new("AAPL", "1d"), &[]);
        let Some(Trace::Bars { bars, opacity, .. }) = figure.pane(&PaneKind::Volume).and_then(|p| p.trace("Volume"))
        else {
            panic!("expected volume bars");
        };
        assert_eq!(*opacity, 0.7);
        for (bar, candle) in bars.iter().zip(candles.iter()) {
            let expected = if candle.close() < candle.open() { theme.danger } else { theme.success };
            assert_eq!(bar.color, expected);
        }
    }

    #[test]
    fn empty_series_renders_no_data() {
        let figure = ChartComposer::default().compose(&Series::empty(), &ChartRequest::new("AAPL", "1d"), &[]);
        assert!(figure.is_no_data());
        assert!(figure.panes().is_empty());
        assert_eq!(figure.labels()[0].text, "No data available");
    }

    #[test]
    fn invalid_request_renders_fault_with_component() {
        let figure = ChartComposer::default().compose(&series(5), &ChartRequest::new("AAPL", "7h"), &[]);
        let Some(Placeholder::Fault { component, .. }) = figure.placeholder() else {
            panic!("expected a fault placeholder");
        };
        assert_eq!(component, "calendar");
        assert!(!figure.is_no_data());
    }

    #[test]
    fn failing_elements_are_omitted() {
        let request = ChartRequest::new("AAPL", "1d")
            .overlay(Overlay::Sma(5))
            .overlay(Overlay::Sma(500))
            .oscillator(Oscillator::Macd { fast: 26, slow: 12, signal: 9 })
            .drawing(DrawingShape::Horizontal { y: f64::NAN });
        let figure = ChartComposer::default().compose(&series(30), &request, &[]);
        let price = figure.price_pane().unwrap();
        assert!(price.trace("SMA(5)").is_some());
        assert!(price.trace("SMA(500)").is_none());
        assert_eq!(figure.panes().len(), 2);
        assert_eq!(figure.omissions().len(), 3);
    }

    #[test]
    fn overflowing_oscillator_is_omitted() {
        let request = ChartRequest::new("AAPL", "1d")
            .oscillator(Oscillator::Stochastic { period: usize::MAX, smoothing: 3 })
            .oscillator(Oscillator::Rsi(14));
        let figure = ChartComposer::default().compose(&series(60), &request, &[]);
        assert_eq!(figure.panes().len(), 3);
        assert_eq!(figure.omissions().len(), 1);
        assert!(figure.omissions()[0].element.starts_with("Stoch("));
    }

    #[test]
    fn trades_are_bucketed_by_direction() {
        let candles = series(30);
        let day = |d: i64| t0() + Duration::days(d);
        let trades = [
            TradeAnnotation::open(TradeSide::Long, day(2), 150.0)
                .closed_at(day(8), 155.0)
                .stop_loss(145.0),
            TradeAnnotation::open(TradeSide::Short, day(10), 152.0),
            TradeAnnotation::open(TradeSide::Long, day(12), -1.0),
        ];
        let figure = ChartComposer::default().compose(&candles, &ChartRequest::new("AAPL", "1d"), &trades);
        let price = figure.price_pane().unwrap();
        let Some(Trace::Markers { points: buys, .. }) = price.trace("Buy") else {
            panic!("expected buy markers");
        };
        let Some(Trace::Markers { points: sells, .. }) = price.trace("Sell") else {
            panic!("expected sell markers");
        };
        assert_eq!(buys, &vec![(day(2), 150.0)]);
        assert_eq!(sells, &vec![(day(8), 155.0), (day(10), 152.0)]);
        assert_eq!(price.shapes.len(), 1);
        assert_eq!(figure.omissions().len(), 1);
    }

    #[test]
    fn drawings_land_on_price_pane() {
        let day = |d: i64| t0() + Duration::days(d);
        let request = ChartRequest::new("AAPL", "1d").drawing(DrawingShape::Fibonacci {
            p0: Point::new(day(1), 100.0),
            p1: Point::new(day(5), 200.0),
        });
        let figure = ChartComposer::default().compose(&series(10), &request, &[]);
        let price = figure.price_pane().unwrap();
        assert_eq!(price.shapes.len(), 7);
        assert_eq!(price.labels.len(), 7);
    }

    #[test]
    fn outcome_keeps_fault_and_no_data_apart() {
        let composer = ChartComposer::default();
        let request = ChartRequest::new("AAPL", "1d");
        assert!(composer.compose_outcome(Ok(Candles::NoData), &request, &[]).is_no_data());
        let fault = Error::Fetch {
            symbol: "AAPL".to_string(),
            reason: "timeout".to_string(),
        };
        let figure = composer.compose_outcome(Err(fault), &request, &[]);
        assert!(figure.is_fault());
        assert_eq!(figure.labels()[0].color, composer.theme().warning);
    }

    #[test]
    fn fallback_outcome_carries_notice() {
        let outcome = Ok(Candles::Series {
            series: series(10),
            origin: Origin::SyntheticFallback,
        });
        let figure = ChartComposer::default().compose_outcome(outcome, &ChartRequest::new("AAPL", "1d"), &[]);
        assert!(figure.labels().iter().any(|l| l.text.starts_with("Fallback data shown")));
    }

    #[test]
    fn equity_figure_splits_70_30() {
        let curve = (0..5)
            .map(|i| EquityPoint {
                time: t0() + Duration::days(i),
                equity: 1000.0 + i as f64,
                drawdown: 0.0,
            })
            .collect::<Vec<_>>();
        let figure = ChartComposer::default().compose_equity("Backtest", &curve);
        assert_eq!(figure.panes()[0].height, 0.7);
        assert!(figure.pane(&PaneKind::Drawdown).is_some());
        assert!(ChartComposer::default().compose_equity("Backtest", &[]).is_no_data());
    }
}
