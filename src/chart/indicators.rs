//! Price overlays and oscillators, computed with the `ta` crate.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ta::Next;
use ta::indicators::{
    BollingerBands, BollingerBandsOutput, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    MovingAverageConvergenceDivergenceOutput, RelativeStrengthIndex, SimpleMovingAverage, SlowStochastic,
};

use super::figure::{Bar, Dash, Guide, Pane, PaneKind, Stroke, TimePoint, Trace};
use super::theme::ChartTheme;
use crate::errors::{Error, Result};
use crate::market::Series;

/// Trace drawn on the price scale.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    Sma(usize),
    Ema(usize),
    Bollinger { period: usize, k: f64 },
}

impl Overlay {
    pub fn label(&self) -> String {
        match self {
            Self::Sma(period) => format!("SMA({period})"),
            Self::Ema(period) => format!("EMA({period})"),
            Self::Bollinger { period, k } => format!("BB({period}, {k})"),
        }
    }

    fn warmup(&self) -> usize {
        match self {
            Self::Sma(period) | Self::Ema(period) | Self::Bollinger { period, .. } => period.saturating_sub(1),
        }
    }

    /// Computes the overlay traces over `series`.
    pub(crate) fn traces(&self, series: &Series, stroke: Stroke) -> Result<Vec<Trace>> {
        let label = self.label();
        let fault = |reason: String| Error::render(&label, reason);
        let skip = self.warmup();
        if series.len() <= skip {
            return Err(fault(format!("needs more than {skip} candles, got {}", series.len())));
        }

        let line = |name: String, points: Vec<TimePoint>, stroke: Stroke| Trace::Line { name, points, stroke };
        match *self {
            Self::Sma(period) => {
                let mut sma = SimpleMovingAverage::new(period).map_err(|e| fault(e.to_string()))?;
                let points = project(series, skip, |close| sma.next(close));
                Ok(vec![line(label, points, stroke)])
            }
            Self::Ema(period) => {
                let mut ema = ExponentialMovingAverage::new(period).map_err(|e| fault(e.to_string()))?;
                let points = project(series, skip, |close| ema.next(close));
                Ok(vec![line(label, points, stroke)])
            }
            Self::Bollinger { period, k } => {
                if !k.is_finite() || k <= 0.0 {
                    return Err(fault(format!("multiplier must be positive (got: {k})")));
                }
                let mut bb = BollingerBands::new(period, k).map_err(|e| fault(e.to_string()))?;
                let outputs = series
                    .iter()
                    .map(|c| (c.timestamp(), bb.next(c.close())))
                    .skip(skip)
                    .collect::<Vec<_>>();
                let band = |pick: fn(&BollingerBandsOutput) -> f64| {
                    outputs.iter().map(|(t, o)| (*t, pick(o))).collect::<Vec<_>>()
                };
                let dotted = Stroke { dash: Dash::Dot, ..stroke };
                Ok(vec![
                    line(format!("{label} upper"), band(|o| o.upper), dotted),
                    line(format!("{label} middle"), band(|o| o.average), stroke),
                    line(format!("{label} lower"), band(|o| o.lower), dotted),
                ])
            }
        }
    }
}

/// Indicator rendered in its own pane, on its own scale.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oscillator {
    /// Relative strength index, bounded to `[0, 100]`.
    Rsi(usize),
    /// Slow stochastic %K, bounded to `[0, 100]`.
    Stochastic { period: usize, smoothing: usize },
    /// Zero-centered MACD with signal line and histogram.
    Macd { fast: usize, slow: usize, signal: usize },
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::Rsi(14)
    }
}

impl Oscillator {
    pub fn label(&self) -> String {
        match self {
            Self::Rsi(period) => format!("RSI({period})"),
            Self::Stochastic { period, smoothing } => format!("Stoch({period}, {smoothing})"),
            Self::Macd { fast, slow, signal } => format!("MACD({fast}, {slow}, {signal})"),
        }
    }

    /// Natural vertical bounds, for bounded oscillators.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::Rsi(_) | Self::Stochastic { .. } => Some((0.0, 100.0)),
            Self::Macd { .. } => None,
        }
    }

    /// Static reference levels: upper threshold, lower threshold, midline.
    pub fn reference_levels(&self) -> (Option<f64>, Option<f64>, f64) {
        match self {
            Self::Rsi(_) => (Some(70.0), Some(30.0), 50.0),
            Self::Stochastic { .. } => (Some(80.0), Some(20.0), 50.0),
            Self::Macd { .. } => (None, None, 0.0),
        }
    }

    /// Leading outputs to drop, `None` when the periods overflow.
    fn warmup(&self) -> Option<usize> {
        match *self {
            Self::Rsi(period) => Some(period),
            Self::Stochastic { period, smoothing } => period.checked_add(smoothing).map(|n| n.saturating_sub(2)),
            Self::Macd { slow, signal, .. } => slow.checked_add(signal).map(|n| n.saturating_sub(2)),
        }
    }

    /// Builds the oscillator pane over `series`.
    pub(crate) fn pane(&self, series: &Series, theme: &ChartTheme) -> Result<Pane> {
        let label = self.label();
        let fault = |reason: String| Error::render(&label, reason);
        let skip = self.warmup().ok_or_else(|| fault("periods overflow the warm-up window".to_string()))?;
        if series.len() <= skip {
            return Err(fault(format!("needs more than {skip} candles, got {}", series.len())));
        }

        let mut pane = Pane::new(PaneKind::Oscillator(*self), &label);
        pane.axis.range = self.bounds();
        let line_stroke = Stroke::solid(theme.primary, 2);

        match *self {
            Self::Rsi(period) => {
                let mut rsi = RelativeStrengthIndex::new(period).map_err(|e| fault(e.to_string()))?;
                let points = project(series, skip, |close| rsi.next(close));
                pane.traces.push(Trace::Line {
                    name: label.clone(),
                    points,
                    stroke: line_stroke,
                });
            }
            Self::Stochastic { period, smoothing } => {
                let mut stoch = SlowStochastic::new(period, smoothing).map_err(|e| fault(e.to_string()))?;
                let points = series
                    .iter()
                    .map(|c| (c.timestamp(), stoch.next(c)))
                    .skip(skip)
                    .collect();
                pane.traces.push(Trace::Line {
                    name: label.clone(),
                    points,
                    stroke: line_stroke,
                });
            }
            Self::Macd { fast, slow, signal } => {
                if fast >= slow {
                    return Err(fault(format!("fast period {fast} must be below slow period {slow}")));
                }
                let mut macd =
                    MovingAverageConvergenceDivergence::new(fast, slow, signal).map_err(|e| fault(e.to_string()))?;
                let outputs = series
                    .iter()
                    .map(|c| (c.timestamp(), macd.next(c.close())))
                    .skip(skip)
                    .collect::<Vec<_>>();
                let line = |pick: fn(&MovingAverageConvergenceDivergenceOutput) -> f64| {
                    outputs.iter().map(|(t, o)| (*t, pick(o))).collect::<Vec<_>>()
                };
                let bars = outputs
                    .iter()
                    .map(|(time, o)| Bar {
                        time: *time,
                        value: o.histogram,
                        color: if o.histogram >= 0.0 { theme.success } else { theme.danger },
                    })
                    .collect();
                pane.traces.push(Trace::Bars {
                    name: "Histogram".to_string(),
                    bars,
                    opacity: 0.6,
                });
                pane.traces.push(Trace::Line {
                    name: "MACD".to_string(),
                    points: line(|o| o.macd),
                    stroke: line_stroke,
                });
                pane.traces.push(Trace::Line {
                    name: "Signal".to_string(),
                    points: line(|o| o.signal),
                    stroke: Stroke::solid(theme.warning, 1),
                });
            }
        }

        let (upper, lower, mid) = self.reference_levels();
        if let Some(value) = upper {
            pane.guides.push(Guide {
                value,
                stroke: Stroke::new(theme.danger, 1, Dash::Dash),
            });
        }
        if let Some(value) = lower {
            pane.guides.push(Guide {
                value,
                stroke: Stroke::new(theme.success, 1, Dash::Dash),
            });
        }
        pane.guides.push(Guide {
            value: mid,
            stroke: Stroke::new(theme.secondary, 1, Dash::Dot),
        });

        Ok(pane)
    }
}

/// Feeds every close through `f`, dropping the first `skip` outputs.
fn project<F: FnMut(f64) -> f64>(series: &Series, skip: usize, mut f: F) -> Vec<TimePoint> {
    series
        .iter()
        .map(|c| (c.timestamp(), f(c.close())))
        .skip(skip)
        .collect()
}
