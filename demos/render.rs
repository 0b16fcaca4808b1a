//! # Rendering a Dashboard Chart
//!
//! Generates 1h candles for a crypto pair, overlays moving averages, a MACD
//! pane, two backtest trades and a Fibonacci retracement, then writes the
//! figure to `tradechart.svg`. Set `RUST_LOG=tradechart=debug` to follow the
//! calendar, the synthesizer and the composer.

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing_subscriber::EnvFilter;
use tradechart::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let start = NaiveDate::from_ymd_opt(2024, 3, 4).context("start date")?;
    let end = NaiveDate::from_ymd_opt(2024, 3, 15).context("end date")?;
    let range = DateRange::new(start, end)?;

    let request = ChartRequest::new("ETH-USD", "1h")
        .range(range)
        .overlay(Overlay::Ema(9))
        .overlay(Overlay::Sma(21))
        .oscillator(Oscillator::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        });

    let candles = request.load(DataSource::Synthetic)?;
    let Some(series) = candles.series() else {
        println!("no data for {}", request.title());
        return Ok(());
    };

    let at = |day: u32, hour: u32| {
        NaiveDate::from_ymd_opt(2024, 3, day).and_then(|d| Some(d.and_time(NaiveTime::from_hms_opt(hour, 0, 0)?)))
    };
    let (Some(t0), Some(t1), Some(t2)) = (at(5, 10), at(7, 14), at(12, 11)) else {
        anyhow::bail!("invalid trade timestamps");
    };
    let price_at = |t: NaiveDateTime| series.iter().find(|c| c.timestamp() == t).map(|c| c.close()).unwrap_or(0.0);

    let trades = [
        TradeAnnotation::open(TradeSide::Long, t0, price_at(t0))
            .closed_at(t1, price_at(t1))
            .stop_loss(price_at(t0) * 0.97)
            .take_profit(price_at(t0) * 1.05),
        TradeAnnotation::open(TradeSide::Short, t2, price_at(t2)).stop_loss(price_at(t2) * 1.03),
    ];

    let (low, high) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c.low()), hi.max(c.high())));
    let request = request.drawing(DrawingShape::Fibonacci {
        p0: Point::new(t0, high),
        p1: Point::new(t2, low),
    });

    let figure = render_chart(series, &request, &trades);
    for omission in figure.omissions() {
        println!("omitted {}: {}", omission.element, omission.reason);
    }

    let options = DrawOptions::default()
        .size(1600, 900)
        .draw_output(DrawOutput::Svg("tradechart.svg".into()));
    Draw::with_figure(&figure).with_options(options).plot()?;

    println!("{} candles, {} panes", series.len(), figure.panes().len());
    Ok(())
}
