//! # Parallel Rendering of a Watchlist
//!
//! Loads and composes one daily chart per watchlist symbol on the rayon pool.

use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;
use tradechart::prelude::*;

const WATCHLIST: [&str; 8] = ["AAPL", "MSFT", "NVDA", "TSLA", "BTC-USD", "ETH-USD", "EURUSD=X", "ES=F"];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let end = NaiveDate::from_ymd_opt(2024, 6, 28).context("end date")?;
    let range = DateRange::trailing(end, 365);

    let requests = WATCHLIST
        .iter()
        .map(|symbol| {
            ChartRequest::new(symbol, "1d")
                .range(range)
                .overlay(Overlay::Bollinger { period: 20, k: 2.0 })
                .oscillator(Oscillator::Rsi(14))
        })
        .collect::<Vec<_>>();

    let composer = ChartComposer::new(ChartTheme::default());
    let started = Instant::now();
    let figures = load_and_render(&composer, &requests, DataSource::Synthetic);
    println!("{} figures in {:?}", figures.len(), started.elapsed());

    for figure in &figures {
        let candles = figure
            .price_pane()
            .and_then(|pane| pane.traces.first())
            .map(|trace| match trace {
                Trace::Candlestick { points, .. } | Trace::OhlcBars { points, .. } => points.len(),
                Trace::Line { points, .. } => points.len(),
                _ => 0,
            })
            .unwrap_or(0);
        println!("{:<20} {candles:>4} candles, {} panes", figure.title(), figure.panes().len());
    }

    Ok(())
}
