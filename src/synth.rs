//! Deterministic synthetic price paths.
//!
//! The same symbol sampled at the same timestamps always yields bit-identical
//! candles: the random source is seeded from a stable hash of the symbol only.

use chrono::{NaiveDateTime, TimeDelta};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::market::{AssetClass, Candle, CandleBuilder, Series, base_price};
use crate::utils::stable_hash;

/// Maps a symbol to the seed of its random source.
pub type SeedFn = fn(&str) -> u64;

const TREND_DRIFT: f64 = 0.0001;
const TREND_STEP: f64 = 0.001;
const VOLUME_RANGE: (f64, f64) = (10_000.0, 100_000.0);

/// Volatility coefficients by sampling granularity, finest first.
const VOLATILITY_STEPS: &[(TimeDelta, f64)] = &[
    (TimeDelta::minutes(5), 0.001),
    (TimeDelta::minutes(30), 0.002),
    (TimeDelta::hours(4), 0.005),
    (TimeDelta::days(4), 0.01),
    (TimeDelta::days(14), 0.02),
];
const COARSEST_VOLATILITY: f64 = 0.03;
const DAILY_VOLATILITY: f64 = 0.01;

/// Sampling step of a timestamp sequence.
///
/// The widest gap between two timestamps of the same day when the sequence is
/// intraday, otherwise the narrowest gap between consecutive timestamps.
/// `None` when there are fewer than two timestamps.
pub fn granularity(timestamps: &[NaiveDateTime]) -> Option<TimeDelta> {
    let same_day = timestamps
        .windows(2)
        .filter(|w| w[0].date() == w[1].date())
        .map(|w| w[1] - w[0])
        .max();
    same_day.or_else(|| timestamps.windows(2).map(|w| w[1] - w[0]).min())
}

/// Per-step volatility before the asset-class scaling.
pub fn base_volatility(granularity: Option<TimeDelta>) -> f64 {
    let Some(step) = granularity else {
        return DAILY_VOLATILITY;
    };
    VOLATILITY_STEPS
        .iter()
        .find(|(bound, _)| step <= *bound)
        .map_or(COARSEST_VOLATILITY, |(_, volatility)| *volatility)
}

/// Synthesizes OHLCV candles for a symbol over a timestamp sequence.
#[derive(Debug, Clone, Copy)]
pub struct PricePathSynthesizer {
    seed: SeedFn,
}

impl Default for PricePathSynthesizer {
    fn default() -> Self {
        Self { seed: stable_hash }
    }
}

impl PricePathSynthesizer {
    /// Uses `seed` instead of the default FNV-1a symbol hash.
    pub fn with_seed(seed: SeedFn) -> Self {
        Self { seed }
    }

    /// Draws one candle per timestamp.
    ///
    /// ### Arguments
    /// * `symbol` - Ticker; selects the base price and the seed.
    /// * `timestamps` - Strictly increasing session timestamps.
    /// * `asset_class` - Scales the volatility (crypto ×3, forex ×0.1).
    ///
    /// ### Returns
    /// The series, empty when `timestamps` is empty.
    pub fn synthesize(&self, symbol: &str, timestamps: &[NaiveDateTime], asset_class: AssetClass) -> Result<Series> {
        let n = timestamps.len();
        if n == 0 {
            return Ok(Series::empty());
        }

        let base = base_price(symbol);
        let mut rng = StdRng::seed_from_u64((self.seed)(symbol));
        let volatility = base_volatility(granularity(timestamps)) * asset_class.volatility_scale();

        let trend = (0..n)
            .scan(0.0, |level, _| {
                *level += normal(&mut rng, TREND_DRIFT, TREND_STEP);
                Some(*level)
            })
            .collect::<Vec<_>>();
        let noise = (0..n).map(|_| normal(&mut rng, 0.0, volatility)).collect::<Vec<_>>();
        let close = trend
            .iter()
            .zip(&noise)
            .map(|(t, e)| base * (1.0 + t + e))
            .collect::<Vec<_>>();
        let high = close
            .iter()
            .map(|c| c * (1.0 + uniform(&mut rng, 0.0, volatility * 2.0)))
            .collect::<Vec<_>>();
        let low = close
            .iter()
            .map(|c| c * (1.0 - uniform(&mut rng, 0.0, volatility * 2.0)))
            .collect::<Vec<_>>();
        let open = low
            .iter()
            .zip(&high)
            .map(|(l, h)| l + uniform(&mut rng, 0.0, 1.0) * (h - l))
            .collect::<Vec<_>>();
        let volume = (0..n)
            .map(|_| uniform(&mut rng, base * VOLUME_RANGE.0, base * VOLUME_RANGE.1))
            .collect::<Vec<_>>();

        let candles = (0..n)
            .map(|i| {
                // repair: the body always lies inside the wicks
                let high = open[i].max(close[i]).max(high[i]);
                let low = open[i].min(close[i]).min(low[i]);
                CandleBuilder::builder()
                    .timestamp(timestamps[i])
                    .open(open[i])
                    .high(high)
                    .low(low)
                    .close(close[i])
                    .volume(volume[i])
                    .build()
                    .map_err(|e| Error::GenerationFault {
                        symbol: symbol.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<Candle>>>()?;

        let series = Series::new(candles)?;
        debug!(symbol, candles = series.len(), volatility, "synthetic series generated");
        Ok(series)
    }
}

/// Synthesizes a series with the default symbol hash.
pub fn synthesize(symbol: &str, timestamps: &[NaiveDateTime], asset_class: AssetClass) -> Result<Series> {
    PricePathSynthesizer::default().synthesize(symbol, timestamps, asset_class)
}

fn uniform(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    low + rng.random::<f64>() * (high - low)
}

/// Box-Muller transform.
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::session_timestamps;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily() -> Vec<NaiveDateTime> {
        session_timestamps("1d", date(2023, 1, 1), date(2023, 6, 30)).unwrap()
    }

    #[test]
    fn deterministic_for_same_symbol() {
        let ts = daily();
        let a = synthesize("AAPL", &ts, AssetClass::Equity).unwrap();
        let b = synthesize("AAPL", &ts, AssetClass::Equity).unwrap();
        assert_eq!(a, b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.close().to_bits(), y.close().to_bits());
            assert_eq!(x.volume().to_bits(), y.volume().to_bits());
        }
    }

    #[test]
    fn symbols_diverge() {
        let ts = daily();
        let a = synthesize("AAPL", &ts, AssetClass::Equity).unwrap();
        let b = synthesize("XYZ", &ts, AssetClass::Equity).unwrap();
        assert_ne!(a.first().unwrap().close(), b.first().unwrap().close());
    }

    #[test]
    fn candles_respect_ohlc_order() {
        let ts = session_timestamps("5m", date(2023, 1, 2), date(2023, 1, 13)).unwrap();
        let series = synthesize("BTC-USD", &ts, AssetClass::Crypto).unwrap();
        assert_eq!(series.len(), ts.len());
        for c in &series {
            assert!(c.low() <= c.open() && c.open() <= c.high());
            assert!(c.low() <= c.close() && c.close() <= c.high());
            assert!(c.volume() >= 40000.0 * 10_000.0);
        }
    }

    #[test]
    fn empty_timestamps_empty_series() {
        assert!(synthesize("AAPL", &[], AssetClass::Equity).unwrap().is_empty());
    }

    #[test]
    fn custom_seed_is_used() {
        let ts = daily();
        let fixed = PricePathSynthesizer::with_seed(|_| 7);
        let a = fixed.synthesize("AAPL", &ts, AssetClass::Equity).unwrap();
        let b = fixed.synthesize("XYZ", &ts, AssetClass::Equity).unwrap();
        // same draws, different base prices
        let ratio = a.first().unwrap().close() / b.first().unwrap().close();
        assert!((ratio - 1.5).abs() < 1e-9);
    }

    #[test]
    fn unordered_timestamps_rejected() {
        let mut ts = daily();
        ts.swap(0, 1);
        assert!(matches!(
            synthesize("AAPL", &ts, AssetClass::Equity),
            Err(Error::UnorderedTimestamps { .. })
        ));
    }

    #[test]
    fn volatility_follows_granularity() {
        let day = date(2023, 1, 4);
        let minutes = session_timestamps("1m", day, day).unwrap();
        let hours = session_timestamps("1h", day, day).unwrap();
        let four = session_timestamps("4h", date(2023, 1, 2), date(2023, 1, 13)).unwrap();
        let weeks = session_timestamps("1w", date(2022, 1, 1), date(2023, 1, 1)).unwrap();
        let months = session_timestamps("1mo", date(2021, 1, 1), date(2023, 1, 1)).unwrap();
        assert_eq!(base_volatility(granularity(&minutes)), 0.001);
        assert_eq!(base_volatility(granularity(&hours)), 0.005);
        assert_eq!(base_volatility(granularity(&four)), 0.005);
        assert_eq!(base_volatility(granularity(&daily())), 0.01);
        assert_eq!(base_volatility(granularity(&weeks)), 0.02);
        assert_eq!(base_volatility(granularity(&months)), 0.03);
        assert_eq!(base_volatility(None), 0.01);
    }
}
