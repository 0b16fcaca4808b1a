//! Candle sources: the synthetic generator or an external market-data fetcher.
//!
//! [`get_candles`] is the boundary the dashboard calls. It resolves the
//! timeframe, applies the calendar and returns either a series or an explicit
//! [`Candles::NoData`].

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::calendar::{DateRange, TimeframeSpec};
use crate::errors::{Error, Result};
use crate::market::{AssetClass, Series};
use crate::synth::PricePathSynthesizer;

/// External market-data provider, consumed as an opaque and possibly failing call.
///
/// Retries and backoff, if any, belong to the implementor.
pub trait CandleFetcher: Send + Sync {
    /// Fetches the candles of `symbol` for `timeframe` inside `range`.
    fn fetch(&self, symbol: &str, timeframe: &TimeframeSpec, range: DateRange) -> Result<Series>;

    /// Identifies the provider in [`CachedSource`] keys.
    ///
    /// Defaults to the implementing type's name. Override it when one type serves
    /// several providers or accounts.
    fn source_id(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Where candles come from.
#[derive(Clone, Copy)]
pub enum DataSource<'a> {
    Synthetic,
    External {
        fetcher: &'a dyn CandleFetcher,
        /// Replace a failed fetch by synthetic data instead of returning the fault.
        fallback: bool,
    },
}

/// How a returned series was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Synthetic,
    External,
    /// The fetcher failed and synthetic data was substituted.
    SyntheticFallback,
}

/// Outcome of a candle request. `NoData` is a valid empty answer, not a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Candles {
    Series { series: Series, origin: Origin },
    NoData,
}

impl Candles {
    fn from_series(series: Series, origin: Origin) -> Self {
        if series.is_empty() {
            Self::NoData
        } else {
            Self::Series { series, origin }
        }
    }

    pub fn series(&self) -> Option<&Series> {
        match self {
            Self::Series { series, .. } => Some(series),
            Self::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Loads candles for `symbol` at `timeframe` over `range` from `source`.
///
/// ### Errors
/// `UnknownTimeframe` for an unsupported token, `Fetch` when the external
/// fetcher fails without fallback, `GenerationFault` when synthesis fails.
pub fn get_candles(symbol: &str, timeframe: &str, range: DateRange, source: DataSource<'_>) -> Result<Candles> {
    let spec = TimeframeSpec::lookup(timeframe)?;
    match source {
        DataSource::Synthetic => synthetic(symbol, spec, range, Origin::Synthetic),
        DataSource::External { fetcher, fallback } => {
            let range = spec.effective_range(range);
            match fetcher.fetch(symbol, spec, range) {
                Ok(series) => {
                    info!(symbol, timeframe = spec.token, candles = series.len(), "external candles fetched");
                    Ok(Candles::from_series(series, Origin::External))
                }
                Err(e) if fallback => {
                    warn!(symbol, timeframe = spec.token, error = %e, "fetch failed, using synthetic fallback");
                    synthetic(symbol, spec, range, Origin::SyntheticFallback)
                }
                Err(e) => Err(e),
            }
        }
    }
}

fn synthetic(symbol: &str, spec: &TimeframeSpec, range: DateRange, origin: Origin) -> Result<Candles> {
    let timestamps = spec.sessions(range);
    if timestamps.is_empty() {
        debug!(symbol, timeframe = spec.token, "no sessions, no data");
        return Ok(Candles::NoData);
    }
    let series = PricePathSynthesizer::default().synthesize(symbol, &timestamps, AssetClass::infer(symbol))?;
    info!(symbol, timeframe = spec.token, candles = series.len(), "synthetic candles generated");
    Ok(Candles::from_series(series, origin))
}

/// Symbol, timeframe token, range and provider id (`None` for synthetic data).
type CacheKey = (String, &'static str, DateRange, Option<String>);

/// Read-through cache in front of [`get_candles`].
///
/// Entries are keyed by symbol, timeframe, range and [`CandleFetcher::source_id`].
/// Faults and fallback series are never cached.
#[derive(Default)]
pub struct CachedSource {
    entries: Mutex<HashMap<CacheKey, Candles>>,
}

impl CachedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_candles(&self, symbol: &str, timeframe: &str, range: DateRange, source: DataSource<'_>) -> Result<Candles> {
        let spec = TimeframeSpec::lookup(timeframe)?;
        let key = (
            symbol.to_string(),
            spec.token,
            range,
            match source {
                DataSource::Synthetic => None,
                DataSource::External { fetcher, .. } => Some(fetcher.source_id().to_string()),
            },
        );

        if let Some(hit) = self.lock()?.get(&key) {
            debug!(symbol, timeframe = spec.token, "candle cache hit");
            return Ok(hit.clone());
        }

        debug!(symbol, timeframe = spec.token, "candle cache miss");
        let candles = get_candles(symbol, timeframe, range, source)?;
        // a substituted series is not what the fetcher would answer next time
        let cacheable = !matches!(
            candles,
            Candles::Series {
                origin: Origin::SyntheticFallback,
                ..
            }
        );
        if cacheable {
            self.lock()?.insert(key, candles.clone());
        }
        Ok(candles)
    }

    /// Number of cached answers.
    ///
    /// ### Errors
    /// `Mutex` when a panic poisoned the cache.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CacheKey, Candles>>> {
        self.entries.lock().map_err(|e| Error::Mutex(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::synthesize;
    use chrono::NaiveDate;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    struct Failing;

    impl CandleFetcher for Failing {
        fn fetch(&self, symbol: &str, _: &TimeframeSpec, _: DateRange) -> Result<Series> {
            Err(Error::Fetch {
                symbol: symbol.to_string(),
                reason: "provider unreachable".to_string(),
            })
        }
    }

    struct Empty;

    impl CandleFetcher for Empty {
        fn fetch(&self, _: &str, _: &TimeframeSpec, _: DateRange) -> Result<Series> {
            Ok(Series::empty())
        }
    }

    /// Serves synthetic candles of `seed` under its own provider id.
    struct Provider {
        id: &'static str,
        seed: &'static str,
    }

    impl CandleFetcher for Provider {
        fn fetch(&self, _: &str, timeframe: &TimeframeSpec, range: DateRange) -> Result<Series> {
            synthesize(self.seed, &timeframe.sessions(range), AssetClass::Equity)
        }

        fn source_id(&self) -> &str {
            self.id
        }
    }

    fn range(from: (i32, u32, u32), to: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn synthetic_series() {
        let candles = get_candles("AAPL", "1d", range((2023, 1, 2), (2023, 1, 8)), DataSource::Synthetic).unwrap();
        assert_eq!(candles.series().unwrap().len(), 5);
    }

    #[test]
    fn weekend_is_no_data() {
        let candles = get_candles("AAPL", "1h", range((2023, 1, 7), (2023, 1, 8)), DataSource::Synthetic).unwrap();
        assert!(candles.is_no_data());
    }

    #[test]
    fn fetch_fault_is_not_no_data() {
        let source = DataSource::External {
            fetcher: &Failing,
            fallback: false,
        };
        let result = get_candles("NQ", "1d", range((2023, 1, 2), (2023, 1, 8)), source);
        assert!(matches!(result, Err(Error::Fetch { .. })));
    }

    #[test]
    fn fetch_fault_falls_back() {
        let source = DataSource::External {
            fetcher: &Failing,
            fallback: true,
        };
        let candles = get_candles("NQ", "1d", range((2023, 1, 2), (2023, 1, 8)), source).unwrap();
        assert!(matches!(
            candles,
            Candles::Series {
                origin: Origin::SyntheticFallback,
                ..
            }
        ));
    }

    #[test]
    fn empty_fetch_is_no_data() {
        let source = DataSource::External {
            fetcher: &Empty,
            fallback: true,
        };
        let candles = get_candles("NQ", "1d", range((2023, 1, 2), (2023, 1, 8)), source).unwrap();
        assert!(candles.is_no_data());
    }

    #[test]
    fn cache_reads_through() {
        let cache = CachedSource::new();
        let r = range((2023, 1, 2), (2023, 1, 8));
        let a = cache.get_candles("MSFT", "1d", r, DataSource::Synthetic).unwrap();
        let b = cache.get_candles("MSFT", "1d", r, DataSource::Synthetic).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len().unwrap(), 1);

        let fallback = DataSource::External {
            fetcher: &Failing,
            fallback: true,
        };
        cache.get_candles("MSFT", "1d", r, fallback).unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn cache_keeps_providers_apart() {
        let cache = CachedSource::new();
        let r = range((2023, 1, 2), (2023, 1, 8));
        let (primary, backup) = (
            Provider { id: "primary", seed: "AAA" },
            Provider { id: "backup", seed: "ZZZ" },
        );
        let from = |fetcher: &Provider| {
            let source = DataSource::External { fetcher, fallback: false };
            cache.get_candles("MSFT", "1d", r, source).unwrap()
        };
        let a = from(&primary);
        let b = from(&backup);
        assert_ne!(a, b);
        assert_eq!(from(&primary), a);
        assert_eq!(cache.len().unwrap(), 2);
        assert_ne!(Failing.source_id(), Empty.source_id());
    }

    #[test]
    fn poisoned_cache_reports_mutex_error() {
        let cache = CachedSource::new();
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.entries.lock().unwrap();
            panic!("poison the cache");
        }));
        assert!(matches!(cache.len(), Err(Error::Mutex(_))));
        assert!(matches!(cache.is_empty(), Err(Error::Mutex(_))));
        let r = range((2023, 1, 2), (2023, 1, 8));
        assert!(cache.get_candles("MSFT", "1d", r, DataSource::Synthetic).is_err());
    }
}
