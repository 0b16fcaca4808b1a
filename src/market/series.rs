use std::sync::Arc;

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Candle;
use crate::errors::{Error, Result};

/// An immutable, strictly time-ordered run of candles.
///
/// Cloning is cheap: the candles are shared.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Candle>", into = "Vec<Candle>"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    candles: Arc<[Candle]>,
}

impl Series {
    /// Wraps `candles`, rejecting duplicated or out-of-order timestamps.
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        if let Some(index) = candles
            .windows(2)
            .position(|pair| pair[1].timestamp() <= pair[0].timestamp())
        {
            return Err(Error::UnorderedTimestamps { index: index + 1 });
        }
        Ok(Self {
            candles: candles.into(),
        })
    }

    pub fn empty() -> Self {
        Self {
            candles: Arc::from(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// First and last timestamps, if any.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.first()?.timestamp(), self.last()?.timestamp()))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.candles.iter().map(Candle::timestamp)
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.candles.iter().map(Candle::close)
    }
}

impl Default for Series {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Vec<Candle>> for Series {
    type Error = Error;

    fn try_from(candles: Vec<Candle>) -> Result<Self> {
        Self::new(candles)
    }
}

impl From<Series> for Vec<Candle> {
    fn from(series: Series) -> Self {
        series.candles.to_vec()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::CandleBuilder;
    use chrono::{Duration, NaiveDate};

    fn candle(minutes: i64) -> Candle {
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap().and_hms_opt(9, 30, 0).unwrap();
        CandleBuilder::builder()
            .timestamp(base + Duration::minutes(minutes))
            .open(10.0)
            .high(11.0)
            .low(9.0)
            .close(10.5)
            .volume(100.0)
            .build()
            .unwrap()
    }

    #[test]
    fn accepts_increasing_timestamps() {
        let series = Series::new(vec![candle(0), candle(1), candle(2)]).unwrap();
        assert_eq!(series.len(), 3);
        let (first, last) = series.time_span().unwrap();
        assert!(first < last);
    }

    #[test]
    fn rejects_duplicates() {
        let result = Series::new(vec![candle(0), candle(1), candle(1)]);
        assert!(matches!(result, Err(Error::UnorderedTimestamps { index: 2 })));
    }

    #[test]
    fn rejects_decreasing() {
        let result = Series::new(vec![candle(5), candle(1)]);
        assert!(matches!(result, Err(Error::UnorderedTimestamps { index: 1 })));
    }

    #[test]
    fn empty_series_has_no_span() {
        assert!(Series::empty().time_span().is_none());
        assert!(Series::new(Vec::new()).unwrap().is_empty());
    }
}
