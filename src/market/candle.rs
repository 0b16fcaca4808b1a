use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One OHLCV observation for a time bucket, stamped in exchange-local time.
///
/// A candle can only be obtained through [`CandleBuilder`], which enforces
/// `low <= min(open, close)` and `high >= max(open, close)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "CandleBuilder"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    timestamp: NaiveDateTime,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Candle {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Whether the session closed at or above its open.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

impl ta::Open for Candle {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Candle {
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Builder for [`Candle`], also the shape candles are deserialized from.
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[derive(Debug, Default)]
pub struct CandleBuilder {
    timestamp: Option<NaiveDateTime>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CandleBuilder {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validates the fields and returns the candle.
    pub fn build(self) -> Result<Candle> {
        let missing = |field: &str| Error::InvalidCandle(format!("missing {field}"));
        let timestamp = self.timestamp.ok_or_else(|| missing("timestamp"))?;
        let open = self.open.ok_or_else(|| missing("open"))?;
        let high = self.high.ok_or_else(|| missing("high"))?;
        let low = self.low.ok_or_else(|| missing("low"))?;
        let close = self.close.ok_or_else(|| missing("close"))?;
        let volume = self.volume.ok_or_else(|| missing("volume"))?;

        for (name, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidCandle(format!("{name} must be positive (got: {price})")));
            }
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(Error::InvalidCandle(format!("volume must be non-negative (got: {volume})")));
        }
        if low > open.min(close) {
            return Err(Error::InvalidCandle(format!("low {low} above body at {timestamp}")));
        }
        if high < open.max(close) {
            return Err(Error::InvalidCandle(format!("high {high} below body at {timestamp}")));
        }

        Ok(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

impl TryFrom<CandleBuilder> for Candle {
    type Error = Error;

    fn try_from(builder: CandleBuilder) -> Result<Self> {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    #[test]
    fn build_valid_candle() {
        let candle = CandleBuilder::builder()
            .timestamp(at())
            .open(100.0)
            .high(110.0)
            .low(95.0)
            .close(105.0)
            .volume(1.0)
            .build()
            .unwrap();
        assert!(candle.is_up());
        assert_eq!(candle.high(), 110.0);
    }

    #[test]
    fn reject_high_below_body() {
        let result = CandleBuilder::builder()
            .timestamp(at())
            .open(100.0)
            .high(101.0)
            .low(95.0)
            .close(105.0)
            .volume(1.0)
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle(_))));
    }

    #[test]
    fn reject_non_positive_price() {
        let result = CandleBuilder::builder()
            .timestamp(at())
            .open(0.0)
            .high(1.0)
            .low(0.0)
            .close(1.0)
            .volume(1.0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn reject_missing_field() {
        let result = CandleBuilder::builder().open(1.0).build();
        assert!(matches!(result, Err(Error::InvalidCandle(reason)) if reason.contains("timestamp")));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_validates_like_the_builder() {
        let valid = r#"{"timestamp":"2023-01-02T09:30:00","open":100.0,"high":110.0,"low":95.0,"close":105.0,"volume":1.0}"#;
        let candle: Candle = serde_json::from_str(valid).unwrap();
        assert_eq!(candle.timestamp(), at());
        assert_eq!(serde_json::to_string(&candle).unwrap(), valid);

        let inverted = r#"{"timestamp":"2023-01-02T09:30:00","open":100.0,"high":90.0,"low":120.0,"close":-5.0,"volume":-1.0}"#;
        assert!(serde_json::from_str::<Candle>(inverted).is_err());
        let missing = r#"{"timestamp":"2023-01-02T09:30:00","open":100.0}"#;
        assert!(serde_json::from_str::<Candle>(missing).is_err());
        let series = format!("[{inverted}]");
        assert!(serde_json::from_str::<crate::market::Series>(&series).is_err());
    }
}
