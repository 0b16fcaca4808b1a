//! Trading calendar.
//!
//! Maps a timeframe token and a date range to the ordered session timestamps the
//! series will be sampled at. Each timeframe is a row of [`TIMEFRAMES`] carrying its
//! sampling rule and lookback bound as data.

mod timeframe;

use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub use timeframe::*;

/// Inclusive range of exchange-local calendar dates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawRange"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

/// Unchecked wire form of [`DateRange`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[cfg(feature = "serde")]
impl TryFrom<RawRange> for DateRange {
    type Error = Error;

    fn try_from(raw: RawRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar dates ending at `end`, both ends included.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let back = Days::new(u64::from(days.saturating_sub(1)));
        Self {
            start: end.checked_sub_days(back).unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar dates covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Ordered session timestamps for `timeframe` between `start` and `end` (inclusive dates).
///
/// An empty vector means no session falls in the range; it is not an error.
pub fn session_timestamps(timeframe: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDateTime>> {
    let spec = TimeframeSpec::lookup(timeframe)?;
    let range = DateRange::new(start, end)?;
    let effective = spec.effective_range(range);
    if effective != range {
        debug!(
            timeframe = spec.token,
            requested_start = %range.start(),
            start = %effective.start(),
            "lookback bound applied"
        );
    }

    let timestamps = spec.sessions(range);
    if timestamps.is_empty() {
        debug!(timeframe = spec.token, %start, %end, "no sessions in range");
    }
    Ok(timestamps)
}
