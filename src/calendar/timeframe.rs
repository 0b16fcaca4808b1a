use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use super::DateRange;
use crate::errors::{Error, Result};

/// Exchange session window, in minutes after local midnight.
pub const SESSION_OPEN: u32 = 9 * 60 + 30;
pub const SESSION_CLOSE: u32 = 16 * 60;

/// How a timeframe picks its timestamps inside a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Every multiple of `minutes` after midnight inside the session, preceded by the session open.
    Grid { minutes: u32 },
    /// Fixed `(hour, minute)` slots per session day.
    Anchors(&'static [(u32, u32)]),
    /// Monday to Friday, at midnight.
    BusinessDays,
    /// One timestamp per week on the given weekday.
    Weekly(Weekday),
    /// The last business day of each month.
    MonthEnd,
}

/// Bound applied to the requested range, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// Ranges longer than this are clamped to their most recent days.
    Max(u32),
    /// Ranges shorter than this are extended backward.
    Min(u32),
    Unbounded,
}

/// One row of the timeframe table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeSpec {
    pub token: &'static str,
    pub aliases: &'static [&'static str],
    pub sampling: Sampling,
    pub lookback: Lookback,
    pub default_lookback_days: u32,
}

const FOUR_HOUR_ANCHORS: &[(u32, u32)] = &[(9, 30), (13, 30)];

const fn grid(token: &'static str, minutes: u32, max_days: u32) -> TimeframeSpec {
    TimeframeSpec {
        token,
        aliases: &[],
        sampling: Sampling::Grid { minutes },
        lookback: Lookback::Max(max_days),
        default_lookback_days: max_days,
    }
}

/// All supported timeframes, finest first.
pub static TIMEFRAMES: &[TimeframeSpec] = &[
    grid("1m", 1, 7),
    grid("2m", 2, 10),
    grid("3m", 3, 12),
    grid("5m", 5, 15),
    grid("15m", 15, 20),
    grid("30m", 30, 25),
    TimeframeSpec {
        aliases: &["60m"],
        ..grid("1h", 60, 30)
    },
    TimeframeSpec {
        token: "4h",
        aliases: &[],
        sampling: Sampling::Anchors(FOUR_HOUR_ANCHORS),
        lookback: Lookback::Max(60),
        default_lookback_days: 60,
    },
    TimeframeSpec {
        token: "1d",
        aliases: &[],
        sampling: Sampling::BusinessDays,
        lookback: Lookback::Unbounded,
        default_lookback_days: 180,
    },
    TimeframeSpec {
        token: "1w",
        aliases: &["1wk"],
        sampling: Sampling::Weekly(Weekday::Fri),
        lookback: Lookback::Min(365),
        default_lookback_days: 365,
    },
    TimeframeSpec {
        token: "1mo",
        aliases: &[],
        sampling: Sampling::MonthEnd,
        lookback: Lookback::Min(730),
        default_lookback_days: 730,
    },
];

impl TimeframeSpec {
    /// Looks up a token or one of its aliases.
    pub fn lookup(token: &str) -> Result<&'static TimeframeSpec> {
        TIMEFRAMES
            .iter()
            .find(|spec| spec.token == token || spec.aliases.contains(&token))
            .ok_or_else(|| Error::UnknownTimeframe(token.to_string()))
    }

    /// Whether timestamps are filtered to the exchange session.
    pub fn is_intraday(&self) -> bool {
        matches!(self.sampling, Sampling::Grid { .. } | Sampling::Anchors(_))
    }

    /// The window the dashboard shows when no range is given.
    pub fn default_range(&self, end: NaiveDate) -> DateRange {
        DateRange::trailing(end, self.default_lookback_days)
    }

    /// Applies the lookback bound to `range`. The end date never moves.
    pub fn effective_range(&self, range: DateRange) -> DateRange {
        match self.lookback {
            Lookback::Max(days) if range.days() > i64::from(days) => DateRange::trailing(range.end(), days),
            Lookback::Min(days) if range.days() < i64::from(days) => DateRange::trailing(range.end(), days),
            _ => range,
        }
    }

    /// Times of day sampled within one session, in order.
    pub fn session_slots(&self) -> Vec<NaiveTime> {
        let minutes = match self.sampling {
            Sampling::Grid { minutes } if minutes > 0 => {
                let first = (SESSION_OPEN / minutes + 1) * minutes;
                std::iter::once(SESSION_OPEN)
                    .chain((first..SESSION_CLOSE).step_by(minutes as usize))
                    .collect::<Vec<_>>()
            }
            Sampling::Anchors(anchors) => anchors
                .iter()
                .map(|(hour, minute)| hour * 60 + minute)
                .filter(|m| (SESSION_OPEN..SESSION_CLOSE).contains(m))
                .collect(),
            _ => Vec::new(),
        };
        minutes
            .into_iter()
            .filter_map(|m| NaiveTime::from_hms_opt(m / 60, m % 60, 0))
            .collect()
    }

    /// Ordered session timestamps inside `range` once the lookback bound is applied.
    pub fn sessions(&self, range: DateRange) -> Vec<NaiveDateTime> {
        let range = self.effective_range(range);
        let midnight = NaiveTime::MIN;

        match self.sampling {
            Sampling::Grid { .. } | Sampling::Anchors(_) => {
                let slots = self.session_slots();
                range
                    .dates()
                    .filter(|d| is_business_day(*d))
                    .flat_map(|d| slots.iter().map(move |t| d.and_time(*t)))
                    .collect()
            }
            Sampling::BusinessDays => range
                .dates()
                .filter(|d| is_business_day(*d))
                .map(|d| d.and_time(midnight))
                .collect(),
            Sampling::Weekly(weekday) => range
                .dates()
                .filter(|d| d.weekday() == weekday)
                .map(|d| d.and_time(midnight))
                .collect(),
            Sampling::MonthEnd => range
                .dates()
                .filter(|d| is_last_business_day(*d))
                .map(|d| d.and_time(midnight))
                .collect(),
        }
    }
}

pub(crate) fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_last_business_day(date: NaiveDate) -> bool {
    if !is_business_day(date) {
        return false;
    }
    let mut next = date;
    loop {
        match next.succ_opt() {
            Some(d) => next = d,
            None => return true,
        }
        if is_business_day(next) {
            return next.month() != date.month();
        }
    }
}
