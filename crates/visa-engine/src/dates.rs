//! Calendar-day arithmetic for stay intervals.
//!
//! Every interval here is a closed range of calendar days: a stay from
//! 2024-01-01 to 2024-01-01 lasts one day. There is no time-of-day component;
//! datetime strings are truncated to their date part on parse.
//!
//! Nothing in this module reads the system clock except [`today_utc`] and
//! [`today_in`], which exist for the application edge (CLI, WASM) to build an
//! [`EvaluationContext`](crate::context::EvaluationContext).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VisaError};
use crate::stay::Stay;

/// A closed interval of calendar days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    /// Build an interval, or `None` if `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// A one-day interval.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of calendar days covered, counting both endpoints.
    pub fn days(&self) -> i64 {
        days_between_inclusive(self.start, self.end)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Overlapping sub-interval, or `None` when the two are disjoint.
    pub fn intersect(&self, other: &DateInterval) -> Option<DateInterval> {
        intersect(self, other)
    }
}

/// Parse a stored date string into a calendar date.
///
/// Accepts plain ISO dates (`2024-03-01`), RFC 3339 datetimes
/// (`2024-03-01T10:00:00Z`), and naive datetimes (`2024-03-01T10:00:00`).
/// Only the calendar-date part is kept.
///
/// # Errors
/// Returns [`VisaError::InvalidDate`] if none of the formats match.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.date())
        .map_err(|_| VisaError::InvalidDate(s.to_string()))
}

/// Format a date the way stays store it (`YYYY-MM-DD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Number of calendar days spanned by `[start, end]`, inclusive of both ends.
///
/// Returns 1 when `start == end` and 0 when `end < start`. Callers treat 0 as
/// "could not compute", never as a legitimate stay length.
pub fn days_between_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return 0;
    }
    end.signed_duration_since(start).num_days() + 1
}

/// String form of [`days_between_inclusive`]: 0 if either date is unparseable.
pub fn days_between_inclusive_str(start: &str, end: &str) -> i64 {
    match (parse_date(start), parse_date(end)) {
        (Ok(s), Ok(e)) => days_between_inclusive(s, e),
        _ => 0,
    }
}

/// The day a stay stops counting: its exit date if present and valid,
/// otherwise the reference date.
pub fn effective_end(stay: &Stay, reference: NaiveDate) -> NaiveDate {
    stay.exit_date
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| parse_date(s).ok())
        .unwrap_or(reference)
}

/// Overlap of two closed intervals, or `None` if they share no day.
pub fn intersect(a: &DateInterval, b: &DateInterval) -> Option<DateInterval> {
    DateInterval::new(a.start.max(b.start), a.end.min(b.end))
}

/// Shift a date by a signed number of days, saturating at chrono's range.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Today's date in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Today's date in the given IANA timezone (e.g., `"Asia/Seoul"`).
///
/// # Errors
/// Returns [`VisaError::InvalidTimezone`] if the name is not a known IANA zone.
pub fn today_in(timezone: &str) -> Result<NaiveDate> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| VisaError::InvalidTimezone(timezone.to_string()))?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

