//! Stay records and their validated, date-parsed view.
//!
//! A [`Stay`] is the stored record exactly as the application persists it: dates
//! are ISO strings and required fields may be missing. The engine never trusts
//! it directly. [`Stay::validate`] turns it into a [`StayInterval`] or a
//! [`SkipReason`], and skipped records are collected into [`Diagnostics`]
//! instead of failing the whole computation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dates::{parse_date, DateInterval};
use crate::error::{Result, VisaError};

/// A single border-crossing record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stay {
    /// Opaque identifier assigned by the store.
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    /// Destination country code (ISO alpha-2 style).
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_country: Option<String>,
    /// ISO date the traveler entered.
    #[serde(default, deserialize_with = "lenient_string")]
    pub entry_date: String,
    /// ISO date the traveler left; `None` while the stay is ongoing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_city: Option<String>,
    /// Visa variant tag (e.g., "visa-free", "long-term-resident").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Accept strings, numbers, or null for fields the store may type loosely.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

impl Stay {
    /// A stay with the required fields set and everything else empty.
    pub fn new(
        id: impl Into<String>,
        country_code: impl Into<String>,
        entry_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            country_code: country_code.into(),
            entry_date: entry_date.into(),
            ..Default::default()
        }
    }

    pub fn with_exit(mut self, exit_date: impl Into<String>) -> Self {
        self.exit_date = Some(exit_date.into());
        self
    }

    pub fn with_visa_type(mut self, visa_type: impl Into<String>) -> Self {
        self.visa_type = Some(visa_type.into());
        self
    }

    /// Country code upper-cased and trimmed, the form rules are keyed by.
    pub fn normalized_country(&self) -> String {
        normalize_code(&self.country_code)
    }

    /// True when no exit has been recorded (an empty string counts as absent).
    pub fn is_ongoing(&self) -> bool {
        self.exit_date
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    }

    /// Check required fields and parse dates against `reference`.
    ///
    /// An ongoing stay that begins after `reference` validates but has no
    /// effective interval: the traveler has not arrived yet.
    pub fn validate(&self, reference: NaiveDate) -> std::result::Result<StayInterval<'_>, SkipReason> {
        if self.id.trim().is_empty() {
            return Err(SkipReason::MissingId);
        }
        if self.country_code.trim().is_empty() {
            return Err(SkipReason::MissingCountry);
        }
        if self.entry_date.trim().is_empty() {
            return Err(SkipReason::MissingEntryDate);
        }
        let entry = parse_date(&self.entry_date).map_err(|_| SkipReason::InvalidEntryDate)?;

        let exit = if self.is_ongoing() {
            None
        } else {
            let raw = self.exit_date.as_deref().unwrap_or_default();
            Some(parse_date(raw).map_err(|_| SkipReason::InvalidExitDate)?)
        };

        let interval = match exit {
            Some(exit) => Some(DateInterval::new(entry, exit).ok_or(SkipReason::ExitBeforeEntry)?),
            None => DateInterval::new(entry, reference),
        };

        Ok(StayInterval {
            stay: self,
            country_code: self.normalized_country(),
            entry,
            exit,
            interval,
        })
    }
}

/// Upper-case and trim a country or nationality code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// A stay whose required fields are present and whose dates parse.
#[derive(Debug, Clone, PartialEq)]
pub struct StayInterval<'a> {
    pub stay: &'a Stay,
    /// Normalized country code.
    pub country_code: String,
    pub entry: NaiveDate,
    /// Recorded exit, `None` while ongoing.
    pub exit: Option<NaiveDate>,
    /// `[entry, exit]`, or `[entry, reference]` for ongoing stays. `None` for an
    /// ongoing stay that starts after the reference date.
    pub interval: Option<DateInterval>,
}

impl StayInterval<'_> {
    /// Both entry and exit are recorded.
    pub fn is_confirmed(&self) -> bool {
        self.exit.is_some()
    }

    /// The part of the stay on or before `reference`, i.e. days already spent.
    pub fn elapsed(&self, reference: NaiveDate) -> Option<DateInterval> {
        let interval = self.interval?;
        DateInterval::new(interval.start, interval.end.min(reference))
    }
}

/// Why a stay was left out of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingId,
    MissingCountry,
    MissingEntryDate,
    InvalidEntryDate,
    InvalidExitDate,
    ExitBeforeEntry,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingId => "missing id",
            SkipReason::MissingCountry => "missing country code",
            SkipReason::MissingEntryDate => "missing entry date",
            SkipReason::InvalidEntryDate => "unparseable entry date",
            SkipReason::InvalidExitDate => "unparseable exit date",
            SkipReason::ExitBeforeEntry => "exit date before entry date",
        };
        f.write_str(text)
    }
}

/// A record excluded from computation, identified by whatever id it carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStay {
    pub id: String,
    pub reason: SkipReason,
}

/// Non-fatal data-quality findings from one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub skipped: Vec<SkippedStay>,
}

impl Diagnostics {
    pub fn record(&mut self, stay: &Stay, reason: SkipReason) {
        tracing::debug!(stay_id = %stay.id, %reason, "skipping stay");
        self.skipped.push(SkippedStay {
            id: stay.id.clone(),
            reason,
        });
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Validate every stay, returning the usable ones and diagnostics for the rest.
pub fn validate_all(stays: &[Stay], reference: NaiveDate) -> (Vec<StayInterval<'_>>, Diagnostics) {
    let mut diagnostics = Diagnostics::default();
    let mut valid = Vec::with_capacity(stays.len());
    for stay in stays {
        match stay.validate(reference) {
            Ok(v) => valid.push(v),
            Err(reason) => diagnostics.record(stay, reason),
        }
    }
    (valid, diagnostics)
}

/// Decode a JSON array of stay records.
///
/// Elements that are not objects are dropped with a warning; objects with
/// missing or malformed fields are kept so later stages can report them.
///
/// # Errors
/// Returns [`VisaError::InvalidInput`] if the payload is not a JSON array, or
/// [`VisaError::Json`] if it is not JSON at all.
pub fn stays_from_json(json: &str) -> Result<Vec<Stay>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(VisaError::InvalidInput(format!(
            "expected a JSON array of stays, found {}",
            json_kind(&value)
        )));
    };

    let mut stays = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Stay>(item) {
            Ok(stay) => stays.push(stay),
            Err(e) => tracing::warn!(index, error = %e, "dropping undecodable stay record"),
        }
    }
    Ok(stays)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
