//! Explicit inputs that would otherwise come from ambient state: the
//! reference date ("today"), the traveler's nationality, and per-country
//! visa-type selections.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{parse_date, today_utc};
use crate::error::Result;
use crate::stay::normalize_code;

/// Remaining-day cutoffs that classify a status as warning or critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusThresholds {
    /// At or below this many remaining days the status is a warning.
    pub warning_days: i64,
    /// At or below this many remaining days the status is critical.
    pub critical_days: i64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            warning_days: 14,
            critical_days: 7,
        }
    }
}

/// Everything an evaluation depends on besides stays and rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    /// The day evaluations are made "as of". Ongoing stays end here.
    pub reference_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    /// Country code -> visa type, overriding whatever the stays carry.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub visa_types: BTreeMap<String, String>,
    #[serde(default)]
    pub thresholds: StatusThresholds,
}

impl EvaluationContext {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            nationality: None,
            visa_types: BTreeMap::new(),
            thresholds: StatusThresholds::default(),
        }
    }

    pub fn with_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = Some(normalize_code(&nationality.into()));
        self
    }

    pub fn with_visa_type(mut self, country_code: &str, visa_type: impl Into<String>) -> Self {
        self.visa_types
            .insert(normalize_code(country_code), visa_type.into());
        self
    }

    pub fn with_thresholds(mut self, thresholds: StatusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Visa type explicitly selected for a country, if any.
    pub fn visa_type_for(&self, country_code: &str) -> Option<&str> {
        self.visa_types
            .get(&normalize_code(country_code))
            .map(String::as_str)
    }
}

/// Context as it arrives over a JSON boundary: the date is a string in any
/// form [`parse_date`] accepts, and codes may be in any case.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextInput {
    reference_date: String,
    #[serde(default)]
    nationality: Option<String>,
    #[serde(default)]
    visa_types: BTreeMap<String, String>,
    #[serde(default)]
    thresholds: Option<StatusThresholds>,
}

impl EvaluationContext {
    /// Parse a context object. `referenceDate` is required; country and
    /// nationality codes are normalized.
    pub fn from_json(json: &str) -> Result<Self> {
        let input: ContextInput = serde_json::from_str(json)?;
        let mut ctx = Self::new(parse_date(&input.reference_date)?);
        if let Some(nationality) = input.nationality.filter(|n| !n.trim().is_empty()) {
            ctx = ctx.with_nationality(nationality);
        }
        for (country, visa_type) in input.visa_types {
            ctx = ctx.with_visa_type(&country, visa_type);
        }
        if let Some(thresholds) = input.thresholds {
            ctx = ctx.with_thresholds(thresholds);
        }
        Ok(ctx)
    }
}

/// Evaluates as of today in UTC. This is the only place the clock is read.
impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new(today_utc())
    }
}
