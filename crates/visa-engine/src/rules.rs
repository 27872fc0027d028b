//! Visa rules and the lookup that resolves which one applies.
//!
//! A [`VisaRule`] is keyed by country. Rules that also name a `visa_type` or a
//! `nationality` are overrides of that country's default. Resolution picks the
//! most specific matching rule:
//!
//! 1. visa-type match
//! 2. nationality match
//! 3. country default
//!
//! Anything implementing [`RuleLookup`] can feed the engine: a [`RuleTable`], a
//! plain slice of rules, or a closure.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::{add_days, DateInterval};
use crate::error::Result;
use crate::stay::normalize_code;

/// When the day allowance starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetType {
    /// Only the current uninterrupted stay counts; leaving resets the allowance.
    #[default]
    Exit,
    /// Days inside a trailing window of `period_days` ending on the reference date.
    Rolling,
    /// Days inside the current fixed calendar period.
    Calendar,
}

/// Fixed period boundary for [`ResetType::Calendar`] rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPeriod {
    #[default]
    Year,
    HalfYear,
    Quarter,
    Month,
}

impl CalendarPeriod {
    fn months(self) -> u32 {
        match self {
            CalendarPeriod::Year => 12,
            CalendarPeriod::HalfYear => 6,
            CalendarPeriod::Quarter => 3,
            CalendarPeriod::Month => 1,
        }
    }

    /// The period containing `day`, e.g. Jan 1 - Dec 31 for `Year`.
    pub fn bounds(self, day: NaiveDate) -> Option<DateInterval> {
        let len = self.months();
        let start_month = (day.month0() / len) * len + 1;
        let start = NaiveDate::from_ymd_opt(day.year(), start_month, 1)?;
        let next = if start_month + len > 12 {
            NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(day.year(), start_month + len, 1)?
        };
        DateInterval::new(start, add_days(next, -1))
    }
}

/// Day-count policy for one country, optionally narrowed to a visa type or
/// traveler nationality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaRule {
    pub country_code: String,
    /// Maximum days permitted within the accounting period.
    pub max_days: u32,
    /// Window length for rolling rules. Ignored otherwise.
    #[serde(default)]
    pub period_days: u32,
    #[serde(default)]
    pub reset_type: ResetType,
    #[serde(default)]
    pub calendar_period: CalendarPeriod,
    /// Extra days obtainable by extension. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl VisaRule {
    /// Allowance that resets when the traveler leaves.
    pub fn exit(country_code: impl Into<String>, max_days: u32) -> Self {
        Self {
            country_code: country_code.into(),
            max_days,
            period_days: 0,
            reset_type: ResetType::Exit,
            calendar_period: CalendarPeriod::Year,
            extension_days: None,
            visa_type: None,
            nationality: None,
        }
    }

    /// `max_days` within any trailing `period_days` window.
    pub fn rolling(country_code: impl Into<String>, max_days: u32, period_days: u32) -> Self {
        Self {
            period_days,
            reset_type: ResetType::Rolling,
            ..Self::exit(country_code, max_days)
        }
    }

    /// `max_days` per fixed calendar period.
    pub fn calendar(country_code: impl Into<String>, max_days: u32, period: CalendarPeriod) -> Self {
        Self {
            reset_type: ResetType::Calendar,
            calendar_period: period,
            ..Self::exit(country_code, max_days)
        }
    }

    pub fn for_visa_type(mut self, visa_type: impl Into<String>) -> Self {
        self.visa_type = Some(visa_type.into());
        self
    }

    pub fn for_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = Some(nationality.into());
        self
    }

    pub fn with_extension(mut self, days: u32) -> Self {
        self.extension_days = Some(days);
        self
    }

    /// `max_days` plus any extension. Never applied automatically.
    pub fn max_days_with_extension(&self) -> u32 {
        self.max_days.saturating_add(self.extension_days.unwrap_or(0))
    }

    /// Which kind of entry this is in an override table.
    pub fn source(&self) -> RuleSource {
        if self.visa_type.is_some() {
            RuleSource::VisaType
        } else if self.nationality.is_some() {
            RuleSource::Nationality
        } else {
            RuleSource::CountryDefault
        }
    }

    /// Whether this rule applies to the query, ignoring precedence.
    fn matches(&self, country_code: &str, visa_type: Option<&str>, nationality: Option<&str>) -> bool {
        normalize_code(&self.country_code) == country_code
            && qualifier_matches(self.visa_type.as_deref(), visa_type)
            && qualifier_matches(self.nationality.as_deref(), nationality)
    }

    /// Higher is more specific: visa type outranks nationality outranks default.
    fn specificity(&self) -> (bool, bool) {
        (self.visa_type.is_some(), self.nationality.is_some())
    }
}

/// An unqualified rule matches any query; a qualified one needs an equal value.
fn qualifier_matches(rule_value: Option<&str>, query: Option<&str>) -> bool {
    match (rule_value, query) {
        (None, _) => true,
        (Some(r), Some(q)) => r.trim().eq_ignore_ascii_case(q.trim()),
        (Some(_), None) => false,
    }
}

/// How the applied rule was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    VisaType,
    Nationality,
    CountryDefault,
    /// No rule exists for the country.
    Unknown,
}

/// A rule together with the reason it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRule {
    pub rule: VisaRule,
    pub source: RuleSource,
}

/// Resolves the rule for a country, visa type, and nationality.
pub trait RuleLookup {
    fn rule_for(
        &self,
        country_code: &str,
        visa_type: Option<&str>,
        nationality: Option<&str>,
    ) -> Option<ResolvedRule>;
}

/// Pick the most specific matching rule; earlier rules win ties.
fn resolve<'a>(
    rules: impl IntoIterator<Item = &'a VisaRule>,
    country_code: &str,
    visa_type: Option<&str>,
    nationality: Option<&str>,
) -> Option<ResolvedRule> {
    let country = normalize_code(country_code);
    let mut best: Option<&VisaRule> = None;
    for rule in rules {
        if !rule.matches(&country, visa_type, nationality) {
            continue;
        }
        if best.is_none_or(|b| rule.specificity() > b.specificity()) {
            best = Some(rule);
        }
    }
    best.map(|rule| ResolvedRule {
        rule: rule.clone(),
        source: rule.source(),
    })
}

impl RuleLookup for [VisaRule] {
    fn rule_for(
        &self,
        country_code: &str,
        visa_type: Option<&str>,
        nationality: Option<&str>,
    ) -> Option<ResolvedRule> {
        resolve(self, country_code, visa_type, nationality)
    }
}

impl RuleLookup for Vec<VisaRule> {
    fn rule_for(
        &self,
        country_code: &str,
        visa_type: Option<&str>,
        nationality: Option<&str>,
    ) -> Option<ResolvedRule> {
        resolve(self, country_code, visa_type, nationality)
    }
}

impl<F> RuleLookup for F
where
    F: Fn(&str, Option<&str>, Option<&str>) -> Option<VisaRule>,
{
    fn rule_for(
        &self,
        country_code: &str,
        visa_type: Option<&str>,
        nationality: Option<&str>,
    ) -> Option<ResolvedRule> {
        self(country_code, visa_type, nationality).map(|rule| ResolvedRule {
            source: rule.source(),
            rule,
        })
    }
}

const BUILTIN_RULES: &str = include_str!("../data/rules.json");

/// Rules grouped by normalized country code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    by_country: BTreeMap<String, Vec<VisaRule>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = VisaRule>) -> Self {
        let mut table = Self::new();
        for rule in rules {
            table.insert(rule);
        }
        table
    }

    /// Load a table from a JSON array of rules.
    ///
    /// # Errors
    /// Returns [`VisaError::Json`](crate::error::VisaError::Json) if the payload
    /// is not an array of rule objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Vec<VisaRule> = serde_json::from_str(json)?;
        Ok(Self::from_rules(rules))
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        // Parse failures are caught by tests/rules_tests.rs.
        Self::from_json(BUILTIN_RULES).unwrap_or_default()
    }

    pub fn insert(&mut self, rule: VisaRule) {
        self.by_country
            .entry(normalize_code(&rule.country_code))
            .or_default()
            .push(rule);
    }

    /// Every rule for one country, default and overrides alike.
    pub fn rules_for_country(&self, country_code: &str) -> &[VisaRule] {
        self.by_country
            .get(&normalize_code(country_code))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.by_country.keys().map(String::as_str)
    }

    /// Total number of rules, overrides included.
    pub fn len(&self) -> usize {
        self.by_country.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_country.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VisaRule> {
        self.by_country.values().flatten()
    }
}

impl RuleLookup for RuleTable {
    fn rule_for(
        &self,
        country_code: &str,
        visa_type: Option<&str>,
        nationality: Option<&str>,
    ) -> Option<ResolvedRule> {
        resolve(
            self.rules_for_country(country_code),
            country_code,
            visa_type,
            nationality,
        )
    }
}
