//! Dashboard aggregation over engine output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conflict::{Conflict, ConflictSeverity};
use crate::engine::{StatusReport, StatusSeverity, VisaStatus};
use crate::rules::RuleSource;

/// One row of the per-country dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySummary {
    pub country_code: String,
    pub days_used: i64,
    pub days_remaining: Option<i64>,
    pub max_days: Option<u32>,
    /// Limit if every available extension were granted.
    pub max_days_with_extension: Option<u32>,
    pub severity: StatusSeverity,
    pub rule_source: RuleSource,
    pub next_reset: Option<NaiveDate>,
}

impl From<&VisaStatus> for CountrySummary {
    fn from(status: &VisaStatus) -> Self {
        Self {
            country_code: status.country_code.clone(),
            days_used: status.days_used,
            days_remaining: status.days_remaining,
            max_days: status.rule.as_ref().map(|r| r.max_days),
            max_days_with_extension: status.rule.as_ref().map(|r| r.max_days_with_extension()),
            severity: status.severity,
            rule_source: status.rule_source,
            next_reset: status.next_reset,
        }
    }
}

/// Totals for the whole stay history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub reference_date: NaiveDate,
    /// Most urgent first.
    pub countries: Vec<CountrySummary>,
    pub overstayed: usize,
    /// Countries at warning or critical severity.
    pub at_risk: usize,
    pub unknown_rules: usize,
    pub conflicts: usize,
    pub critical_conflicts: usize,
    pub skipped_stays: usize,
}

impl DashboardSummary {
    /// Nothing overstayed, at risk, or in critical conflict.
    pub fn is_clear(&self) -> bool {
        self.overstayed == 0 && self.at_risk == 0 && self.critical_conflicts == 0
    }
}

/// Fold a status report and detected conflicts into dashboard totals.
///
/// Countries sort by severity, then fewest remaining days, then country code.
pub fn summarize(report: &StatusReport, conflicts: &[Conflict]) -> DashboardSummary {
    let mut countries: Vec<CountrySummary> =
        report.statuses.values().map(CountrySummary::from).collect();
    countries.sort_by(|a, b| {
        a.severity
            .urgency()
            .cmp(&b.severity.urgency())
            .then_with(|| {
                a.days_remaining
                    .unwrap_or(i64::MAX)
                    .cmp(&b.days_remaining.unwrap_or(i64::MAX))
            })
            .then_with(|| a.country_code.cmp(&b.country_code))
    });

    let count = |severity: StatusSeverity| countries.iter().filter(|c| c.severity == severity).count();

    DashboardSummary {
        reference_date: report.reference_date,
        overstayed: count(StatusSeverity::Overstayed),
        at_risk: count(StatusSeverity::Warning) + count(StatusSeverity::Critical),
        unknown_rules: count(StatusSeverity::Unknown),
        conflicts: conflicts.len(),
        critical_conflicts: conflicts
            .iter()
            .filter(|c| c.severity == ConflictSeverity::Critical)
            .count(),
        skipped_stays: report.diagnostics.skipped_count(),
        countries,
    }
}
