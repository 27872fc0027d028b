//! Visa-day accounting: how many days a traveler has used in a country, how
//! many remain, and when the count resets.
//!
//! One pure function per [`ResetType`], selected by a single match in
//! [`calculate_visa_status`]:
//!
//! - **exit**: only the current stay counts. A recorded exit resets the
//!   allowance, even when the traveler re-enters the same or the next day.
//!   Closed records that overlap past each other's exit (duplicates, split
//!   entries) count as one stay.
//! - **rolling**: calendar days inside `[reference - period_days + 1, reference]`
//!   covered by any stay.
//! - **calendar**: calendar days inside the fixed calendar period containing
//!   the reference date, counted the same way.
//!
//! A day shared by two records of the same country counts once. Other
//! overlaps are left as recorded; resolving them is a separate, explicit step
//! (see [`crate::conflict`]).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::{EvaluationContext, StatusThresholds};
use crate::dates::{add_days, DateInterval};
use crate::rules::{CalendarPeriod, ResetType, RuleLookup, RuleSource, VisaRule};
use crate::stay::{normalize_code, Diagnostics, Stay, StayInterval};

/// How urgent a country's status is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSeverity {
    Ok,
    Warning,
    Critical,
    Overstayed,
    /// No rule is known, so remaining days cannot be judged.
    Unknown,
}

impl StatusSeverity {
    /// Classify remaining days. `None` means the rule is unknown.
    pub fn classify(days_remaining: Option<i64>, thresholds: &StatusThresholds) -> Self {
        match days_remaining {
            None => StatusSeverity::Unknown,
            Some(r) if r < 0 => StatusSeverity::Overstayed,
            Some(r) if r <= thresholds.critical_days => StatusSeverity::Critical,
            Some(r) if r <= thresholds.warning_days => StatusSeverity::Warning,
            Some(_) => StatusSeverity::Ok,
        }
    }

    /// Sort key, most urgent first.
    pub fn urgency(self) -> u8 {
        match self {
            StatusSeverity::Overstayed => 0,
            StatusSeverity::Critical => 1,
            StatusSeverity::Warning => 2,
            StatusSeverity::Unknown => 3,
            StatusSeverity::Ok => 4,
        }
    }
}

/// Day usage for one country as of the context's reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaStatus {
    pub country_code: String,
    pub days_used: i64,
    /// `max_days - days_used`; negative means overstay. `None` when no rule is known.
    pub days_remaining: Option<i64>,
    /// The rule actually applied, after overrides. `None` when unknown.
    pub rule: Option<VisaRule>,
    pub rule_source: RuleSource,
    /// Evaluation window, rolling rules only.
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    /// When the allowance next starts over, if it can be determined.
    pub next_reset: Option<NaiveDate>,
    pub is_overstayed: bool,
    pub severity: StatusSeverity,
    /// Stays that contributed at least one day.
    pub stays_counted: usize,
    /// Stays for this country excluded as malformed.
    pub skipped_stays: usize,
}

impl VisaStatus {
    pub fn is_unknown(&self) -> bool {
        self.rule_source == RuleSource::Unknown
    }
}

/// Statuses for every country plus the records that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub reference_date: NaiveDate,
    pub statuses: BTreeMap<String, VisaStatus>,
    pub diagnostics: Diagnostics,
}

/// Days counted under one reset policy.
#[derive(Debug, Default)]
struct Usage {
    days_used: i64,
    window: Option<DateInterval>,
    next_reset: Option<NaiveDate>,
    stays_counted: usize,
    /// First day that contributed to `days_used`.
    earliest_counted: Option<NaiveDate>,
}

/// Compute the status of one country from the traveler's full stay history.
///
/// Stays for other countries are ignored. Malformed stays for this country are
/// excluded and counted in [`VisaStatus::skipped_stays`].
pub fn calculate_visa_status<R>(
    country_code: &str,
    stays: &[Stay],
    rules: &R,
    ctx: &EvaluationContext,
) -> VisaStatus
where
    R: RuleLookup + ?Sized,
{
    let country = normalize_code(country_code);
    let mut diagnostics = Diagnostics::default();
    evaluate_country(
        &country,
        stays.iter().filter(|s| s.normalized_country() == country),
        rules,
        ctx,
        &mut diagnostics,
    )
}

/// Group stays by country and compute each country's status.
pub fn calculate_all_visa_statuses<R>(
    stays: &[Stay],
    rules: &R,
    ctx: &EvaluationContext,
) -> BTreeMap<String, VisaStatus>
where
    R: RuleLookup + ?Sized,
{
    evaluate(stays, rules, ctx).statuses
}

/// Like [`calculate_all_visa_statuses`], also returning diagnostics for every
/// skipped record, including those with no country to group under.
pub fn evaluate<R>(stays: &[Stay], rules: &R, ctx: &EvaluationContext) -> StatusReport
where
    R: RuleLookup + ?Sized,
{
    let mut diagnostics = Diagnostics::default();
    let mut by_country: BTreeMap<String, Vec<&Stay>> = BTreeMap::new();

    for stay in stays {
        let country = stay.normalized_country();
        if country.is_empty() {
            if let Err(reason) = stay.validate(ctx.reference_date) {
                diagnostics.record(stay, reason);
            }
            continue;
        }
        by_country.entry(country).or_default().push(stay);
    }

    let statuses = by_country
        .into_iter()
        .map(|(country, group)| {
            let status = evaluate_country(&country, group.into_iter(), rules, ctx, &mut diagnostics);
            (country, status)
        })
        .collect();

    StatusReport {
        reference_date: ctx.reference_date,
        statuses,
        diagnostics,
    }
}

fn evaluate_country<'a, R>(
    country: &str,
    stays: impl Iterator<Item = &'a Stay>,
    rules: &R,
    ctx: &EvaluationContext,
    diagnostics: &mut Diagnostics,
) -> VisaStatus
where
    R: RuleLookup + ?Sized,
{
    let reference = ctx.reference_date;
    let mut valid: Vec<StayInterval<'a>> = Vec::new();
    let mut skipped_stays = 0;
    for stay in stays {
        match stay.validate(reference) {
            Ok(v) => valid.push(v),
            Err(reason) => {
                diagnostics.record(stay, reason);
                skipped_stays += 1;
            }
        }
    }
    valid.sort_by_key(|s| s.entry);

    let visa_type = ctx
        .visa_type_for(country)
        .or_else(|| latest_visa_type(&valid));

    let Some(resolved) = rules.rule_for(country, visa_type, ctx.nationality.as_deref()) else {
        tracing::debug!(country, "no visa rule for country");
        let usage = total_usage(&valid, reference);
        return VisaStatus {
            country_code: country.to_string(),
            days_used: usage.days_used,
            days_remaining: None,
            rule: None,
            rule_source: RuleSource::Unknown,
            window_start: None,
            window_end: None,
            next_reset: None,
            is_overstayed: false,
            severity: StatusSeverity::Unknown,
            stays_counted: usage.stays_counted,
            skipped_stays,
        };
    };

    let rule = &resolved.rule;
    let usage = match rule.reset_type {
        ResetType::Exit => exit_usage(&valid, reference),
        ResetType::Rolling => rolling_usage(&valid, rule.period_days, reference),
        ResetType::Calendar => calendar_usage(&valid, rule.calendar_period, reference),
    };

    let days_remaining = i64::from(rule.max_days) - usage.days_used;
    tracing::trace!(
        country,
        days_used = usage.days_used,
        days_remaining,
        source = ?resolved.source,
        "computed visa status"
    );

    VisaStatus {
        country_code: country.to_string(),
        days_used: usage.days_used,
        days_remaining: Some(days_remaining),
        window_start: usage.window.map(|w| w.start),
        window_end: usage.window.map(|w| w.end),
        next_reset: usage.next_reset,
        is_overstayed: days_remaining < 0,
        severity: StatusSeverity::classify(Some(days_remaining), &ctx.thresholds),
        stays_counted: usage.stays_counted,
        skipped_stays,
        rule_source: resolved.source,
        rule: Some(resolved.rule),
    }
}

/// Visa type of the most recently entered stay that records one.
/// Expects `stays` sorted by entry date.
fn latest_visa_type<'a>(stays: &[StayInterval<'a>]) -> Option<&'a str> {
    stays
        .iter()
        .rev()
        .filter_map(|s| s.stay.visa_type.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
}

/// Only the latest stay (or overlapping closed records) counts, clipped at
/// `reference`.
fn exit_usage(stays: &[StayInterval<'_>], reference: NaiveDate) -> Usage {
    struct Run {
        span: DateInterval,
        open: bool,
        members: usize,
    }

    let mut current: Option<Run> = None;
    for stay in stays {
        let Some(interval) = stay.interval else {
            continue;
        };
        if interval.start > reference {
            continue;
        }
        match current.as_mut() {
            // A closed run ends with a recorded exit; only an entry strictly
            // before that exit continues it. An ongoing run is superseded.
            Some(run) if !run.open && interval.start < run.span.end => {
                run.span.end = run.span.end.max(interval.end);
                run.open |= !stay.is_confirmed();
                run.members += 1;
            }
            _ => {
                current = Some(Run {
                    span: interval,
                    open: !stay.is_confirmed(),
                    members: 1,
                });
            }
        }
    }

    let Some(run) = current else {
        return Usage::default();
    };
    let counted_end = run.span.end.min(reference);
    Usage {
        days_used: DateInterval::new(run.span.start, counted_end).map_or(0, |i| i.days()),
        window: None,
        next_reset: (!run.open).then(|| add_days(run.span.end, 1)),
        stays_counted: run.members,
        earliest_counted: Some(run.span.start),
    }
}

/// Days covered inside the trailing `period_days` window.
fn rolling_usage(stays: &[StayInterval<'_>], period_days: u32, reference: NaiveDate) -> Usage {
    let start = add_days(reference, 1 - i64::from(period_days));
    let Some(window) = DateInterval::new(start, reference) else {
        return Usage::default();
    };
    let mut usage = windowed_usage(stays, window);
    // The earliest counted day drops out once the window has moved past it.
    usage.next_reset = usage
        .earliest_counted
        .map(|earliest| add_days(earliest, i64::from(period_days)));
    usage.window = Some(window);
    usage
}

/// Days covered inside the calendar period containing `reference`.
fn calendar_usage(stays: &[StayInterval<'_>], period: CalendarPeriod, reference: NaiveDate) -> Usage {
    let Some(bounds) = period.bounds(reference) else {
        return Usage::default();
    };
    let mut usage = windowed_usage(stays, bounds);
    usage.next_reset = Some(add_days(bounds.end, 1));
    usage
}

/// Calendar days of `window` covered by at least one stay.
fn windowed_usage(stays: &[StayInterval<'_>], window: DateInterval) -> Usage {
    covered_days(
        stays
            .iter()
            .filter_map(|s| s.interval)
            .filter_map(|i| i.intersect(&window))
            .collect(),
    )
}

/// Sort and sweep `intervals`, counting each covered day once.
fn covered_days(mut intervals: Vec<DateInterval>) -> Usage {
    intervals.sort();
    let mut usage = Usage {
        stays_counted: intervals.len(),
        earliest_counted: intervals.first().map(|i| i.start),
        ..Usage::default()
    };
    let mut merged: Option<DateInterval> = None;
    for interval in intervals {
        merged = match merged {
            Some(mut cur) if interval.start <= cur.end => {
                cur.end = cur.end.max(interval.end);
                Some(cur)
            }
            Some(cur) => {
                usage.days_used += cur.days();
                Some(interval)
            }
            None => Some(interval),
        };
    }
    usage.days_used += merged.map_or(0, |cur| cur.days());
    usage
}

/// With no rule, report every day spent up to `reference`.
fn total_usage(stays: &[StayInterval<'_>], reference: NaiveDate) -> Usage {
    covered_days(stays.iter().filter_map(|s| s.elapsed(reference)).collect())
}
