//! Detect and resolve physically impossible stay histories.
//!
//! A traveler cannot be in two countries on the same day, and cannot hold two
//! overlapping stays in the same country. Intervals are closed calendar-day
//! ranges, so a stay ending 05-10 and another starting 05-10 share one day.
//! That single shared day is a same-day transit when the earlier stay's
//! recorded exit is the later stay's entry: a warning across countries, not a
//! conflict within one country.
//!
//! Malformed stays and ongoing stays that have not started yet do not take part.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::dates::{add_days, format_date, DateInterval};
use crate::stay::{Stay, StayInterval};

/// Whether the overlapping stays are in the same country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    CrossCountry,
    SameCountry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    /// Ambiguous: a same-day transit, or an ongoing stay that probably lacks an exit.
    Warning,
    /// Definitely inconsistent.
    Critical,
}

/// Two stays whose date ranges overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// Id of the stay entered first.
    pub stay_a: String,
    /// Id of the stay entered second.
    pub stay_b: String,
    pub country_a: String,
    pub country_b: String,
    pub kind: ConflictKind,
    pub overlap: DateInterval,
    pub overlap_days: i64,
    pub severity: ConflictSeverity,
}

/// Stays after [`resolve_conflicts`], with the ids that were changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Surviving stays in their original order.
    pub stays: Vec<Stay>,
    /// Ids whose exit date was moved earlier.
    pub trimmed: Vec<String>,
    /// Ids removed because trimming would leave nothing.
    pub dropped: Vec<String>,
}

impl Resolution {
    pub fn is_unchanged(&self) -> bool {
        self.trimmed.is_empty() && self.dropped.is_empty()
    }
}

/// Validated stays that have an interval, ordered by entry then input position.
fn participants(stays: &[Stay], reference: NaiveDate) -> Vec<(usize, StayInterval<'_>)> {
    let mut out: Vec<(usize, StayInterval<'_>)> = stays
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.validate(reference).ok().map(|v| (i, v)))
        .filter(|(_, v)| v.interval.is_some())
        .collect();
    out.sort_by_key(|(i, v)| (v.entry, *i));
    out
}

/// One stay exits on the day the other enters, and that is the only shared day.
fn is_transit(a_entry: NaiveDate, a_exit: Option<NaiveDate>, b_entry: NaiveDate, b_exit: Option<NaiveDate>) -> bool {
    a_exit == Some(b_entry) || b_exit == Some(a_entry)
}

fn classify(
    a: &StayInterval<'_>,
    b: &StayInterval<'_>,
    overlap: &DateInterval,
    reference: NaiveDate,
) -> Option<ConflictSeverity> {
    if is_transit(a.entry, a.exit, b.entry, b.exit) {
        return (a.country_code != b.country_code).then_some(ConflictSeverity::Warning);
    }
    if a.is_confirmed() && b.is_confirmed() {
        return Some(ConflictSeverity::Critical);
    }
    if overlap.end >= reference {
        Some(ConflictSeverity::Critical)
    } else {
        Some(ConflictSeverity::Warning)
    }
}

/// Find every pair of stays whose date ranges overlap.
///
/// Ongoing stays end at the context's reference date. Conflicts are ordered by
/// the entry dates of the stays involved.
pub fn detect_date_conflicts(stays: &[Stay], ctx: &EvaluationContext) -> Vec<Conflict> {
    let reference = ctx.reference_date;
    let ordered = participants(stays, reference);
    let mut conflicts = Vec::new();

    for (i, (_, a)) in ordered.iter().enumerate() {
        for (_, b) in &ordered[i + 1..] {
            let (Some(ia), Some(ib)) = (a.interval, b.interval) else {
                continue;
            };
            let Some(overlap) = ia.intersect(&ib) else {
                continue;
            };
            let Some(severity) = classify(a, b, &overlap, reference) else {
                continue;
            };
            conflicts.push(Conflict {
                stay_a: a.stay.id.clone(),
                stay_b: b.stay.id.clone(),
                country_a: a.country_code.clone(),
                country_b: b.country_code.clone(),
                kind: if a.country_code == b.country_code {
                    ConflictKind::SameCountry
                } else {
                    ConflictKind::CrossCountry
                },
                overlap,
                overlap_days: overlap.days(),
                severity,
            });
        }
    }

    tracing::debug!(
        conflicts = conflicts.len(),
        critical = conflicts
            .iter()
            .filter(|c| c.severity == ConflictSeverity::Critical)
            .count(),
        "detected stay conflicts"
    );
    conflicts
}

/// Resolve overlaps in favor of the most recently entered stay.
///
/// When two stays overlap, the earlier one's exit is moved to the day before
/// the later one's entry. If that would put its exit before its entry, the
/// earlier stay is dropped. Same-day transits are left alone. Running this on
/// its own output changes nothing.
pub fn resolve_conflicts(stays: &[Stay], ctx: &EvaluationContext) -> Resolution {
    struct Kept {
        index: usize,
        entry: NaiveDate,
        exit: Option<NaiveDate>,
        end: NaiveDate,
    }

    let reference = ctx.reference_date;
    let mut output: Vec<Option<Stay>> = stays.iter().cloned().map(Some).collect();
    let mut resolution = Resolution::default();
    let mut kept: Vec<Kept> = Vec::new();

    for (index, stay) in participants(stays, reference) {
        let Some(interval) = stay.interval else {
            continue;
        };

        for k in kept.iter_mut() {
            if output[k.index].is_none() {
                continue;
            }
            let overlaps = k.entry.max(interval.start) <= k.end.min(interval.end);
            if !overlaps || is_transit(k.entry, k.exit, stay.entry, stay.exit) {
                continue;
            }

            let new_exit = add_days(stay.entry, -1);
            let id = stays[k.index].id.clone();
            if new_exit < k.entry {
                tracing::debug!(stay_id = %id, winner = %stay.stay.id, "dropping overlapped stay");
                output[k.index] = None;
                resolution.trimmed.retain(|t| t != &id);
                resolution.dropped.push(id);
            } else {
                tracing::debug!(stay_id = %id, exit = %new_exit, winner = %stay.stay.id, "trimming overlapped stay");
                if let Some(s) = output[k.index].as_mut() {
                    s.exit_date = Some(format_date(new_exit));
                }
                k.exit = Some(new_exit);
                k.end = new_exit;
                if !resolution.trimmed.contains(&id) {
                    resolution.trimmed.push(id);
                }
            }
        }

        kept.push(Kept {
            index,
            entry: stay.entry,
            exit: stay.exit,
            end: interval.end,
        });
    }

    resolution.stays = output.into_iter().flatten().collect();
    resolution
}

/// [`resolve_conflicts`] without the change report.
pub fn auto_resolve_conflicts(stays: &[Stay], ctx: &EvaluationContext) -> Vec<Stay> {
    resolve_conflicts(stays, ctx).stays
}
