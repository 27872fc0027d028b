//! # visa-engine
//!
//! Deterministic visa-day accounting for travelers.
//!
//! Given a list of stays (date ranges spent in a country) and a visa rule per
//! country, the engine computes days used, days remaining, and when the count
//! resets. It also finds stays that cannot both be true (two countries on the
//! same day) and can resolve them.
//!
//! Every function is pure: the reference date ("today") and traveler
//! nationality arrive through an explicit [`EvaluationContext`], never from the
//! clock or global state.
//!
//! ## Modules
//!
//! - [`dates`]: inclusive day counts, interval intersection, date parsing
//! - [`stay`]: stored stay records, validation, diagnostics
//! - [`rules`]: visa rules, override precedence, the built-in rule table
//! - [`context`]: reference date, nationality, severity thresholds
//! - [`engine`]: per-country status under exit, rolling, and calendar rules
//! - [`conflict`]: overlap detection and auto-resolution
//! - [`summary`]: dashboard aggregation
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use visa_engine::{calculate_visa_status, EvaluationContext, Stay, VisaRule};
//!
//! let stays = vec![
//!     Stay::new("1", "JP", "2024-01-01").with_exit("2024-01-31"),
//!     Stay::new("2", "JP", "2024-06-01").with_exit("2024-06-15"),
//! ];
//! let rules = vec![VisaRule::rolling("JP", 90, 180)];
//! let ctx = EvaluationContext::new(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap());
//!
//! let status = calculate_visa_status("JP", &stays, &rules, &ctx);
//! assert_eq!(status.days_used, 46);
//! assert_eq!(status.days_remaining, Some(44));
//! ```

pub mod conflict;
pub mod context;
pub mod dates;
pub mod engine;
pub mod error;
pub mod rules;
pub mod stay;
pub mod summary;

pub use conflict::{
    auto_resolve_conflicts, detect_date_conflicts, resolve_conflicts, Conflict, ConflictKind,
    ConflictSeverity, Resolution,
};
pub use context::{EvaluationContext, StatusThresholds};
pub use dates::{days_between_inclusive, effective_end, intersect, parse_date, DateInterval};
pub use engine::{
    calculate_all_visa_statuses, calculate_visa_status, evaluate, StatusReport, StatusSeverity,
    VisaStatus,
};
pub use error::VisaError;
pub use rules::{
    CalendarPeriod, ResetType, ResolvedRule, RuleLookup, RuleSource, RuleTable, VisaRule,
};
pub use stay::{stays_from_json, Diagnostics, SkipReason, SkippedStay, Stay};
pub use summary::{summarize, CountrySummary, DashboardSummary};
