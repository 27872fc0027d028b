//! Tests for calendar-day arithmetic and date parsing.

use chrono::NaiveDate;
use visa_engine::dates::{
    add_days, days_between_inclusive, days_between_inclusive_str, effective_end, format_date,
    intersect, parse_date, today_in, DateInterval,
};
use visa_engine::{Stay, VisaError};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn interval(start: &str, end: &str) -> DateInterval {
    DateInterval::new(d(start), d(end)).unwrap()
}

// ── days_between_inclusive ──────────────────────────────────────────────────

#[test]
fn same_day_counts_as_one() {
    assert_eq!(days_between_inclusive(d("2024-02-29"), d("2024-02-29")), 1);
}

#[test]
fn counts_both_endpoints() {
    // January has 31 days.
    assert_eq!(days_between_inclusive(d("2024-01-01"), d("2024-01-31")), 31);
}

#[test]
fn leap_february_is_29_days() {
    assert_eq!(days_between_inclusive(d("2024-02-01"), d("2024-02-29")), 29);
    assert_eq!(days_between_inclusive(d("2023-02-01"), d("2023-02-28")), 28);
}

#[test]
fn reversed_range_is_zero() {
    assert_eq!(days_between_inclusive(d("2024-02-10"), d("2024-02-01")), 0);
}

#[test]
fn unparseable_strings_give_zero() {
    assert_eq!(days_between_inclusive_str("2024-01-01", "not a date"), 0);
    assert_eq!(days_between_inclusive_str("", "2024-01-01"), 0);
    assert_eq!(days_between_inclusive_str("2024-01-01", "2024-01-10"), 10);
}

// ── parse_date / format_date ────────────────────────────────────────────────

#[test]
fn parse_accepts_plain_and_datetime_forms() {
    assert_eq!(parse_date("2024-05-01").unwrap(), d("2024-05-01"));
    assert_eq!(parse_date("2024-05-01T23:30:00Z").unwrap(), d("2024-05-01"));
    assert_eq!(parse_date("2024-05-01T23:30:00+09:00").unwrap(), d("2024-05-01"));
    assert_eq!(parse_date("2024-05-01T08:00:00").unwrap(), d("2024-05-01"));
    assert_eq!(parse_date("  2024-05-01 ").unwrap(), d("2024-05-01"));
}

#[test]
fn parse_rejects_impossible_dates() {
    assert!(matches!(parse_date("2024-13-45"), Err(VisaError::InvalidDate(_))));
    assert!(matches!(parse_date("2023-02-29"), Err(VisaError::InvalidDate(_))));
    assert!(matches!(parse_date(""), Err(VisaError::InvalidDate(_))));
}

#[test]
fn format_is_iso() {
    assert_eq!(format_date(d("2024-03-09")), "2024-03-09");
}

// ── intervals ───────────────────────────────────────────────────────────────

#[test]
fn interval_rejects_reversed_bounds() {
    assert!(DateInterval::new(d("2024-01-02"), d("2024-01-01")).is_none());
    assert_eq!(DateInterval::single(d("2024-01-01")).days(), 1);
}

#[test]
fn intersect_partial_overlap() {
    let a = interval("2024-05-01", "2024-05-10");
    let b = interval("2024-05-05", "2024-05-15");
    assert_eq!(intersect(&a, &b), Some(interval("2024-05-05", "2024-05-10")));
    assert_eq!(a.intersect(&b).unwrap().days(), 6);
}

#[test]
fn intersect_contained() {
    let outer = interval("2024-01-01", "2024-12-31");
    let inner = interval("2024-03-01", "2024-03-05");
    assert_eq!(intersect(&outer, &inner), Some(inner));
}

#[test]
fn intersect_touching_shares_one_day() {
    let a = interval("2024-05-01", "2024-05-10");
    let b = interval("2024-05-10", "2024-05-12");
    assert_eq!(intersect(&a, &b), Some(DateInterval::single(d("2024-05-10"))));
}

#[test]
fn intersect_disjoint_is_none() {
    let a = interval("2024-05-01", "2024-05-10");
    let b = interval("2024-05-11", "2024-05-12");
    assert_eq!(intersect(&a, &b), None);
}

#[test]
fn contains_is_inclusive() {
    let a = interval("2024-05-01", "2024-05-10");
    assert!(a.contains(d("2024-05-01")));
    assert!(a.contains(d("2024-05-10")));
    assert!(!a.contains(d("2024-05-11")));
}

// ── effective_end ───────────────────────────────────────────────────────────

#[test]
fn effective_end_uses_exit_when_present() {
    let stay = Stay::new("1", "KR", "2024-01-01").with_exit("2024-01-10");
    assert_eq!(effective_end(&stay, d("2024-03-01")), d("2024-01-10"));
}

#[test]
fn effective_end_falls_back_to_reference() {
    let ongoing = Stay::new("1", "KR", "2024-01-01");
    assert_eq!(effective_end(&ongoing, d("2024-03-01")), d("2024-03-01"));

    let blank_exit = Stay::new("2", "KR", "2024-01-01").with_exit("");
    assert_eq!(effective_end(&blank_exit, d("2024-03-01")), d("2024-03-01"));

    let bad_exit = Stay::new("3", "KR", "2024-01-01").with_exit("soon");
    assert_eq!(effective_end(&bad_exit, d("2024-03-01")), d("2024-03-01"));
}

// ── misc ────────────────────────────────────────────────────────────────────

#[test]
fn add_days_crosses_year_boundary() {
    assert_eq!(add_days(d("2024-01-01"), -1), d("2023-12-31"));
    assert_eq!(add_days(d("2023-12-31"), 1), d("2024-01-01"));
}

#[test]
fn today_in_rejects_unknown_zone() {
    assert!(matches!(
        today_in("Mars/Olympus_Mons"),
        Err(VisaError::InvalidTimezone(_))
    ));
    assert!(today_in("Asia/Seoul").is_ok());
}
