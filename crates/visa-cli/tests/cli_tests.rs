//! Integration tests for the `visa` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to run every subcommand
//! through the actual binary, covering stdin and file input, custom rule
//! tables, JSON output, and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the stays.json fixture.
fn stays_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/stays.json")
}

/// Helper: path to the rules.json fixture.
fn rules_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rules.json")
}

/// Helper: the binary with a fixed reference date and no inherited config.
fn visa() -> Command {
    let mut cmd = Command::cargo_bin("visa").unwrap();
    cmd.env_remove("VISA_RULES_FILE")
        .env_remove("VISA_NATIONALITY")
        .env_remove("VISA_TIMEZONE")
        .env_remove("RUST_LOG")
        .args(["--reference-date", "2024-06-20"]);
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// status
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn status_from_file_as_text() {
    visa()
        .args(["status", "-i", stays_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("JP"))
        .stdout(predicate::str::contains("46/90"))
        .stdout(predicate::str::contains("window 2023-12-24..2024-06-20"))
        .stderr(predicate::str::contains("Skipped 1 malformed stay(s)."));
}

#[test]
fn status_from_stdin() {
    let input = std::fs::read_to_string(stays_path()).unwrap();

    visa()
        .arg("status")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("KR"));
}

#[test]
fn status_as_json() {
    let json = stdout_json(visa().args(["status", "-i", stays_path(), "--format", "json"]));

    assert_eq!(json["referenceDate"], "2024-06-20");
    let jp = &json["statuses"]["JP"];
    assert_eq!(jp["daysUsed"], 46);
    assert_eq!(jp["daysRemaining"], 44);
    assert_eq!(jp["windowStart"], "2023-12-24");
    assert_eq!(jp["severity"], "ok");

    let kr = &json["statuses"]["KR"];
    assert_eq!(kr["daysUsed"], 3);
    assert_eq!(kr["nextReset"], "2024-06-13");

    assert_eq!(json["diagnostics"]["skipped"][0]["id"], "4");
}

#[test]
fn status_for_one_country() {
    let json = stdout_json(visa().args([
        "status",
        "-i",
        stays_path(),
        "--country",
        "jp",
        "--format",
        "json",
    ]));

    assert_eq!(json["countryCode"], "JP");
    assert_eq!(json["daysUsed"], 46);
    assert_eq!(json["ruleSource"], "country_default");
}

#[test]
fn status_with_custom_rules_file() {
    // Exit rule: only the June stay counts.
    visa()
        .args(["status", "-i", stays_path(), "--rules", rules_path(), "--country", "JP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("15/30"));
}

#[test]
fn rules_file_from_environment() {
    visa()
        .env("VISA_RULES_FILE", rules_path())
        .args(["status", "-i", stays_path(), "--country", "JP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("15/30"));
}

#[test]
fn unknown_country_has_no_rule() {
    visa()
        .args(["status", "-i", stays_path(), "--rules", rules_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("no rule known"));
}

#[test]
fn visa_type_override_selects_rule() {
    let json = stdout_json(visa().args([
        "status",
        "-i",
        stays_path(),
        "--country",
        "KR",
        "--visa-type",
        "KR=long-term-resident",
        "--format",
        "json",
    ]));

    assert_eq!(json["ruleSource"], "visa_type");
    assert_eq!(json["rule"]["maxDays"], 183);
    assert_eq!(json["nextReset"], "2025-01-01");
}

#[test]
fn malformed_visa_type_flag_is_rejected() {
    visa()
        .args(["status", "-i", stays_path(), "--visa-type", "KR"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("COUNTRY=VISA_TYPE"));
}

#[test]
fn invalid_timezone_fails() {
    Command::cargo_bin("visa")
        .unwrap()
        .env_remove("VISA_TIMEZONE")
        .args(["status", "-i", stays_path(), "--timezone", "Mars/Olympus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --timezone"));
}

// ─────────────────────────────────────────────────────────────────────────────
// conflicts / resolve
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn conflicts_listed() {
    visa()
        .args(["conflicts", "-i", stays_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("critical"))
        .stdout(predicate::str::contains("2024-06-10..2024-06-12 (3 days)"));
}

#[test]
fn conflicts_as_json() {
    let json = stdout_json(visa().args(["conflicts", "-i", stays_path(), "--format", "json"]));

    let conflicts = json.as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["stayA"], "2");
    assert_eq!(conflicts[0]["stayB"], "3");
    assert_eq!(conflicts[0]["overlapDays"], 3);
}

#[test]
fn no_conflicts_message() {
    visa()
        .arg("conflicts")
        .write_stdin(r#"[{"id":"1","countryCode":"JP","entryDate":"2024-01-01","exitDate":"2024-01-05"}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("No conflicts."));
}

#[test]
fn resolve_trims_earlier_stay() {
    let output = visa()
        .args(["resolve", "-i", stays_path()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("trimmed: 2"));

    let stays: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let stays = stays.as_array().unwrap();
    assert_eq!(stays.len(), 4);
    assert_eq!(stays[1]["exitDate"], "2024-06-09");
    assert_eq!(stays[1]["entryCity"], "Osaka");
    assert_eq!(stays[2]["exitDate"], "2024-06-12");
}

#[test]
fn resolve_to_file() {
    let dir = std::env::temp_dir().join("visa-cli-resolve-test");
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("resolved.json");

    visa()
        .args(["resolve", "-i", stays_path(), "-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("2024-06-09"));
    std::fs::remove_file(&out).ok();
}

// ─────────────────────────────────────────────────────────────────────────────
// summary / rules / days
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn summary_as_text() {
    visa()
        .args(["summary", "-i", stays_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("As of 2024-06-20"))
        .stdout(predicate::str::contains("Conflicts:      1 (1 critical)"))
        .stdout(predicate::str::contains("Skipped stays:  1"));
}

#[test]
fn summary_as_json() {
    let json = stdout_json(visa().args(["summary", "-i", stays_path(), "--format", "json"]));

    assert_eq!(json["overstayed"], 0);
    assert_eq!(json["criticalConflicts"], 1);
    assert_eq!(json["countries"].as_array().unwrap().len(), 3);
}

#[test]
fn builtin_rules_for_country() {
    visa()
        .args(["rules", "--country", "KR"])
        .assert()
        .success()
        .stdout(predicate::str::contains("per stay"))
        .stdout(predicate::str::contains("visa type: long-term-resident"));
}

#[test]
fn rules_listing_ends_with_country_list() {
    visa()
        .args(["rules", "--rules", rules_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rules for 2 countries: JP, KR"));
}

#[test]
fn rules_from_file_as_json() {
    let json = stdout_json(visa().args(["rules", "--rules", rules_path(), "--format", "json"]));

    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[test]
fn days_counts_inclusively() {
    visa()
        .args(["days", "2024-01-01", "2024-01-31"])
        .assert()
        .success()
        .stdout("31\n");
}

#[test]
fn days_rejects_reversed_range() {
    visa()
        .args(["days", "2024-02-01", "2024-01-31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before start date"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Error handling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn non_array_input_fails() {
    visa()
        .arg("status")
        .write_stdin(r#"{"id":"1"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse stays"));
}

#[test]
fn missing_input_file_fails() {
    visa()
        .args(["status", "-i", "/nonexistent/stays.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}
