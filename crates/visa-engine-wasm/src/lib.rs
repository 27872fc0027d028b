//! WASM bindings for visa-engine.
//!
//! Exposes visa-day status, stay conflict detection and resolution, and the
//! dashboard summary to JavaScript via `wasm-bindgen`. All complex types are
//! passed as JSON strings.
//!
//! The evaluation context is a JSON object:
//!
//! ```json
//! { "referenceDate": "2024-06-20", "nationality": "US", "visaTypes": { "KR": "long-term-resident" } }
//! ```
//!
//! `referenceDate` is required. The module never reads the clock, so the
//! caller passes "today" in the traveler's timezone.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p visa-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/visa-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/visa_engine_wasm.wasm
//! ```

use serde::Serialize;
use visa_engine::{dates, stays_from_json, EvaluationContext, RuleTable, Stay};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Inputs crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

fn parse_context(json: &str) -> Result<EvaluationContext, JsValue> {
    EvaluationContext::from_json(json)
        .map_err(|e| JsValue::from_str(&format!("Invalid context JSON: {}", e)))
}

fn parse_stays(json: &str) -> Result<Vec<Stay>, JsValue> {
    stays_from_json(json).map_err(|e| JsValue::from_str(&format!("Invalid stays JSON: {}", e)))
}

/// Custom rule table, or the built-in one when omitted.
fn parse_rules(json: Option<String>) -> Result<RuleTable, JsValue> {
    match json {
        Some(json) => RuleTable::from_json(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid rules JSON: {}", e))),
        None => Ok(RuleTable::builtin()),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Compute the visa status of one country.
///
/// # Arguments
/// - `country_code` -- country to evaluate (case-insensitive)
/// - `stays_json` -- JSON array of stay records
/// - `context_json` -- evaluation context (see module docs)
/// - `rules_json` -- optional JSON array of rules; the built-in table if omitted
///
/// Returns a JSON `VisaStatus` object.
#[wasm_bindgen(js_name = "calculateVisaStatus")]
pub fn calculate_visa_status(
    country_code: &str,
    stays_json: &str,
    context_json: &str,
    rules_json: Option<String>,
) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;
    let rules = parse_rules(rules_json)?;

    to_json(&visa_engine::calculate_visa_status(
        country_code,
        &stays,
        &rules,
        &ctx,
    ))
}

/// Compute every country's status. Returns a JSON object keyed by country code.
#[wasm_bindgen(js_name = "calculateAllVisaStatuses")]
pub fn calculate_all_visa_statuses(
    stays_json: &str,
    context_json: &str,
    rules_json: Option<String>,
) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;
    let rules = parse_rules(rules_json)?;

    to_json(&visa_engine::calculate_all_visa_statuses(&stays, &rules, &ctx))
}

/// Like `calculateAllVisaStatuses`, wrapped in a report that also lists the
/// stays skipped as malformed.
#[wasm_bindgen(js_name = "evaluate")]
pub fn evaluate(
    stays_json: &str,
    context_json: &str,
    rules_json: Option<String>,
) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;
    let rules = parse_rules(rules_json)?;

    to_json(&visa_engine::evaluate(&stays, &rules, &ctx))
}

/// Find overlapping stays. Returns a JSON array of conflicts in entry order.
#[wasm_bindgen(js_name = "detectDateConflicts")]
pub fn detect_date_conflicts(stays_json: &str, context_json: &str) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;

    to_json(&visa_engine::detect_date_conflicts(&stays, &ctx))
}

/// Resolve overlaps, most recent entry wins. Returns the adjusted stay list
/// together with the ids that were trimmed or dropped.
#[wasm_bindgen(js_name = "resolveConflicts")]
pub fn resolve_conflicts(stays_json: &str, context_json: &str) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;

    to_json(&visa_engine::resolve_conflicts(&stays, &ctx))
}

/// Resolve overlaps and return only the adjusted JSON array of stays.
#[wasm_bindgen(js_name = "autoResolveConflicts")]
pub fn auto_resolve_conflicts(stays_json: &str, context_json: &str) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;

    to_json(&visa_engine::auto_resolve_conflicts(&stays, &ctx))
}

/// Dashboard totals: statuses and conflicts folded into one JSON object.
#[wasm_bindgen(js_name = "summarize")]
pub fn summarize(
    stays_json: &str,
    context_json: &str,
    rules_json: Option<String>,
) -> Result<String, JsValue> {
    let stays = parse_stays(stays_json)?;
    let ctx = parse_context(context_json)?;
    let rules = parse_rules(rules_json)?;

    let report = visa_engine::evaluate(&stays, &rules, &ctx);
    let conflicts = visa_engine::detect_date_conflicts(&stays, &ctx);
    to_json(&visa_engine::summarize(&report, &conflicts))
}

/// The built-in rule table as a JSON array.
#[wasm_bindgen(js_name = "builtinRules")]
pub fn builtin_rules() -> Result<String, JsValue> {
    let table = RuleTable::builtin();
    let rules: Vec<_> = table.iter().collect();
    to_json(&rules)
}

/// Calendar days from `start` to `end`, both inclusive. Returns 0 when `end`
/// is before `start` or either date does not parse; never throws.
#[wasm_bindgen(js_name = "daysBetweenInclusive")]
pub fn days_between_inclusive(start: &str, end: &str) -> f64 {
    dates::days_between_inclusive_str(start, end) as f64
}
