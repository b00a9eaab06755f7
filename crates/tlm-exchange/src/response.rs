//! Classification of raw exchange responses.
//!
//! Exchange replies are heterogeneous: a direct transaction hash, a bare
//! order id, or the nested `{"status":"ok","response":{"data":{"statuses":[..]}}}`
//! envelope. Each shape is handled by one extraction rule; rules are tried in
//! a fixed priority order and the first one that matches decides the outcome.
//!
//! A rejection always wins over the fallback: a rejected order must never be
//! given a synthetic identifier, otherwise the run would wait for a trade that
//! was never placed.

use serde_json::Value;
use tlm_core::{OrderOutcome, TargetIdentifier};

/// Result of a single extraction rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Identifier(String),
    Rejected(String),
}

impl From<Extraction> for OrderOutcome {
    fn from(extraction: Extraction) -> Self {
        match extraction {
            Extraction::Identifier(id) => OrderOutcome::Identifier { id },
            Extraction::Rejected(reason) => OrderOutcome::Rejected { reason },
        }
    }
}

type Rule = fn(&Value) -> Option<Extraction>;

/// Extraction rules in priority order.
const RULES: &[(&str, Rule)] = &[
    ("hash", top_level_hash),
    ("order_id", top_level_order_id),
    ("error_status", top_level_error_status),
    ("status_error", first_status_error),
    ("status_oid", first_status_oid),
];

/// Classify an exchange response.
///
/// Falls back to a synthetic identifier derived from `target` when no rule
/// recognizes the shape.
pub fn classify(response: &Value, target: &TargetIdentifier) -> OrderOutcome {
    for (name, rule) in RULES {
        if let Some(extraction) = rule(response) {
            tracing::debug!(rule = name, ?extraction, "Response classified");
            return extraction.into();
        }
    }

    OrderOutcome::Fallback {
        synthetic_id: target.fallback_token(),
        cause: None,
    }
}

/// Render an id field: strings as-is, numbers in decimal.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn top_level_hash(response: &Value) -> Option<Extraction> {
    response
        .get("hash")
        .and_then(id_string)
        .map(Extraction::Identifier)
}

fn top_level_order_id(response: &Value) -> Option<Extraction> {
    response
        .get("id")
        .or_else(|| response.get("oid"))
        .and_then(id_string)
        .map(Extraction::Identifier)
}

/// `{"status":"err","response":"<reason>"}`
fn top_level_error_status(response: &Value) -> Option<Extraction> {
    if response.get("status").and_then(Value::as_str) != Some("err") {
        return None;
    }
    let reason = match response.get("response") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    };
    Some(Extraction::Rejected(reason))
}

fn first_status(response: &Value) -> Option<&Value> {
    response
        .pointer("/response/data/statuses")
        .and_then(Value::as_array)
        .and_then(|statuses| statuses.first())
        .filter(|status| status.is_object())
}

fn first_status_error(response: &Value) -> Option<Extraction> {
    let error = first_status(response)?.get("error")?;
    let reason = match error {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Some(Extraction::Rejected(reason))
}

/// `filled.oid`, then a bare `oid`, then `resting.oid`.
fn first_status_oid(response: &Value) -> Option<Extraction> {
    let status = first_status(response)?;
    status
        .pointer("/filled/oid")
        .and_then(id_string)
        .or_else(|| status.get("oid").and_then(id_string))
        .or_else(|| status.pointer("/resting/oid").and_then(id_string))
        .map(Extraction::Identifier)
}
