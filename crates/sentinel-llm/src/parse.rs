//! Lenient parsing of model replies into verdicts.
//!
//! Reasoning backends are asked for strict JSON but routinely wrap it in
//! prose or fences. The parser extracts the first JSON object and coerces
//! its fields, with every fallback biased toward rejection.

use serde_json::Value;

use sentinel_core::RiskScore;

use crate::auditor::SemanticVerdict;
use crate::error::{LlmError, LlmResult};

/// Extract a [`SemanticVerdict`] from raw model output.
///
/// Accepted shape: a JSON object with `allowed` (bool), `risk_score`
/// (0–10 integer), `reason` (string), and optionally `uncertain` (bool).
/// Missing or malformed fields fall back fail-closed:
/// - `allowed` absent with a `risk_score` present → allowed iff score < 5
/// - `allowed` absent otherwise → `false`
/// - `risk_score` absent or unparseable → 10 when also missing `allowed`,
///   else 5 (the original service's midpoint default)
/// - `reason` absent → a placeholder naming the omission
///
/// # Errors
///
/// Returns [`LlmError::InvalidResponse`] when no JSON object can be found
/// at all.
pub fn parse_verdict(raw: &str) -> LlmResult<SemanticVerdict> {
    let payload = extract_object(raw)
        .ok_or_else(|| LlmError::InvalidResponse(format!("no JSON object in reply: {raw:?}")))?;

    let value: Value = serde_json::from_str(payload).unwrap_or(Value::Null);

    let allowed_field = value.get("allowed").and_then(coerce_bool);
    let score_field = value.get("risk_score").and_then(coerce_score);
    let reason_field = value
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let uncertain = value
        .get("uncertain")
        .and_then(coerce_bool)
        .unwrap_or(false);

    let allowed = match (allowed_field, score_field) {
        (Some(allowed), _) => allowed,
        (None, Some(score)) => score.value() < 5,
        (None, None) => false,
    };
    let risk_score = score_field.unwrap_or(if allowed_field.is_none() {
        RiskScore::MAX
    } else {
        RiskScore::new(5)
    });
    let reason = reason_field
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "incomplete auditor response".to_string());

    Ok(SemanticVerdict {
        allowed,
        risk_score,
        reason,
        uncertain,
    })
}

/// The substring from the first `{` to the last `}`, if any.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_score(value: &Value) -> Option<RiskScore> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(RiskScore::from_i64),
        Value::String(s) => s.trim().parse::<i64>().ok().map(RiskScore::from_i64),
        _ => None,
    }
}
