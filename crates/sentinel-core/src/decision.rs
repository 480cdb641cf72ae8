//! Audit decision types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a decision on a 0–10 scale.
///
/// Used for logging and prioritization, never as the sole allow/block
/// criterion. Construction clamps out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u8);

impl RiskScore {
    /// The maximum score (hard rejection).
    pub const MAX: Self = Self(10);

    /// The minimum score (no identified risk).
    pub const MIN: Self = Self(0);

    /// Create a score, clamping to the 0–10 range.
    #[must_use]
    pub fn new(score: u8) -> Self {
        Self(score.min(10))
    }

    /// Create a score from a wider integer, clamping to the 0–10 range.
    /// Negative values clamp to zero.
    #[must_use]
    pub fn from_i64(score: i64) -> Self {
        Self(u8::try_from(score.clamp(0, 10)).unwrap_or(10))
    }

    /// The numeric value.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which layer of the pipeline produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// The deterministic hard-kill filter.
    Deterministic,
    /// The LLM-backed semantic auditor.
    Semantic,
    /// The fail-closed policy default (semantic layer unavailable, internal
    /// error, or human resolution of a pending request).
    PolicyDefault,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deterministic => write!(f, "deterministic"),
            Self::Semantic => write!(f, "semantic"),
            Self::PolicyDefault => write!(f, "policy_default"),
        }
    }
}

/// The result of the audit pipeline for a single command.
///
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDecision {
    /// Whether the command may be handed to the shell.
    pub allowed: bool,
    /// Human-readable rationale, naming the rule or reasoning that fired.
    pub reason: String,
    /// Severity assigned to this decision.
    pub risk_score: RiskScore,
    /// The pipeline layer that produced this decision.
    pub source: DecisionSource,
}

impl AuditDecision {
    /// Create an allowing decision.
    #[must_use]
    pub fn allow(reason: impl Into<String>, risk_score: RiskScore, source: DecisionSource) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            risk_score,
            source,
        }
    }

    /// Create a rejecting decision with maximum risk.
    #[must_use]
    pub fn reject(reason: impl Into<String>, source: DecisionSource) -> Self {
        Self::reject_scored(reason, RiskScore::MAX, source)
    }

    /// Create a rejecting decision with an explicit risk score.
    #[must_use]
    pub fn reject_scored(
        reason: impl Into<String>,
        risk_score: RiskScore,
        source: DecisionSource,
    ) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            risk_score,
            source,
        }
    }

    /// The fail-closed decision applied when the semantic layer is
    /// unavailable or errored.
    #[must_use]
    pub fn fail_closed(reason: impl Into<String>) -> Self {
        Self::reject_scored(reason, RiskScore::MAX, DecisionSource::PolicyDefault)
    }
}

impl fmt::Display for AuditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (risk {}, {}): {}",
            if self.allowed { "allow" } else { "block" },
            self.risk_score,
            self.source,
            self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_score_clamps() {
        assert_eq!(RiskScore::new(15).value(), 10);
        assert_eq!(RiskScore::from_i64(-3).value(), 0);
        assert_eq!(RiskScore::from_i64(100).value(), 10);
        assert_eq!(RiskScore::new(7).value(), 7);
    }

    #[test]
    fn reject_defaults_to_max_risk() {
        let decision = AuditDecision::reject("blocked token: sudo", DecisionSource::Deterministic);
        assert!(!decision.allowed);
        assert_eq!(decision.risk_score, RiskScore::MAX);
        assert_eq!(decision.source, DecisionSource::Deterministic);
    }

    #[test]
    fn fail_closed_uses_policy_default_source() {
        let decision = AuditDecision::fail_closed("semantic layer unavailable: fail-closed");
        assert!(!decision.allowed);
        assert_eq!(decision.source, DecisionSource::PolicyDefault);
    }

    #[test]
    fn decision_serializes_with_snake_case_source() {
        let decision = AuditDecision::allow("ok", RiskScore::MIN, DecisionSource::Semantic);
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"semantic\""));
        let back: AuditDecision = serde_json::from_str(&json).unwrap();
        assert!(back.allowed);
    }
}
