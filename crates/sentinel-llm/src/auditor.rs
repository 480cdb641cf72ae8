//! The semantic auditor trait and its verdict type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use sentinel_core::{AuditDecision, DecisionSource, NormalizedCommand, RiskScore};

use crate::error::LlmResult;

/// Policy context handed to the semantic auditor alongside the command.
///
/// Kept deliberately flat: a one-paragraph policy summary plus any risk
/// hints the deterministic layer surfaced (e.g. an encoded-payload signal).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyContext {
    /// Summary of the active policy snapshot.
    pub policy_summary: String,
    /// Signals from earlier pipeline stages.
    pub risk_hints: Vec<String>,
}

impl PolicyContext {
    /// Create a context from a policy summary.
    #[must_use]
    pub fn new(policy_summary: impl Into<String>) -> Self {
        Self {
            policy_summary: policy_summary.into(),
            risk_hints: Vec::new(),
        }
    }

    /// Add a risk hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.risk_hints.push(hint.into());
        self
    }
}

/// A verdict returned by a reasoning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticVerdict {
    /// Whether the backend considers the command safe to execute.
    pub allowed: bool,
    /// Assessed severity.
    pub risk_score: RiskScore,
    /// Human-readable rationale.
    pub reason: String,
    /// The backend could not reach a confident verdict; the runtime routes
    /// uncertain commands to human approval rather than allowing them.
    pub uncertain: bool,
}

impl SemanticVerdict {
    /// Convert into a pipeline decision with `source = Semantic`.
    #[must_use]
    pub fn into_decision(self) -> AuditDecision {
        if self.allowed {
            AuditDecision::allow(self.reason, self.risk_score, DecisionSource::Semantic)
        } else {
            AuditDecision::reject_scored(self.reason, self.risk_score, DecisionSource::Semantic)
        }
    }
}

impl fmt::Display for SemanticVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (risk {}{}): {}",
            if self.allowed { "allow" } else { "block" },
            self.risk_score,
            if self.uncertain { ", uncertain" } else { "" },
            self.reason
        )
    }
}

/// A reasoning backend capable of judging a normalized command.
///
/// Implementations must be stateless per call — a verdict may not depend on
/// previously audited commands — and must not hold locks across the network
/// round trip. The runtime enforces a ceiling timeout around [`review`]
/// (see [`SemanticAuditor::review`]); exceeding it is treated as failure,
/// not as a hang.
#[async_trait]
pub trait SemanticAuditor: Send + Sync {
    /// The backend name, for logs and health reporting.
    fn name(&self) -> &str;

    /// Judge a normalized command under the given policy context.
    ///
    /// # Errors
    ///
    /// Any [`LlmError`](crate::LlmError) — transport failure, throttling,
    /// unparseable reply — is converted by the caller into a fail-closed
    /// rejection.
    async fn review(
        &self,
        command: &NormalizedCommand,
        context: &PolicyContext,
    ) -> LlmResult<SemanticVerdict>;
}

#[async_trait]
impl SemanticAuditor for Box<dyn SemanticAuditor> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn review(
        &self,
        command: &NormalizedCommand,
        context: &PolicyContext,
    ) -> LlmResult<SemanticVerdict> {
        (**self).review(command, context).await
    }
}

/// Configuration for HTTP-backed semantic auditors.
#[derive(Clone)]
pub struct SemanticConfig {
    /// Provider API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Override for the provider base URL (tests point this at a stub).
    pub base_url: Option<String>,
    /// Client-side request timeout.
    pub timeout: Duration,
}

impl SemanticConfig {
    /// Create a config with an API key and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for SemanticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticConfig")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("has_base_url", &self.base_url.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_converts_to_decision() {
        let verdict = SemanticVerdict {
            allowed: true,
            risk_score: RiskScore::new(1),
            reason: "routine directory listing".to_string(),
            uncertain: false,
        };
        let decision = verdict.into_decision();
        assert!(decision.allowed);
        assert_eq!(decision.source, DecisionSource::Semantic);
    }

    #[test]
    fn config_debug_redacts_key() {
        let config = SemanticConfig::new("secret-key", "gemini-2.0-flash");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("has_api_key: true"));
    }
}
