//! Pipeline orchestration.
//!
//! [`AuditRuntime`] wires the normalizer, the deterministic filter, the
//! semantic auditor, and the approval queue into one state machine. Its
//! contract: every audited command reaches exactly one terminal outcome,
//! every terminal outcome is logged exactly once, and any failure on the
//! way resolves to a block, never an allow.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use sentinel_approval::{ApprovalQueue, PendingRequest, RequestStatus};
use sentinel_core::{
    AuditDecision, Command, DecisionSource, NormalizedCommand, RequestId, RiskScore,
};
use sentinel_llm::{PolicyContext, SemanticAuditor};
use sentinel_policy::PolicyHandle;

use crate::deterministic;
use crate::log::{AuditLog, AuditLogEntry};
use crate::normalize::normalize;

/// Reason attached to every fail-closed rejection of the semantic stage.
pub const FAIL_CLOSED_REASON: &str = "semantic layer unavailable: fail-closed";

const DEFAULT_SEMANTIC_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminal outcome of auditing one command.
#[derive(Debug, Clone)]
pub enum AuditOutcome {
    /// The command may be executed.
    Allow(AuditDecision),
    /// The command must not be executed.
    Block(AuditDecision),
    /// The command awaits human approval; it must not execute until the
    /// request resolves to approved.
    Pending {
        /// Id of the enqueued request.
        id: RequestId,
        /// Why the pipeline escalated.
        reason: String,
        /// Risk score at escalation time.
        risk_score: RiskScore,
    },
}

impl AuditOutcome {
    /// Whether this outcome permits immediate execution.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// The decision, for terminal outcomes.
    #[must_use]
    pub fn decision(&self) -> Option<&AuditDecision> {
        match self {
            Self::Allow(decision) | Self::Block(decision) => Some(decision),
            Self::Pending { .. } => None,
        }
    }
}

/// The audit pipeline orchestrator.
pub struct AuditRuntime {
    policy: Arc<PolicyHandle>,
    queue: Arc<ApprovalQueue>,
    log: AuditLog,
    semantic: Option<Arc<dyn SemanticAuditor>>,
    semantic_timeout: Duration,
}

impl AuditRuntime {
    /// Create a runtime without a semantic layer; until one is attached via
    /// [`with_semantic`](Self::with_semantic), everything the deterministic
    /// filter does not settle fails closed.
    #[must_use]
    pub fn new(policy: Arc<PolicyHandle>, queue: Arc<ApprovalQueue>, log: AuditLog) -> Self {
        Self {
            policy,
            queue,
            log,
            semantic: None,
            semantic_timeout: DEFAULT_SEMANTIC_TIMEOUT,
        }
    }

    /// Attach a semantic auditor.
    #[must_use]
    pub fn with_semantic(mut self, semantic: Arc<dyn SemanticAuditor>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Ceiling timeout for a semantic call; exceeding it fails closed.
    #[must_use]
    pub fn with_semantic_timeout(mut self, timeout: Duration) -> Self {
        self.semantic_timeout = timeout;
        self
    }

    /// Whether a semantic layer is attached.
    #[must_use]
    pub fn has_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    /// The approval queue this runtime escalates into.
    #[must_use]
    pub fn queue(&self) -> &Arc<ApprovalQueue> {
        &self.queue
    }

    /// Audit one command to a terminal outcome.
    ///
    /// The pipeline runs on a detached task: if the caller disconnects and
    /// this future is dropped mid-flight, the command still reaches a
    /// terminal decision and its audit record is still written.
    pub async fn audit(self: &Arc<Self>, command: Command) -> AuditOutcome {
        let runtime = Arc::clone(self);
        let task_command = command.clone();
        let handle = tokio::spawn(async move { runtime.run_pipeline(task_command).await });
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "audit task failed, failing closed");
                let normalized = normalize(command.as_str());
                let decision = AuditDecision::fail_closed(FAIL_CLOSED_REASON);
                self.log
                    .record(&AuditLogEntry::new(&command, &normalized, decision.clone()));
                AuditOutcome::Block(decision)
            },
        }
    }

    /// Write the audit record for a resolved pending request.
    ///
    /// Escalation itself is not logged; the one record for an escalated
    /// command is written here, when a human (or the TTL) settles it.
    pub fn record_resolution(&self, request: &PendingRequest) {
        let actor = request.resolved_by.as_deref().unwrap_or("unknown");
        let decision = match request.status {
            RequestStatus::Pending => return,
            RequestStatus::Approved => AuditDecision::allow(
                format!("approved by {actor}"),
                request.risk_score,
                DecisionSource::PolicyDefault,
            ),
            RequestStatus::Denied => AuditDecision::reject_scored(
                format!("denied by {actor}"),
                request.risk_score,
                DecisionSource::PolicyDefault,
            ),
            RequestStatus::Expired => AuditDecision::reject_scored(
                "approval expired: implicit denial",
                request.risk_score,
                DecisionSource::PolicyDefault,
            ),
        };
        let normalized = NormalizedCommand::new(request.normalized.clone(), false);
        self.log
            .record(&AuditLogEntry::new(&request.command, &normalized, decision));
    }

    async fn run_pipeline(&self, command: Command) -> AuditOutcome {
        let normalized = normalize(command.as_str());
        let policy = self.policy.current();

        if let Some(decision) = deterministic::audit(&normalized, &policy) {
            return self.finish(&command, &normalized, decision);
        }

        // Sensitive-but-not-blocked paths go straight to a human.
        let lowered = normalized.text().to_lowercase();
        if let Some(path) = policy.review_paths.iter().find(|p| p.matches(&lowered)) {
            return self.escalate(
                &command,
                &normalized,
                format!("references review-listed path: {}", path.pattern),
                policy.review_threshold,
            );
        }

        let Some(semantic) = &self.semantic else {
            return self.finish(
                &command,
                &normalized,
                AuditDecision::fail_closed(FAIL_CLOSED_REASON),
            );
        };

        let mut context = PolicyContext::new(policy.summary());
        if normalized.contains_encoded_payload() {
            context =
                context.with_hint("embeds an encoded payload (decode-and-execute composition)");
        }

        let review = tokio::time::timeout(
            self.semantic_timeout,
            semantic.review(&normalized, &context),
        )
        .await;

        let verdict = match review {
            Err(_) => {
                warn!(
                    auditor = semantic.name(),
                    timeout_secs = self.semantic_timeout.as_secs(),
                    "semantic audit timed out, failing closed"
                );
                return self.finish(
                    &command,
                    &normalized,
                    AuditDecision::fail_closed(FAIL_CLOSED_REASON),
                );
            },
            Ok(Err(e)) => {
                warn!(auditor = semantic.name(), error = %e, "semantic audit failed, failing closed");
                return self.finish(
                    &command,
                    &normalized,
                    AuditDecision::fail_closed(FAIL_CLOSED_REASON),
                );
            },
            Ok(Ok(verdict)) => verdict,
        };

        if verdict.uncertain {
            return self.escalate(
                &command,
                &normalized,
                format!("semantic auditor uncertain: {}", verdict.reason),
                verdict.risk_score,
            );
        }
        if verdict.allowed && verdict.risk_score >= policy.review_threshold {
            return self.escalate(
                &command,
                &normalized,
                format!(
                    "risk {} meets review threshold {}: {}",
                    verdict.risk_score, policy.review_threshold, verdict.reason
                ),
                verdict.risk_score,
            );
        }
        self.finish(&command, &normalized, verdict.into_decision())
    }

    fn finish(
        &self,
        command: &Command,
        normalized: &NormalizedCommand,
        decision: AuditDecision,
    ) -> AuditOutcome {
        info!(
            allowed = decision.allowed,
            risk = %decision.risk_score,
            source = %decision.source,
            reason = %decision.reason,
            "audit complete"
        );
        self.log
            .record(&AuditLogEntry::new(command, normalized, decision.clone()));
        if decision.allowed {
            AuditOutcome::Allow(decision)
        } else {
            AuditOutcome::Block(decision)
        }
    }

    fn escalate(
        &self,
        command: &Command,
        normalized: &NormalizedCommand,
        reason: String,
        risk_score: RiskScore,
    ) -> AuditOutcome {
        let request = PendingRequest::new(
            command.clone(),
            normalized.text(),
            reason.clone(),
            risk_score,
        );
        let id = self.queue.enqueue(request);
        AuditOutcome::Pending {
            id,
            reason,
            risk_score,
        }
    }
}

impl std::fmt::Debug for AuditRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRuntime")
            .field("has_semantic", &self.semantic.is_some())
            .field("semantic_timeout", &self.semantic_timeout)
            .finish_non_exhaustive()
    }
}
