//! Pending request and status types.

use serde::{Deserialize, Serialize};
use std::fmt;

use sentinel_core::{Command, RequestId, RiskScore, Timestamp};

/// Lifecycle state of a pending request.
///
/// The only legal transitions are out of [`Pending`](Self::Pending); every
/// other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting human resolution.
    Pending,
    /// Approved by a human; the command was handed to the executor.
    Approved,
    /// Denied by a human.
    Denied,
    /// TTL elapsed without resolution; treated as an implicit denial.
    Expired,
}

impl RequestStatus {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A command awaiting human approval.
///
/// Created when the audit pipeline escalates instead of deciding. The raw
/// command is preserved untouched for eventual execution; the normalized
/// form is carried for operator display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The raw command as submitted.
    pub command: Command,
    /// The normalized form shown to the approver.
    pub normalized: String,
    /// Why the pipeline escalated.
    pub reason: String,
    /// Risk score assigned at escalation time.
    pub risk_score: RiskScore,
    /// When the request was created.
    pub created_at: Timestamp,
    /// Current lifecycle state.
    pub status: RequestStatus,
    /// When the request left `PENDING`, if it has.
    pub resolved_at: Option<Timestamp>,
    /// Who resolved it (`"ttl"` for expiry).
    pub resolved_by: Option<String>,
}

impl PendingRequest {
    /// Create a new pending request.
    #[must_use]
    pub fn new(
        command: Command,
        normalized: impl Into<String>,
        reason: impl Into<String>,
        risk_score: RiskScore,
    ) -> Self {
        Self {
            id: RequestId::new(),
            command,
            normalized: normalized.into(),
            reason: reason.into(),
            risk_score,
            created_at: Timestamp::now(),
            status: RequestStatus::Pending,
            resolved_at: None,
            resolved_by: None,
        }
    }

    /// Whether the request is still awaiting resolution.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

impl fmt::Display for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (risk {}): {}",
            self.status, self.id, self.risk_score, self.reason
        )
    }
}
