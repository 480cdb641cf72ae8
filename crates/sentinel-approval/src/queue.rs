//! The concurrent approval queue.

use std::time::Duration;

use dashmap::DashMap;
use tracing::{info, warn};

use sentinel_core::{RequestId, Timestamp};

use crate::error::{ApprovalError, ApprovalResult};
use crate::request::{PendingRequest, RequestStatus};

/// How long resolved requests stay visible before the sweep removes them.
const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Concurrency-safe queue of commands awaiting human approval.
///
/// Per-id status transitions are serialized by the map's entry locks: a
/// transition holds the entry exclusively, checks the current status, and
/// either applies its change or reports a conflict. The pending snapshot
/// never blocks writers.
///
/// Expiry is enforced twice: a background sweep calls [`expire_stale`]
/// periodically, and [`approve`]/[`deny`] re-check the deadline under the
/// entry lock so a stale request can never be resolved between ticks.
///
/// [`expire_stale`]: Self::expire_stale
/// [`approve`]: Self::approve
/// [`deny`]: Self::deny
#[derive(Debug)]
pub struct ApprovalQueue {
    requests: DashMap<RequestId, PendingRequest>,
    ttl: Duration,
    retention: Duration,
}

impl ApprovalQueue {
    /// Create a queue whose pending requests expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            requests: DashMap::new(),
            ttl,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Override how long resolved requests are retained for inspection.
    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// The configured TTL for pending requests.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Add a request to the queue, returning its id.
    pub fn enqueue(&self, request: PendingRequest) -> RequestId {
        let id = request.id;
        info!(%id, risk = %request.risk_score, reason = %request.reason, "command escalated for approval");
        self.requests.insert(id, request);
        id
    }

    /// Point-in-time snapshot of requests still awaiting resolution.
    ///
    /// Requests past their TTL are omitted even if the sweep has not yet
    /// transitioned them; they can no longer be approved.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.requests
            .iter()
            .filter(|entry| entry.is_pending() && !self.past_ttl(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Look up a request by id.
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<PendingRequest> {
        self.requests.get(&id).map(|entry| entry.value().clone())
    }

    /// Approve a pending request.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::NotFound`] for an unknown id;
    /// [`ApprovalError::AlreadyResolved`] when the request has already been
    /// approved, denied, or swept as expired;
    /// [`ApprovalError::Expired`] when this call observed the TTL first and
    /// expired the request itself — the carried request must be recorded by
    /// the caller, as the sweep will not see it again.
    pub fn approve(&self, id: RequestId, actor: &str) -> ApprovalResult<PendingRequest> {
        self.resolve(id, actor, RequestStatus::Approved)
    }

    /// Deny a pending request.
    ///
    /// # Errors
    ///
    /// Same as [`approve`](Self::approve).
    pub fn deny(&self, id: RequestId, actor: &str) -> ApprovalResult<PendingRequest> {
        self.resolve(id, actor, RequestStatus::Denied)
    }

    /// Transition every over-TTL pending request to `EXPIRED`, returning the
    /// requests that expired in this pass, and drop resolved requests older
    /// than the retention window.
    pub fn expire_stale(&self) -> Vec<PendingRequest> {
        let mut expired = Vec::new();
        for mut entry in self.requests.iter_mut() {
            if entry.is_pending() && self.past_ttl(entry.value()) {
                Self::mark_expired(entry.value_mut());
                expired.push(entry.value().clone());
            }
        }

        let retention_secs = self.retention.as_secs();
        self.requests.retain(|_, request| {
            request.is_pending()
                || request
                    .resolved_at
                    .is_none_or(|at| at.age_secs() <= retention_secs)
        });

        expired
    }

    /// Number of requests currently held, in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the queue holds no requests at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn resolve(
        &self,
        id: RequestId,
        actor: &str,
        target: RequestStatus,
    ) -> ApprovalResult<PendingRequest> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(ApprovalError::NotFound { id })?;

        let request = entry.value_mut();
        if !request.is_pending() {
            return Err(ApprovalError::AlreadyResolved {
                id,
                status: request.status,
            });
        }

        // The entry lock is held: re-checking the deadline here means a
        // stale request can never be resolved, even between sweep ticks.
        // The just-expired request rides on the error; the sweep skips
        // non-pending entries, so this is the only report of the expiry.
        if self.past_ttl(request) {
            Self::mark_expired(request);
            return Err(ApprovalError::Expired {
                request: Box::new(request.clone()),
            });
        }

        request.status = target;
        request.resolved_at = Some(Timestamp::now());
        request.resolved_by = Some(actor.to_string());
        info!(%id, status = %target, %actor, "approval request resolved");
        Ok(request.clone())
    }

    fn past_ttl(&self, request: &PendingRequest) -> bool {
        request.created_at.age_secs() > self.ttl.as_secs()
    }

    fn mark_expired(request: &mut PendingRequest) {
        request.status = RequestStatus::Expired;
        request.resolved_at = Some(Timestamp::now());
        request.resolved_by = Some("ttl".to_string());
        warn!(id = %request.id, "approval request expired unresolved");
    }
}
