//! Approval queue error types.

use thiserror::Error;

use sentinel_core::RequestId;

use crate::request::{PendingRequest, RequestStatus};

/// Errors surfaced by the approval queue.
#[derive(Debug, Clone, Error)]
pub enum ApprovalError {
    /// No request with this id exists.
    #[error("approval request not found: {id}")]
    NotFound {
        /// The unknown request id.
        id: RequestId,
    },

    /// The request has already left the `PENDING` state; the attempted
    /// transition lost the race or arrived after resolution.
    #[error("approval request {id} already resolved: {status}")]
    AlreadyResolved {
        /// The contested request id.
        id: RequestId,
        /// The status the request already holds.
        status: RequestStatus,
    },

    /// The TTL elapsed before resolution; this call observed the deadline
    /// and performed the expiry transition itself. The expired request is
    /// carried so the caller can record the implicit denial, as the sweep
    /// will not report it again.
    #[error("approval request {} expired before resolution", request.id)]
    Expired {
        /// The request, now in the `Expired` state.
        request: Box<PendingRequest>,
    },
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
