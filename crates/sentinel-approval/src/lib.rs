//! Sentinel Approval - Human-in-the-loop pending-request queue.
//!
//! When the audit pipeline cannot clear a command on its own, it parks the
//! command here as a [`PendingRequest`] and returns without executing. A
//! human approver later resolves the request through the API; until then
//! the command does not run, and if nobody resolves it before the TTL it
//! expires, which counts as a denial.
//!
//! Status transitions are atomic and exclusive per request id. A racing
//! approve and expire cannot both succeed; whichever transition lands first
//! wins and the loser observes a conflict.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use sentinel_approval::{ApprovalQueue, PendingRequest, RequestStatus};
//! use sentinel_core::{Command, RiskScore};
//!
//! let queue = ApprovalQueue::new(Duration::from_secs(300));
//! let request = PendingRequest::new(
//!     Command::new("cargo publish"),
//!     "cargo publish",
//!     "irreversible release step",
//!     RiskScore::new(7),
//! );
//! let id = queue.enqueue(request);
//!
//! let resolved = queue.approve(id, "operator").unwrap();
//! assert_eq!(resolved.status, RequestStatus::Approved);
//! assert!(queue.approve(id, "operator").is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod queue;
mod request;

pub use error::{ApprovalError, ApprovalResult};
pub use queue::ApprovalQueue;
pub use request::{PendingRequest, RequestStatus};

pub use sentinel_core::RequestId;
