//! Sentinel Audit - The layered command-audit pipeline.
//!
//! Every command passes through the same sequence: the [`normalize`]
//! function decodes obfuscation into a canonical form, the
//! [`deterministic`] filter applies the policy's hard rules, and anything
//! the rules cannot settle goes to the semantic auditor or, when it is
//! unavailable or unsure, fails closed or escalates to a human. The
//! [`AuditRuntime`] owns that orchestration and guarantees two invariants:
//! no command executes without exactly one terminal allow, and every
//! command ends up with exactly one [`AuditLogEntry`].
//!
//! # Example
//!
//! ```
//! use sentinel_audit::normalize;
//!
//! // Hex escapes decode before any rule is matched.
//! let normalized = normalize(r"\x73\x75\x64\x6f ls");
//! assert_eq!(normalized.text(), "sudo ls");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod deterministic;

mod log;
mod normalize;
mod runtime;

pub use log::{AuditLog, AuditLogEntry, AuditSink, JsonlAuditSink, MemoryAuditSink};
pub use normalize::normalize;
pub use runtime::{AuditOutcome, AuditRuntime};
