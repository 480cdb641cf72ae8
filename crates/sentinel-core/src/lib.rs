//! Sentinel Core - Shared domain types for the command-audit gateway.
//!
//! This crate defines the vocabulary the rest of the workspace speaks:
//! - [`Command`] and [`NormalizedCommand`] — raw input vs. the decoded form
//!   used for analysis (never for execution)
//! - [`AuditDecision`], [`DecisionSource`], [`RiskScore`] — the result of
//!   the audit pipeline
//! - [`Timestamp`] and [`RequestId`] — time and identity primitives
//! - [`shell`] — a small POSIX-style tokenizer shared by the deterministic
//!   auditor and the executor
//!
//! # Example
//!
//! ```
//! use sentinel_core::{AuditDecision, Command, DecisionSource};
//!
//! let command = Command::new("ls -la");
//! let decision = AuditDecision::reject("Blocked token detected: sudo", DecisionSource::Deterministic);
//! assert!(!decision.allowed);
//! assert_eq!(decision.risk_score.value(), 10);
//! assert_eq!(command.as_str(), "ls -la");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod shell;

mod command;
mod decision;
mod types;

pub use command::{Command, NormalizedCommand};
pub use decision::{AuditDecision, DecisionSource, RiskScore};
pub use types::{RequestId, Timestamp};
