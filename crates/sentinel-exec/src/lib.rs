//! Sentinel Exec - Bounded execution of approved commands.
//!
//! The executor is deliberately the dumbest part of the gateway: it runs
//! exactly the raw command text it is given (never the normalized form,
//! which is an analysis artifact), under a hard timeout, and reports what
//! happened. Whether a command *should* run was decided upstream.
//!
//! A timed-out process is forcibly killed; output captured up to that point
//! is preserved on the error for the audit trail.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod executor;

pub use executor::{ExecError, ExecOutput, ExecResult, Executor, DEFAULT_TIMEOUT_SECS};
