//! Sentinel Policy - The "constitution" as immutable configuration.
//!
//! The constitution is a declarative YAML document loaded once at startup.
//! It is flattened into a read-only [`Policy`] snapshot consumed by the
//! audit pipeline. Reloading is an atomic [`Arc`](std::sync::Arc) swap via
//! [`PolicyHandle`] — an in-flight audit keeps the snapshot it started
//! with, so no partial update is ever visible mid-audit.
//!
//! # Example
//!
//! ```
//! use sentinel_policy::{Constitution, Policy, PolicyHandle};
//!
//! let constitution = Constitution::default();
//! let policy = Policy::from_constitution(&constitution, None);
//! assert!(policy.blocked_strings.iter().any(|s| s == "sudo"));
//!
//! let handle = PolicyHandle::new(policy);
//! let snapshot = handle.current();
//! assert!(!snapshot.lockdown_mode);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod constitution;
mod error;
mod loader;
mod policy;

pub use constitution::{
    Constitution, ExecutionModeSection, HardKillSection, NetworkLockSection, ReviewSection,
};
pub use error::{PolicyError, PolicyResult};
pub use loader::load_constitution;
pub use policy::{BlockedPath, Policy, PolicyHandle};
