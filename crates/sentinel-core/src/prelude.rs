//! Convenience re-exports of the most commonly used types.

pub use crate::command::{Command, NormalizedCommand};
pub use crate::decision::{AuditDecision, DecisionSource, RiskScore};
pub use crate::types::{RequestId, Timestamp};
