//! Sentinel LLM - The semantic second-opinion capability boundary.
//!
//! The audit runtime consumes reasoning backends exclusively through the
//! [`SemanticAuditor`] trait: submit a normalized command plus policy
//! context, receive a [`SemanticVerdict`] or a failure. Any failure —
//! timeout, throttle, malformed reply — is mapped by the runtime to a
//! fail-closed rejection; nothing in this crate ever allows by default.
//!
//! The semantic layer is stateless per call: no session memory of prior
//! commands influences a verdict.
//!
//! # Example
//!
//! ```
//! use sentinel_llm::parse_verdict;
//!
//! let verdict = parse_verdict(
//!     r#"Here is my analysis: {"allowed": false, "risk_score": 9, "reason": "exfiltration"}"#,
//! ).unwrap();
//! assert!(!verdict.allowed);
//! assert_eq!(verdict.risk_score.value(), 9);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod auditor;
mod error;
mod gemini;
mod parse;
mod throttle;

pub use auditor::{PolicyContext, SemanticAuditor, SemanticConfig, SemanticVerdict};
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiAuditor;
pub use parse::parse_verdict;
pub use throttle::Throttle;
