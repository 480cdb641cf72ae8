//! Command types.
//!
//! [`Command`] is the raw, untouched input; [`NormalizedCommand`] is the
//! decoded form produced by the normalizer. Matching runs against the
//! normalized text, execution always uses the raw text — substituting the
//! normalized form could alter the semantics of a legitimate command.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw command string as submitted by the agent.
///
/// Immutable once submitted; may contain multi-byte characters and escape
/// sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    /// Wrap a raw command string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw command text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper, yielding the raw text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether the command is empty or whitespace-only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Command {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Command {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// The canonical, decoded form of a command, used for analysis only.
///
/// Produced by the normalizer. Normalization is idempotent: normalizing a
/// `NormalizedCommand`'s text again yields the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCommand {
    text: String,
    contains_encoded_payload: bool,
}

impl NormalizedCommand {
    /// Assemble a normalized command. Only the normalizer should call this;
    /// it exists publicly so the semantic auditor crate can be tested
    /// without depending on the audit crate.
    #[must_use]
    pub fn new(text: impl Into<String>, contains_encoded_payload: bool) -> Self {
        Self {
            text: text.into(),
            contains_encoded_payload,
        }
    }

    /// The canonical text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the raw command carried an obfuscation-pipeline signature
    /// (e.g. base64-decode piped into a shell) that the normalizer flagged
    /// without fully decoding.
    #[must_use]
    pub fn contains_encoded_payload(&self) -> bool {
        self.contains_encoded_payload
    }

    /// Whether the canonical text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for NormalizedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
