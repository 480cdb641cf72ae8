//! LLM-related error types.

use thiserror::Error;

/// Errors that can occur when consulting the semantic auditor.
///
/// Every variant resolves to a fail-closed rejection at the runtime
/// boundary; these errors exist so the audit log can name the cause.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// The request was throttled before reaching the provider.
    #[error("semantic auditor throttled, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the cooldown ends.
        retry_after_secs: u64,
    },

    /// The API request failed.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// The provider replied, but no usable verdict could be extracted.
    #[error("invalid auditor response: {0}")]
    InvalidResponse(String),

    /// HTTP transport error (includes client-side timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for semantic auditor operations.
pub type LlmResult<T> = Result<T, LlmError>;
