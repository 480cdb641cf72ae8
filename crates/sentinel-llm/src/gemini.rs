//! Gemini (Google) semantic auditor implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use sentinel_core::NormalizedCommand;

use crate::auditor::{PolicyContext, SemanticAuditor, SemanticConfig, SemanticVerdict};
use crate::error::{LlmError, LlmResult};
use crate::parse::parse_verdict;
use crate::throttle::Throttle;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SYSTEM_INSTRUCTION: &str = "You are a command auditor for an autonomous agent's shell. \
Your sole purpose is to analyze shell commands for malicious intent, resource abuse, data \
exfiltration, or sandbox escape. You must return a structured JSON response with exactly \
these keys: 'allowed' (boolean), 'risk_score' (integer 0-10), 'reason' (string), and \
optionally 'uncertain' (boolean, true when you cannot reach a confident verdict). \
Apply zero-trust, fail-closed logic: when in doubt, reject or mark uncertain.";

/// Gemini-backed semantic auditor.
///
/// Each call is stateless: the request carries only the command under review
/// and the policy context, never prior verdicts. A sliding-window throttle
/// refuses calls before they reach the network once the budget is spent.
pub struct GeminiAuditor {
    client: Client,
    config: SemanticConfig,
    throttle: Throttle,
}

impl GeminiAuditor {
    /// Create a new Gemini auditor.
    #[must_use]
    pub fn new(config: SemanticConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            throttle: Throttle::default(),
        }
    }

    /// Replace the default throttle (tests use tighter windows).
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Build the API request body.
    fn build_request(&self, command: &NormalizedCommand, context: &PolicyContext) -> Value {
        serde_json::json!({
            "system_instruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(command, context) }]
            }],
            "generationConfig": {
                "temperature": 0.0,
                "response_mime_type": "application/json",
            },
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(GEMINI_API_URL);
        format!(
            "{}/models/{}:generateContent",
            base.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// The user prompt: command first, then policy context, then hints.
fn build_prompt(command: &NormalizedCommand, context: &PolicyContext) -> String {
    let mut prompt = format!(
        "Analyze this raw shell string as a SINGLE SEMANTIC UNIT. Chained or \
         substituted sub-commands do not dilute the risk of the whole.\n\n\
         COMMAND:\n{}\n",
        command.text()
    );
    if !context.policy_summary.is_empty() {
        prompt.push_str(&format!("\nACTIVE POLICY:\n{}\n", context.policy_summary));
    }
    if !context.risk_hints.is_empty() {
        prompt.push_str("\nSIGNALS FROM THE DETERMINISTIC LAYER:\n");
        for hint in &context.risk_hints {
            prompt.push_str(&format!("- {hint}\n"));
        }
    }
    prompt.push_str(
        "\nReturn JSON only, with keys: allowed (bool), risk_score (0-10 int), \
         reason (string), uncertain (bool, optional).",
    );
    prompt
}

#[async_trait]
impl SemanticAuditor for GeminiAuditor {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "Google Gemini"
    }

    async fn review(
        &self,
        command: &NormalizedCommand,
        context: &PolicyContext,
    ) -> LlmResult<SemanticVerdict> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "gemini".to_string(),
            });
        }

        self.throttle.admit()?;

        let mut api_key_header = reqwest::header::HeaderValue::try_from(&self.config.api_key)
            .map_err(|e| LlmError::ApiRequestFailed(format!("invalid API key characters: {e}")))?;
        api_key_header.set_sensitive(true);

        let request_body = self.build_request(command, context);

        debug!(model = %self.config.model, "Sending Gemini audit request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key_header)
            .header("content-type", "application/json")
            .timeout(self.config.timeout)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Gemini API error");

            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited {
                    retry_after_secs: 60,
                });
            }

            return Err(LlmError::ApiRequestFailed(format!(
                "Status {status}: {body}"
            )));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = extract_text(&api_response)
            .ok_or_else(|| LlmError::InvalidResponse("reply has no text parts".to_string()))?;

        parse_verdict(&text)
    }
}

/// Concatenated text of the first candidate's parts.
fn extract_text(response: &ApiResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.is_empty()).then_some(text)
}

// API response types

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
