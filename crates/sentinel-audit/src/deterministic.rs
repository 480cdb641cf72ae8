//! The deterministic hard-kill filter.
//!
//! Single-pass substring, token, and path matching against the active
//! policy snapshot. No I/O, no allocation beyond the lowercased text. A
//! rejection here is final; a `None` verdict defers to the semantic layer.

use sentinel_core::{AuditDecision, DecisionSource, NormalizedCommand, RiskScore, shell};
use sentinel_policy::Policy;

/// Audit a normalized command against the policy's hard rules.
///
/// Rules run in a fixed order and the first match wins: lockdown
/// allowlisting, blocked substrings, blocked paths, blocked leading tools,
/// and the network-tool domain allowlist. Commands that match no rule
/// return `None`, including flagged encoded payloads, which are never
/// auto-approved here.
#[must_use]
pub fn audit(command: &NormalizedCommand, policy: &Policy) -> Option<AuditDecision> {
    let text = command.text();
    if command.is_empty() {
        return Some(reject("empty command"));
    }
    let lowered = text.to_lowercase();

    if policy.lockdown_mode {
        return Some(lockdown_verdict(text, policy));
    }

    if let Some(entry) = policy
        .blocked_strings
        .iter()
        .find(|entry| lowered.contains(&entry.to_lowercase()))
    {
        return Some(reject(format!("blocked token: {entry}")));
    }

    if let Some(path) = policy.blocked_paths.iter().find(|p| p.matches(&lowered)) {
        return Some(reject(format!("blocked path: {}", path.pattern)));
    }

    let leading = shell::leading_executable(text);
    if let Some(leading) = &leading
        && let Some(tool) = policy
            .blocked_tools
            .iter()
            .find(|tool| tool_matches(leading, tool))
    {
        return Some(reject(format!("blocked tool: {tool}")));
    }

    if let Some(leading) = &leading
        && policy.network_tools.contains(leading.as_str())
    {
        let domains = extract_domains(text);
        if domains.is_empty() {
            // No identifiable target host is itself suspicious.
            return Some(reject("domain not whitelisted"));
        }
        if let Some(domain) = domains.iter().find(|d| !policy.is_domain_allowed(d)) {
            return Some(reject(format!("domain not whitelisted: {domain}")));
        }
    }

    None
}

fn reject(reason: impl Into<String>) -> AuditDecision {
    AuditDecision::reject(reason, DecisionSource::Deterministic)
}

/// In lockdown only allowlisted leading tokens run, and only as plain
/// commands: control operators would let an allowlisted token front
/// arbitrary ones.
fn lockdown_verdict(text: &str, policy: &Policy) -> AuditDecision {
    if shell::has_control_operators(text) {
        return reject("lockdown: shell control operators not allowed");
    }
    match shell::leading_executable(text) {
        Some(leading) if policy.allowed_commands_in_lockdown.contains(&leading) => {
            AuditDecision::allow(
                format!("lockdown: {leading} is allowlisted"),
                RiskScore::MIN,
                DecisionSource::Deterministic,
            )
        },
        _ => reject("lockdown: not allowlisted"),
    }
}

/// A leading token matches a blocked tool exactly or as a versioned
/// variant (`python3`, `python3.12`, `pip3`).
fn tool_matches(leading: &str, tool: &str) -> bool {
    if leading == tool {
        return true;
    }
    leading
        .strip_prefix(tool)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
}

/// Candidate target hosts mentioned in the command. Scheme-prefixed URLs
/// are authoritative when present; only without any does the extractor
/// fall back to bare tokens that look like a host name, so filenames and
/// version strings next to a real URL do not masquerade as targets.
fn extract_domains(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = text
        .split_whitespace()
        .filter(|token| !token.starts_with('-'))
        .collect();

    let explicit: Vec<String> = tokens
        .iter()
        .filter(|token| token.contains("://"))
        .filter_map(|token| host_of(token))
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    tokens.into_iter().filter_map(host_of).collect()
}

fn host_of(token: &str) -> Option<String> {
    let rest = match token.split_once("://") {
        Some((_, rest)) => rest,
        None => token,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    // Strip userinfo and port.
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    let plausible = !host.is_empty()
        && host.contains('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    (plausible || token.contains("://")).then(|| host.to_lowercase())
}
