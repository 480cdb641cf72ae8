//! Serde types for the constitution YAML document.
//!
//! Every section carries `#[serde(default)]` so a bare section header — or a
//! missing section — yields the production defaults the original deployment
//! shipped with.

use serde::{Deserialize, Serialize};

/// The root constitution document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Constitution {
    /// Deterministic hard-kill rules.
    pub hard_kill: HardKillSection,
    /// Network tool and domain allowlisting.
    pub network_lock: NetworkLockSection,
    /// Lockdown mode and its allowlist.
    pub execution_mode: ExecutionModeSection,
    /// Human-review routing.
    pub review: ReviewSection,
}

/// Deterministic blocklists applied before any semantic reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardKillSection {
    /// Substrings that reject a command outright (case-insensitive).
    pub blocked_strings: Vec<String>,
    /// Filesystem paths a command may never reference. `~` expands to the
    /// home directory at snapshot time.
    pub blocked_paths: Vec<String>,
    /// Executables that may never appear as the leading token.
    pub blocked_tools: Vec<String>,
}

impl Default for HardKillSection {
    fn default() -> Self {
        Self {
            blocked_strings: vec!["sudo".into(), "rm -rf".into(), "mkfs".into()],
            blocked_paths: vec!["~/.ssh".into(), "~/.env".into(), "/etc/".into()],
            blocked_tools: vec!["python".into(), "pip".into(), "npm".into()],
        }
    }
}

/// Outbound network restrictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkLockSection {
    /// Tools treated as network clients; their targets must be allowlisted.
    pub blocked_tools: Vec<String>,
    /// Domains (and their subdomains) network tools may contact.
    pub whitelisted_domains: Vec<String>,
}

impl Default for NetworkLockSection {
    fn default() -> Self {
        Self {
            blocked_tools: vec!["curl".into(), "wget".into()],
            whitelisted_domains: Vec::new(),
        }
    }
}

/// Lockdown mode: restrict execution to an explicit allowlist, ignoring all
/// other rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionModeSection {
    /// When true, only allowlisted commands run.
    pub lockdown_mode: bool,
    /// Leading tokens permitted while in lockdown.
    pub allowed_commands: Vec<String>,
}

/// Human-review routing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSection {
    /// A semantic verdict that allows with a risk score at or above this
    /// value escalates to human approval instead of executing.
    pub threshold: u8,
    /// Sensitive-but-not-hard-blocked paths; referencing one escalates
    /// directly to human approval without a semantic call.
    pub paths: Vec<String>,
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            threshold: 7,
            paths: Vec::new(),
        }
    }
}

impl Constitution {
    /// Validate list entries and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Validation`](crate::PolicyError::Validation)
    /// for empty list entries or an out-of-range review threshold.
    pub fn validate(&self) -> crate::PolicyResult<()> {
        let lists: [(&str, &[String]); 6] = [
            ("hard_kill.blocked_strings", &self.hard_kill.blocked_strings),
            ("hard_kill.blocked_paths", &self.hard_kill.blocked_paths),
            ("hard_kill.blocked_tools", &self.hard_kill.blocked_tools),
            ("network_lock.blocked_tools", &self.network_lock.blocked_tools),
            (
                "network_lock.whitelisted_domains",
                &self.network_lock.whitelisted_domains,
            ),
            (
                "execution_mode.allowed_commands",
                &self.execution_mode.allowed_commands,
            ),
        ];
        for (name, entries) in lists {
            if entries.iter().any(|e| e.trim().is_empty()) {
                return Err(crate::PolicyError::Validation(format!(
                    "{name} contains an empty entry"
                )));
            }
        }
        if self.review.threshold > 10 {
            return Err(crate::PolicyError::Validation(format!(
                "review.threshold must be 0-10, got {}",
                self.review.threshold
            )));
        }
        if self.execution_mode.lockdown_mode && self.execution_mode.allowed_commands.is_empty() {
            tracing::warn!("lockdown_mode is active with an empty allowlist; all commands will be rejected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_blocklists() {
        let constitution = Constitution::default();
        assert!(constitution.hard_kill.blocked_strings.contains(&"sudo".to_string()));
        assert!(constitution.network_lock.blocked_tools.contains(&"curl".to_string()));
        assert!(!constitution.execution_mode.lockdown_mode);
        assert_eq!(constitution.review.threshold, 7);
    }

    #[test]
    fn bare_sections_deserialize_to_defaults() {
        let constitution: Constitution = serde_yaml::from_str("hard_kill:\nnetwork_lock:\n").unwrap();
        assert_eq!(constitution.hard_kill.blocked_tools.len(), 3);
    }

    #[test]
    fn validation_rejects_empty_entries() {
        let mut constitution = Constitution::default();
        constitution.hard_kill.blocked_strings.push("  ".into());
        assert!(constitution.validate().is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_threshold() {
        let mut constitution = Constitution::default();
        constitution.review.threshold = 11;
        assert!(constitution.validate().is_err());
    }
}
