//! The immutable policy snapshot and its atomic-swap handle.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

use sentinel_core::RiskScore;

use crate::constitution::Constitution;

/// A blocked or review-listed path pattern, with its home-expanded variant
/// precomputed so matching stays a plain substring scan.
#[derive(Debug, Clone)]
pub struct BlockedPath {
    /// The pattern as written in the constitution (e.g. `~/.ssh`).
    pub pattern: String,
    /// The pattern with a leading `~` expanded to the home directory, when a
    /// home directory is known and expansion applies.
    pub expanded: Option<String>,
}

impl BlockedPath {
    fn new(pattern: &str, home: Option<&Path>) -> Self {
        let expanded = home.and_then(|home| {
            pattern
                .strip_prefix("~/")
                .map(|rest| home.join(rest).to_string_lossy().into_owned())
                .or_else(|| (pattern == "~").then(|| home.to_string_lossy().into_owned()))
        });
        Self {
            pattern: pattern.to_string(),
            expanded,
        }
    }

    /// Whether the lowercased command text references this path, in either
    /// its written or home-expanded form.
    #[must_use]
    pub fn matches(&self, lowered_text: &str) -> bool {
        if lowered_text.contains(&self.pattern.to_lowercase()) {
            return true;
        }
        self.expanded
            .as_ref()
            .is_some_and(|expanded| lowered_text.contains(&expanded.to_lowercase()))
    }
}

/// Read-only policy snapshot consumed by the audit pipeline.
///
/// Built once from a [`Constitution`]; never mutated. Reload replaces the
/// whole snapshot through [`PolicyHandle::swap`].
#[derive(Debug, Clone)]
pub struct Policy {
    /// Substrings that reject a command outright (matched case-insensitively).
    pub blocked_strings: Vec<String>,
    /// Paths a command may never reference.
    pub blocked_paths: Vec<BlockedPath>,
    /// Executables that may never appear as the leading token (lowercased).
    pub blocked_tools: BTreeSet<String>,
    /// Tools treated as network clients (lowercased).
    pub network_tools: BTreeSet<String>,
    /// Domains network tools may contact (lowercased).
    pub allowed_domains: BTreeSet<String>,
    /// Whether lockdown mode is active.
    pub lockdown_mode: bool,
    /// Leading tokens permitted in lockdown (lowercased).
    pub allowed_commands_in_lockdown: BTreeSet<String>,
    /// Semantic risk score at or above which an allowing verdict escalates
    /// to human review.
    pub review_threshold: RiskScore,
    /// Paths whose mention escalates directly to human review.
    pub review_paths: Vec<BlockedPath>,
}

impl Policy {
    /// Flatten a constitution into a snapshot.
    ///
    /// `home` is the home directory used for tilde expansion of path
    /// entries; pass `None` when unknown (expansion is skipped).
    #[must_use]
    pub fn from_constitution(constitution: &Constitution, home: Option<&Path>) -> Self {
        let lower_set = |entries: &[String]| -> BTreeSet<String> {
            entries
                .iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect()
        };
        Self {
            blocked_strings: constitution.hard_kill.blocked_strings.clone(),
            blocked_paths: constitution
                .hard_kill
                .blocked_paths
                .iter()
                .map(|p| BlockedPath::new(p, home))
                .collect(),
            blocked_tools: lower_set(&constitution.hard_kill.blocked_tools),
            network_tools: lower_set(&constitution.network_lock.blocked_tools),
            allowed_domains: lower_set(&constitution.network_lock.whitelisted_domains),
            lockdown_mode: constitution.execution_mode.lockdown_mode,
            allowed_commands_in_lockdown: lower_set(&constitution.execution_mode.allowed_commands),
            review_threshold: RiskScore::new(constitution.review.threshold),
            review_paths: constitution
                .review
                .paths
                .iter()
                .map(|p| BlockedPath::new(p, home))
                .collect(),
        }
    }

    /// Whether a domain is covered by the allowlist, either exactly or as a
    /// subdomain of an allowlisted entry.
    #[must_use]
    pub fn is_domain_allowed(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.allowed_domains
            .iter()
            .any(|allowed| domain == *allowed || domain.ends_with(&format!(".{allowed}")))
    }

    /// A one-paragraph summary of the active policy, supplied to the
    /// semantic auditor as context.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "blocked strings: [{}]; blocked paths: [{}]; blocked tools: [{}]; \
             network tools restricted to domains: [{}]; lockdown: {}",
            self.blocked_strings.join(", "),
            self.blocked_paths
                .iter()
                .map(|p| p.pattern.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            self.blocked_tools.iter().cloned().collect::<Vec<_>>().join(", "),
            self.allowed_domains.iter().cloned().collect::<Vec<_>>().join(", "),
            self.lockdown_mode,
        )
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_constitution(&Constitution::default(), None)
    }
}

/// Shared handle to the current policy snapshot.
///
/// Readers take a cheap `Arc` clone; a reload is a single pointer swap.
/// An audit that already holds a snapshot is unaffected by a concurrent
/// swap, which is exactly the isolation the pipeline requires.
#[derive(Debug)]
pub struct PolicyHandle {
    inner: RwLock<Arc<Policy>>,
}

impl PolicyHandle {
    /// Create a handle around an initial snapshot.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            inner: RwLock::new(Arc::new(policy)),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Policy> {
        let guard = self.inner.read().unwrap_or_else(|e| {
            tracing::warn!("policy handle lock poisoned, recovering");
            e.into_inner()
        });
        Arc::clone(&guard)
    }

    /// Atomically replace the snapshot.
    pub fn swap(&self, policy: Policy) {
        let mut guard = self.inner.write().unwrap_or_else(|e| {
            tracing::warn!("policy handle lock poisoned, recovering");
            e.into_inner()
        });
        *guard = Arc::new(policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn tilde_expansion() {
        let home = PathBuf::from("/home/operator");
        let path = BlockedPath::new("~/.ssh", Some(&home));
        assert_eq!(path.expanded.as_deref(), Some("/home/operator/.ssh"));
        assert!(path.matches("cat /home/operator/.ssh/id_rsa"));
        assert!(path.matches("cat ~/.ssh/id_rsa"));
        assert!(!path.matches("cat /tmp/file"));
    }

    #[test]
    fn absolute_paths_skip_expansion() {
        let path = BlockedPath::new("/etc/", Some(Path::new("/home/operator")));
        assert!(path.expanded.is_none());
        assert!(path.matches("cat /etc/passwd"));
    }

    #[test]
    fn domain_allowlist_covers_subdomains() {
        let mut constitution = Constitution::default();
        constitution.network_lock.whitelisted_domains = vec!["GitHub.com".into()];
        let policy = Policy::from_constitution(&constitution, None);
        assert!(policy.is_domain_allowed("github.com"));
        assert!(policy.is_domain_allowed("api.github.com"));
        assert!(!policy.is_domain_allowed("evilgithub.com"));
        assert!(!policy.is_domain_allowed("example.com"));
    }

    #[test]
    fn handle_swap_is_invisible_to_held_snapshots() {
        let handle = PolicyHandle::new(Policy::default());
        let before = handle.current();
        assert!(!before.lockdown_mode);

        let mut constitution = Constitution::default();
        constitution.execution_mode.lockdown_mode = true;
        handle.swap(Policy::from_constitution(&constitution, None));

        // The held snapshot is unchanged; a fresh read sees the new one.
        assert!(!before.lockdown_mode);
        assert!(handle.current().lockdown_mode);
    }

    #[test]
    fn tool_sets_are_lowercased() {
        let mut constitution = Constitution::default();
        constitution.hard_kill.blocked_tools = vec!["Python".into(), " NPM ".into()];
        let policy = Policy::from_constitution(&constitution, None);
        assert!(policy.blocked_tools.contains("python"));
        assert!(policy.blocked_tools.contains("npm"));
    }
}
