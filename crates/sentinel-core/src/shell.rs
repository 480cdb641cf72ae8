//! Minimal POSIX-style shell word splitting.
//!
//! Shared by the deterministic auditor (leading-token extraction) and the
//! executor (direct exec of operator-free commands). This is intentionally
//! not a full shell grammar: quoting and escaping are honored, expansions
//! are not performed.

/// Split a command line into words, honoring single quotes, double quotes,
/// and backslash escapes.
///
/// Unterminated quotes fall back to plain whitespace splitting, matching the
/// lenient behavior of the audit pipeline — a malformed command must still
/// be analyzable.
#[must_use]
pub fn split(input: &str) -> Vec<String> {
    match split_strict(input) {
        Some(words) => words,
        None => input.split_whitespace().map(ToOwned::to_owned).collect(),
    }
}

/// Strict split; returns `None` on unterminated quoting.
fn split_strict(input: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return None,
                    }
                }
            },
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            // POSIX: backslash in double quotes only escapes
                            // these; otherwise it is literal.
                            Some(esc @ ('"' | '\\' | '$' | '`')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            },
                            None => return None,
                        },
                        Some(inner) => current.push(inner),
                        None => return None,
                    }
                }
            },
            '\\' => {
                in_word = true;
                if let Some(esc) = chars.next() {
                    current.push(esc);
                }
            },
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            },
            c => {
                in_word = true;
                current.push(c);
            },
        }
    }

    if in_word {
        words.push(current);
    }
    Some(words)
}

/// Whether the command carries shell control operators (pipelines, command
/// chaining, substitution, redirects). Such commands cannot be allowlisted
/// by their leading token alone and must run under a shell when executed.
#[must_use]
pub fn has_control_operators(input: &str) -> bool {
    if input.contains("$(") || input.contains('\n') || input.contains('\r') {
        return true;
    }
    input
        .chars()
        .any(|c| matches!(c, ';' | '|' | '&' | '`' | '<' | '>'))
}

/// Extract the leading executable token of a command: the basename of the
/// first word after any `VAR=value` assignments, skipping an `env` prefix
/// together with its flags.
///
/// The result is lowercased for case-insensitive policy matching.
#[must_use]
pub fn leading_executable(input: &str) -> Option<String> {
    let tokens = split(input);
    let mut iter = tokens.iter().map(String::as_str).peekable();

    // Skip a leading `env`, plus its options and assignments.
    if let Some(first) = iter.peek()
        && basename(first).eq_ignore_ascii_case("env")
    {
        iter.next();
        while let Some(token) = iter.peek() {
            if *token == "--" {
                iter.next();
                break;
            }
            if token.starts_with('-') || is_env_assignment(token) {
                iter.next();
            } else {
                break;
            }
        }
    }

    iter.find(|token| !token.trim().is_empty() && !is_env_assignment(token))
        .map(|token| basename(token).to_ascii_lowercase())
}

/// Whether a token is a `NAME=value` environment assignment.
fn is_env_assignment(token: &str) -> bool {
    let Some(eq) = token.find('=') else {
        return false;
    };
    let name = &token[..eq];
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The path basename of a token.
fn basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}
