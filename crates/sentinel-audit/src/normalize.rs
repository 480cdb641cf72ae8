//! Obfuscation normalizer.
//!
//! Produces the canonical text every rule matches against. Decoding covers
//! the obfuscation families this gateway explicitly understands: byte
//! escapes, ANSI-C quoting, fullwidth and homoglyph substitution, zero-width
//! characters, and backslash noise. Composition patterns that smuggle a
//! payload past textual matching (decode-and-execute pipelines) are not
//! decoded; they are flagged for the downstream layers instead.
//!
//! The normalized text is an analysis artifact only. Execution always uses
//! the raw command.

use sentinel_core::{NormalizedCommand, shell};

/// Shells a decoded payload could be piped into.
const SHELL_SINKS: [&str; 5] = ["sh", "bash", "zsh", "dash", "ksh"];

/// Substrings that indicate a decode step in a pipeline.
const DECODE_MARKERS: [&str; 5] = [
    "base64 -d",
    "base64 --decode",
    "base64 -di",
    "xxd -r",
    "openssl enc -d",
];

/// Normalize a raw command string for analysis.
///
/// Pure and total: unrecognized escape sequences pass through, nothing here
/// can fail. Idempotent: the passes run to a fixpoint, so normalizing the
/// output again changes nothing.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedCommand {
    let mut text = raw.to_string();
    // Each changing pass shrinks the string or replaces a non-ASCII or tab
    // character with its ASCII form, so the fixpoint is reached in finitely
    // many rounds.
    loop {
        let next = pass(&text);
        if next == text {
            break;
        }
        text = next;
    }
    let encoded = contains_encoded_payload(&text);
    NormalizedCommand::new(text, encoded)
}

fn pass(input: &str) -> String {
    collapse_whitespace(&decode_escapes(&fold_chars(&decode_ansi_c(input))))
}

/// Decode `$'...'` ANSI-C quoted segments in place.
fn decode_ansi_c(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'\'') {
            out.push(c);
            continue;
        }
        chars.next();
        loop {
            match chars.next() {
                None | Some('\'') => break,
                Some('\\') => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some('\'') => out.push('\''),
                    Some('x') => push_radix(&mut out, &mut chars, 16, 2, 'x'),
                    Some(d @ '0'..='7') => {
                        let mut value = d as u32 - '0' as u32;
                        let mut digits = 1;
                        while digits < 3
                            && let Some(&next) = chars.peek()
                            && next.is_digit(8)
                        {
                            value = value * 8 + (next as u32 - '0' as u32);
                            chars.next();
                            digits += 1;
                        }
                        push_u32(&mut out, value);
                    },
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    },
                    None => break,
                },
                Some(inner) => out.push(inner),
            }
        }
    }
    out
}

/// Decode backslash escapes outside quoting context.
///
/// `\xHH`, `\NNN` (octal), `\uHHHH`, and `\UHHHHHHHH` decode to their
/// character; a backslash before a newline is a line continuation; any
/// other escaped character becomes that character bare, which is what the
/// shell itself would do with it.
fn decode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            None => {},
            Some('x') => {
                chars.next();
                push_radix(&mut out, &mut chars, 16, 2, 'x');
            },
            Some('u') => {
                chars.next();
                push_radix(&mut out, &mut chars, 16, 4, 'u');
            },
            Some('U') => {
                chars.next();
                push_radix(&mut out, &mut chars, 16, 8, 'U');
            },
            Some(d) if d.is_digit(8) => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 3
                    && let Some(&next) = chars.peek()
                    && next.is_digit(8)
                {
                    value = value * 8 + (next as u32 - '0' as u32);
                    chars.next();
                    digits += 1;
                }
                push_u32(&mut out, value);
            },
            Some('\n') => {
                chars.next();
            },
            Some(other) => {
                chars.next();
                out.push(other);
            },
        }
    }
    out
}

/// Consume up to `max` digits in `radix` and push the decoded character;
/// with no digits at all the escape was not an escape, so the introducer
/// character is emitted bare.
fn push_radix(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    radix: u32,
    max: usize,
    introducer: char,
) {
    let mut value = 0u32;
    let mut digits = 0;
    while digits < max
        && let Some(&next) = chars.peek()
        && next.is_digit(radix)
    {
        value = value * radix + next.to_digit(radix).unwrap_or(0);
        chars.next();
        digits += 1;
    }
    if digits == 0 {
        out.push(introducer);
    } else {
        push_u32(out, value);
    }
}

fn push_u32(out: &mut String, value: u32) {
    if let Some(c) = char::from_u32(value) {
        out.push(c);
    }
}

/// Fold fullwidth forms to ASCII, map common Latin homoglyphs, and strip
/// zero-width characters.
fn fold_chars(input: &str) -> String {
    input.chars().filter_map(fold_char).collect()
}

fn fold_char(c: char) -> Option<char> {
    match c {
        // Zero-width space/joiners and BOM hide inside tokens.
        '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
        '\u{3000}' => Some(' '),
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).or(Some(c)),
        _ => Some(homoglyph(c)),
    }
}

/// Cyrillic and Greek letters visually identical to Latin ones.
fn homoglyph(c: char) -> char {
    match c {
        'а' | 'α' => 'a',
        'с' => 'c',
        'ԁ' => 'd',
        'е' | 'ε' => 'e',
        'і' | 'ι' => 'i',
        'ј' => 'j',
        'κ' => 'k',
        'о' | 'ο' => 'o',
        'р' | 'ρ' => 'p',
        'ѕ' => 's',
        'υ' => 'u',
        'ν' => 'v',
        'х' => 'x',
        'у' => 'y',
        'А' | 'Α' => 'A',
        'В' | 'Β' => 'B',
        'С' => 'C',
        'Е' | 'Ε' => 'E',
        'Н' | 'Η' => 'H',
        'І' | 'Ι' => 'I',
        'К' | 'Κ' => 'K',
        'М' | 'Μ' => 'M',
        'Ν' => 'N',
        'О' | 'Ο' => 'O',
        'Р' | 'Ρ' => 'P',
        'Т' | 'Τ' => 'T',
        'Х' | 'Χ' => 'X',
        'Ζ' => 'Z',
        other => other,
    }
}

/// Collapse runs of whitespace: a run containing a newline becomes a single
/// newline (so multi-line structure stays visible to the rules), any other
/// run becomes a single space. Leading and trailing whitespace is dropped.
fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    let mut run_has_newline = false;
    for c in input.chars() {
        if c.is_whitespace() {
            in_run = true;
            run_has_newline |= c == '\n' || c == '\r';
        } else {
            if in_run && !out.is_empty() {
                out.push(if run_has_newline { '\n' } else { ' ' });
            }
            in_run = false;
            run_has_newline = false;
            out.push(c);
        }
    }
    out
}

/// Whether the normalized text carries a decode-and-execute composition:
/// a decode step feeding a shell through a pipe or wrapped in command
/// substitution. The payload itself is not decoded; the flag tells the
/// deterministic layer it must not auto-approve.
fn contains_encoded_payload(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if !DECODE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return false;
    }
    if lowered.contains("$(") || lowered.contains('`') {
        return true;
    }
    lowered.split('|').skip(1).any(|segment| {
        shell::leading_executable(segment)
            .is_some_and(|exe| SHELL_SINKS.contains(&exe.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_escapes_decode() {
        assert_eq!(normalize(r"\x73\x75\x64\x6f ls").text(), "sudo ls");
    }

    #[test]
    fn octal_escapes_decode() {
        assert_eq!(normalize(r"\163\165\144\157 ls").text(), "sudo ls");
    }

    #[test]
    fn unicode_escapes_decode() {
        assert_eq!(normalize(r"\u0073\u0075\u0064\u006f ls").text(), "sudo ls");
        assert_eq!(normalize(r"\U00000073udo ls").text(), "sudo ls");
    }

    #[test]
    fn fullwidth_folds_to_ascii() {
        assert_eq!(normalize("ｓｕｄｏ\u{3000}ｌｓ").text(), "sudo ls");
    }

    #[test]
    fn homoglyphs_fold_to_latin() {
        // Cyrillic es, u, o.
        assert_eq!(normalize("ѕudо ls").text(), "sudo ls");
    }

    #[test]
    fn zero_width_characters_are_stripped() {
        assert_eq!(normalize("su\u{200B}do\u{FEFF} ls").text(), "sudo ls");
    }

    #[test]
    fn backslash_noise_is_removed() {
        assert_eq!(normalize(r"l\s -la").text(), "ls -la");
    }

    #[test]
    fn ansi_c_quoting_decodes() {
        assert_eq!(normalize(r"$'\x73'udo ls").text(), "sudo ls");
        assert_eq!(normalize(r"echo $'hi\tthere'").text(), "echo hi there");
    }

    #[test]
    fn line_continuations_join() {
        assert_eq!(normalize("rm \\\n-rf /tmp/x").text(), "rm -rf /tmp/x");
    }

    #[test]
    fn whitespace_collapses_but_newlines_survive() {
        assert_eq!(normalize("  ls   -la\t/tmp  ").text(), "ls -la /tmp");
        assert_eq!(normalize("ls\n\nwhoami").text(), "ls\nwhoami");
    }

    #[test]
    fn unrecognized_escapes_pass_through_as_shell_would() {
        assert_eq!(normalize(r"grep \q file").text(), "grep q file");
    }

    #[test]
    fn benign_commands_are_untouched() {
        for cmd in ["ls -la", "git status", "cargo test --workspace"] {
            assert_eq!(normalize(cmd).text(), cmd);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let nasty = [
            r"\x73\x75\x64\x6f ls",
            r"$'\x5c'x73 echo",
            "ｓｕｄｏ rm",
            r"e\c\h\o hi",
            "echo c3VkbyBscw== | base64 -d | sh",
            r"\x5cx73udo ls",
            "  spaced \t out \n lines ",
        ];
        for raw in nasty {
            let once = normalize(raw);
            let twice = normalize(once.text());
            assert_eq!(once.text(), twice.text(), "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn nested_escapes_reach_the_fixpoint() {
        // \x5c is a backslash; the second round decodes the revealed \x73.
        assert_eq!(normalize(r"\x5cx73udo ls").text(), "sudo ls");
    }

    #[test]
    fn decode_pipeline_into_shell_is_flagged() {
        let normalized = normalize("echo c3VkbyBscw== | base64 -d | sh");
        assert!(normalized.contains_encoded_payload());
        let normalized = normalize("bash -c \"$(echo x | base64 --decode)\"");
        assert!(normalized.contains_encoded_payload());
    }

    #[test]
    fn decode_without_execution_is_not_flagged() {
        let normalized = normalize("echo c3VkbyBscw== | base64 -d");
        assert!(!normalized.contains_encoded_payload());
        assert!(!normalize("ls -la").contains_encoded_payload());
    }
}
