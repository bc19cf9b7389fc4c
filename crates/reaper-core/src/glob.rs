//! Bounded glob matching shared by the policy composer (C6) and the pure
//! policy engine (C11).
//!
//! `*` is the only metacharacter. Everything else in a pattern is matched
//! literally. Patterns are validated before use to keep this a linear scan
//! rather than a general regex, which would otherwise open the door to
//! catastrophic backtracking on adversarial input (§9).

use crate::error::{ReaperError, Result};

const MAX_PATTERN_LEN: usize = 100;

/// Validate a glob pattern's alphabet and length without compiling it.
///
/// Valid patterns use only `[A-Za-z0-9*_.-]` and are at most 100 characters.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() || pattern.len() > MAX_PATTERN_LEN {
        return Err(ReaperError::InvalidPattern { pattern: pattern.to_string() });
    }
    if !pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '_' | '.' | '-'))
    {
        return Err(ReaperError::InvalidPattern { pattern: pattern.to_string() });
    }
    Ok(())
}

/// Match `value` against `pattern`. Assumes `pattern` already passed
/// [`validate_pattern`]; callers that skip validation get literal-equality
/// behavior degraded to "no match" for anything containing `*`.
pub fn matches(pattern: &str, value: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == value,
        Some((prefix, suffix)) if !suffix.contains('*') => {
            value.len() >= prefix.len() + suffix.len()
                && value.starts_with(prefix)
                && value.ends_with(suffix)
        }
        // More than one `*`: fall back to a general segment-by-segment scan.
        Some(_) => matches_multi_star(pattern, value),
    }
}

fn matches_multi_star(pattern: &str, value: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    let anchored_start = !pattern.starts_with('*');
    let anchored_end = !pattern.ends_with('*');

    let mut cursor = 0usize;
    for (i, seg) in segments.iter().enumerate() {
        if seg.is_empty() {
            continue;
        }
        if i == 0 && anchored_start {
            if !value[cursor..].starts_with(seg) {
                return false;
            }
            cursor += seg.len();
            continue;
        }
        if i == segments.len() - 1 && anchored_end {
            return value[cursor..].ends_with(seg);
        }
        match value[cursor..].find(seg) {
            Some(pos) => cursor += pos + seg.len(),
            None => return false,
        }
    }
    true
}

/// Does any pattern in `patterns` match `value`?
pub fn matches_any<'a>(patterns: impl IntoIterator<Item = &'a String>, value: &str) -> bool {
    patterns.into_iter().any(|p| matches(p, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_with_no_wildcard() {
        assert!(matches("send_email", "send_email"));
        assert!(!matches("send_email", "send_emails"));
    }

    #[test]
    fn prefix_wildcard() {
        assert!(matches("read_*", "read_secret"));
        assert!(matches("read_*", "read_"));
        assert!(!matches("read_*", "write_secret"));
    }

    #[test]
    fn suffix_wildcard() {
        assert!(matches("*_suffix", "a_suffix"));
        assert!(!matches("*_suffix", "a_suffixx"));
    }

    #[test]
    fn bare_star_matches_everything() {
        assert!(matches("*", "anything"));
        assert!(matches("*", ""));
    }

    #[test]
    fn validate_pattern_rejects_bad_alphabet_and_length() {
        assert!(validate_pattern("read_*").is_ok());
        assert!(validate_pattern("read/*").is_err());
        assert!(validate_pattern("").is_err());
        let too_long = "a".repeat(101);
        assert!(validate_pattern(&too_long).is_err());
    }

    #[test]
    fn matches_any_checks_the_whole_set() {
        let denied = vec!["read_secret".to_string(), "delete_*".to_string()];
        assert!(matches_any(&denied, "delete_account"));
        assert!(!matches_any(&denied, "read_public"));
    }
}
