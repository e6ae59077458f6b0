//! Semantic version helpers for `@apiVersion` and definition matching.

use semver::Version;
use std::cmp::Ordering;

/// Parse a version, tolerating a leading `v` or `=`.
pub fn parse(text: &str) -> Option<Version> {
    let text = text.trim();
    let text = text.strip_prefix('=').unwrap_or(text);
    let text = text.strip_prefix('v').unwrap_or(text);
    Version::parse(text).ok()
}

pub fn is_valid(text: &str) -> bool {
    parse(text).is_some()
}

/// Order two version strings. Strings that are not valid semver compare as
/// plain text.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// `a >= b`.
pub fn gte(a: &str, b: &str) -> bool {
    compare(a, b) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_versions_only() {
        assert!(is_valid("1.2.3"));
        assert!(is_valid("v1.2.3"));
        assert!(is_valid("1.0.0-beta.1"));
        assert!(!is_valid("1.2"));
        assert!(!is_valid("latest"));
    }

    #[test]
    fn numeric_ordering() {
        assert!(gte("1.10.0", "1.9.0"));
        assert!(!gte("0.9.0", "1.0.0"));
        assert_eq!(compare("2.0.0", "2.0.0"), Ordering::Equal);
    }

    #[test]
    fn invalid_versions_compare_as_text() {
        assert_eq!(compare("abc", "abd"), Ordering::Less);
    }
}
