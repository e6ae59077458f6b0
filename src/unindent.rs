//! Strip the common leading whitespace from a multi-line text block.

/// Remove the whitespace prefix shared by every non-blank line.
///
/// Only the lexicographically first and last non-blank lines are compared:
/// their common prefix is the common prefix of all lines. Blank lines are
/// cut the same amount (or emptied when shorter).
pub fn unindent(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut filled: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.chars().any(|c| !c.is_whitespace()))
        .collect();
    if filled.is_empty() {
        return text.to_string();
    }
    filled.sort_unstable();

    let first = filled[0];
    let last = filled[filled.len() - 1];
    let width = first
        .chars()
        .zip(last.chars())
        .take_while(|(a, b)| a.is_whitespace() && a == b)
        .count();
    if width == 0 {
        return text.to_string();
    }

    lines
        .iter()
        .map(|l| l.chars().skip(width).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_shared_indent() {
        assert_eq!(unindent("    a\n      b\n    c"), "a\n  b\nc");
    }

    #[test]
    fn keeps_text_without_shared_indent() {
        assert_eq!(unindent("a\n  b"), "a\n  b");
    }

    #[test]
    fn blank_lines_do_not_count() {
        assert_eq!(unindent("  a\n\n  b"), "a\n\nb");
    }

    #[test]
    fn whitespace_only_is_untouched() {
        assert_eq!(unindent("   \n  "), "   \n  ");
    }

    #[test]
    fn mixed_tabs_and_spaces_stop_at_first_difference() {
        assert_eq!(unindent("\t a\n\t\tb"), " a\n\tb");
    }

    #[test]
    fn second_pass_changes_nothing() {
        for input in [
            "    a\n      b\n    c",
            "  x",
            "\t a\n\t\tb",
            "  a\n    b\n\n c",
            "",
            "no indent\n  here",
        ] {
            let once = unindent(input);
            assert_eq!(unindent(&once), once, "input: {input:?}");
        }
    }
}
