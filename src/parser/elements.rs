//! Element finder: `@tag content` spans of one block.
//!
//! A tag starts at the beginning of a comment line, optionally behind
//! whitespace and `*`. Its content runs up to the next recognized tag, a
//! `*/`, or the end of the block. Unrecognized `@words` stay part of the
//! content of the tag before them.

use crate::hooks::{find_element, Hooks, FIND_ELEMENTS};
use crate::languages::SENTINEL;
use crate::model::Element;
use regex::Regex;
use std::sync::LazyLock;

static RE_TAG_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\x{FFFF})[\s*]*@([A-Za-z0-9_]+(?:-[A-Za-z0-9_]+)?)").unwrap()
});

const PREFIXES: [&str; 4] = ["api", "mqtt", "model", "iot"];

const NAMES: [&str; 28] = [
    "payloadSchema",
    "examplePublish",
    "exampleSubscribe",
    "responseTopic",
    "responseExample",
    "topicParam",
    "topic",
    "payload",
    "qos",
    "retain",
    "author",
    "ratelimit",
    "errors",
    "tags",
    "auth",
    "file",
    "copyright",
    "license",
    "package",
    "see",
    "param",
    "returns",
    "remarks",
    "example",
    "public",
    "internal",
    "alpha",
    "beta",
];

/// JSDoc/TSDoc names that mark a block as documentation on their own.
pub const JSDOC_NAMES: [&str; 14] = [
    "file", "author", "copyright", "license", "package", "see", "param", "returns", "remarks", "example", "public",
    "internal", "alpha", "beta",
];

/// Whether `name`, as written, starts an element.
pub fn is_recognized(name: &str) -> bool {
    if let Some(rest) = name.strip_prefix("openapi") {
        return rest.is_empty() || rest.starts_with('-');
    }
    if name.contains('-') {
        return false;
    }
    PREFIXES.iter().any(|p| name.starts_with(p)) || NAMES.contains(&name)
}

struct TagStart {
    /// Offset of the tag line (after the line break).
    line: usize,
    name: String,
    /// Offset just behind the tag name.
    name_end: usize,
}

/// Split `block` into elements, running the element hooks after each match.
pub fn find_elements(block: &str, filename: &str, hooks: &Hooks) -> Vec<Element> {
    let text = block.replace('\n', &SENTINEL.to_string());
    let starts: Vec<TagStart> = RE_TAG_START
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            if !is_recognized(name.as_str()) {
                return None;
            }
            let line = if whole.as_str().starts_with(SENTINEL) {
                whole.start() + SENTINEL.len_utf8()
            } else {
                whole.start()
            };
            Some(TagStart {
                line,
                name: name.as_str().to_string(),
                name_end: name.end(),
            })
        })
        .collect();

    let mut elements = Vec::with_capacity(starts.len());
    for (i, start) in starts.iter().enumerate() {
        let next = starts
            .get(i + 1)
            .map_or(text.len(), |n| n.line - SENTINEL.len_utf8());
        let content_start = start.name_end + leading_whitespace(&text[start.name_end..next]);
        let end = text[content_start..next]
            .find("*/")
            .map_or(next, |pos| content_start + pos);

        let restore = |s: &str| s.replace(SENTINEL, "\n");
        let mut element = Element::new(
            &start.name,
            &restore(&text[content_start..end]),
            &restore(&text[start.line..end]),
        );
        hooks.apply_element(&find_element(&element.name), &mut element, block, filename);
        elements.push(element);
        hooks.apply_elements(FIND_ELEMENTS, &mut elements, block, filename);
    }
    elements
}

/// Byte length of the whitespace prefix. Line breaks are not whitespace here.
fn leading_whitespace(s: &str) -> usize {
    s.len() - s.trim_start_matches(|c: char| c.is_whitespace()).len()
}
