//! Minimal TypeScript interface reader for `@apiSchema {interface=Name}`.
//!
//! Not a TypeScript parser: comments and string literals are blanked, each
//! `interface Name { ... }` body is cut out by brace matching, and every
//! `name?: type` line of the body becomes one property.

use crate::model::Element;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

static RE_LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());
static RE_BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static RE_DOUBLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*""#).unwrap());
static RE_SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'[^']*'").unwrap());
static RE_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap());

static RE_INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"interface\s+([A-Za-z0-9_]+)(?:<[^>]*>)?(?:\s+extends\s+([A-Za-z0-9_,\s]+))?\s*\{").unwrap()
});

static RE_INDEX_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[A-Za-z0-9_\s:]+\]:\s*[A-Za-z0-9_]+").unwrap());
static RE_GENERIC_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)(\?)?:\s*Array<").unwrap());
static RE_NESTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)(\?)?:\s*\{").unwrap());
static RE_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)(\?)?:\s*(.+?)\[\](?:\s*//(.+))?$").unwrap());
static RE_SIMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)(\?)?:\s*(.+?)(?:\s*//(.+))?$").unwrap());

static RE_SINGLE_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]$").unwrap());
static RE_QUOTED_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());
static RE_GENERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)<(.+)>$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub kind: String,
    pub optional: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub properties: Vec<Property>,
    pub extends: Vec<String>,
}

impl Interface {
    /// One `@<element> (group) {type} [name] description` element per property.
    pub fn to_elements(&self, element: &str, group: &str) -> Vec<Element> {
        let prefix = if group.is_empty() { String::new() } else { format!("({group}) ") };
        self.properties
            .iter()
            .map(|p| {
                let field = if p.optional { format!("[{}]", p.name) } else { p.name.clone() };
                let content = format!("{prefix}{{{}}} {field} {}", p.kind, p.description);
                let source = format!("@{element} {content}");
                Element::new(element, content.trim(), &source)
            })
            .collect()
    }
}

/// Look for `name` in the `.ts`/`.tsx` files next to `current_file`.
pub fn find_interface(name: &str, current_file: &Path) -> Option<Interface> {
    let dir = current_file.parent().unwrap_or_else(|| Path::new("."));
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("could not read directory {} for interface search: {e}", dir.display());
            return None;
        }
    };
    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            let s = p.to_string_lossy();
            s.ends_with(".ts") || s.ends_with(".tsx")
        })
        .collect();
    files.sort();

    files.iter().find_map(|path| match fs::read_to_string(path) {
        Ok(content) => parse_interfaces(&content).into_iter().find(|i| i.name == name),
        Err(e) => {
            tracing::warn!("could not read TypeScript file {}: {e}", path.display());
            None
        }
    })
}

/// Every interface declared in `content`, in source order.
pub fn parse_interfaces(content: &str) -> Vec<Interface> {
    let clean = remove_comments_and_strings(content);
    let mut interfaces = Vec::new();
    for caps in RE_INTERFACE.captures_iter(&clean) {
        let Some(whole) = caps.get(0) else { continue };
        let start = whole.end();
        let Some(end) = matching_brace(&clean[start..]) else {
            continue;
        };
        let extends = caps
            .get(2)
            .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        interfaces.push(Interface {
            name: caps[1].to_string(),
            properties: parse_body(&clean[start..start + end]),
            extends,
        });
    }
    interfaces
}

/// Byte offset of the `}` closing an already opened brace.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_body(body: &str) -> Vec<Property> {
    let mut properties = Vec::new();
    for line in body.split([';', '\n']).map(str::trim) {
        if line.is_empty() || line.starts_with("//") || line.starts_with('*') || RE_INDEX_SIGNATURE.is_match(line) {
            continue;
        }
        let property = |caps: &regex::Captures<'_>, kind: String, comment: Option<usize>| {
            let name = caps[1].to_string();
            let description = comment
                .and_then(|i| caps.get(i))
                .map(|m| m.as_str().trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| describe(&name));
            Property {
                optional: caps.get(2).is_some(),
                name,
                kind,
                description,
            }
        };

        if let Some(caps) = RE_GENERIC_ARRAY.captures(line) {
            properties.push(property(&caps, "Array".to_string(), None));
        } else if let Some(caps) = RE_NESTED.captures(line) {
            properties.push(property(&caps, "Object".to_string(), None));
        } else if let Some(caps) = RE_ARRAY.captures(line) {
            let kind = format!("{}[]", normalize_type(&caps[3]));
            properties.push(property(&caps, kind, Some(4)));
        } else if let Some(caps) = RE_SIMPLE.captures(line) {
            if caps[3].trim() == "{" {
                continue;
            }
            let kind = normalize_type(&caps[3]);
            properties.push(property(&caps, kind, Some(4)));
        }
    }
    properties
}

/// Map a TypeScript type expression to an apiDoc type name.
pub fn normalize_type(kind: &str) -> String {
    let cleaned = kind.trim();
    let mapped = match cleaned {
        "string" => Some("String"),
        "number" => Some("Number"),
        "boolean" => Some("Boolean"),
        "any" | "unknown" => Some("Mixed"),
        "object" => Some("Object"),
        "void" => Some("Void"),
        _ => None,
    };
    if let Some(mapped) = mapped {
        return mapped.to_string();
    }
    if RE_SINGLE_LETTER.is_match(cleaned) {
        return "Mixed".to_string();
    }
    if cleaned.contains(['"', '\'']) {
        if cleaned.contains('|') {
            let values: Vec<&str> = RE_QUOTED_VALUE.find_iter(cleaned).map(|m| m.as_str()).collect();
            if values.len() > 1 {
                return format!("String={}", values.join(","));
            }
        } else if RE_QUOTED_VALUE.is_match(cleaned) {
            return "String".to_string();
        }
    }
    if cleaned.contains('|') {
        return cleaned.split('|').map(normalize_type).collect::<Vec<_>>().join("/");
    }
    if let Some(caps) = RE_GENERIC.captures(cleaned) {
        return if &caps[1] == "Array" {
            format!("{}[]", normalize_type(&caps[2]))
        } else {
            normalize_type(&caps[1])
        };
    }
    cleaned.to_string()
}

/// `createdAt` becomes `Created at`.
pub fn describe(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c.to_ascii_lowercase());
    }
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

fn remove_comments_and_strings(content: &str) -> String {
    let out = RE_LINE_COMMENT.replace_all(content, "");
    let out = RE_BLOCK_COMMENT.replace_all(&out, "");
    let out = RE_DOUBLE_QUOTED.replace_all(&out, "\"\"");
    let out = RE_SINGLE_QUOTED.replace_all(&out, "''");
    RE_TEMPLATE.replace_all(&out, "``").into_owned()
}
