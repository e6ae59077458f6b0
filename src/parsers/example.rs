//! `@apiExample` and its section variants, plus `@apiCode` which pulls an
//! example from a file next to the source.

use super::{Descriptor, Registry};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::hooks::{Hooks, FIND_ELEMENTS};
use crate::model::{Element, Method};
use crate::unindent::unindent;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

static RE_FIRST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[A-Za-z0-9_]*)?(?:(?:\s*\{\s*([a-zA-Z0-9./\\\[\]_-]+)\s*\}\s*)?\s*(.*))?").unwrap()
});

static RE_CODE_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[A-Za-z0-9_]+)?\s*(?:\(([a-zA-Z0-9_-]+)\))?\s*\{file=([^}]+)\}\s*(.*)$").unwrap()
});

static RE_CODE_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\(([a-zA-Z0-9_-]+)\))?\s*\{file=([^}]+)\}\s*(.*)$").unwrap());

/// Runs after `@apiSchema` expansion.
const CODE_HOOK_PRIORITY: i32 = 300;

pub fn register(registry: &mut Registry) {
    for (tag, path) in [
        ("apiExample", "local.examples"),
        ("apiParamExample", "local.parameter.examples"),
        ("apiSuccessExample", "local.success.examples"),
        ("apiErrorExample", "local.error.examples"),
        ("apiHeaderExample", "local.header.examples"),
    ] {
        registry.register(tag, Descriptor::at(parse_example, path, Method::Push));
    }
    registry.register(
        "apiCode",
        Descriptor::at(parse_code, "local.examples", Method::Push).with_init(init_code_hook),
    );
}

/// The first line of `source` carries `{type} title`; everything after it
/// is the example body.
pub fn parse_example(_content: &str, source: &str, _ctx: &mut ParseContext) -> Parsed {
    let source = source.trim();
    let (first_line, text) = source.split_once('\n').unwrap_or((source, ""));
    if text.is_empty() {
        return Ok(None);
    }

    let caps = RE_FIRST_LINE.captures(first_line);
    let kind = caps.as_ref().and_then(|c| c.get(2)).map(|m| m.as_str());
    let title = caps
        .as_ref()
        .and_then(|c| c.get(3))
        .map(|m| m.as_str())
        .filter(|t| !t.is_empty());

    Ok(Some(object! {
        "title" => title,
        "content" => unindent(text),
        "type" => kind.unwrap_or("json"),
    }))
}

/// Only reached when the hook did not rewrite the element: keeps the
/// reference instead of the file contents.
fn parse_code(_content: &str, source: &str, _ctx: &mut ParseContext) -> Parsed {
    let source = source.trim();
    let Some(caps) = RE_CODE_SOURCE.captures(source) else {
        tracing::warn!("could not parse @apiCode syntax: {source}");
        return Ok(None);
    };
    let file = &caps[2];
    let kind = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| language_for(file).to_string());
    let title = caps.get(3).map(|m| m.as_str()).filter(|t| !t.is_empty());
    Ok(Some(object! {
        "title" => title.unwrap_or("Code Example"),
        "content" => file,
        "type" => kind,
    }))
}

fn init_code_hook(hooks: &mut Hooks) {
    hooks.add_elements_hook(FIND_ELEMENTS, CODE_HOOK_PRIORITY, expand_code);
}

/// Replace a trailing `@apiCode` element by an `@apiExample` holding the
/// referenced file's contents.
fn expand_code(elements: &mut Vec<Element>, _block: &str, filename: &str) {
    if elements.last().map(|e| e.name.as_str()) != Some("apicode") {
        return;
    }
    let Some(element) = elements.pop() else {
        return;
    };
    let content = element.content.trim();
    let Some(caps) = RE_CODE_CONTENT.captures(content) else {
        tracing::warn!("could not parse @apiCode content: {content}");
        return;
    };
    let file = caps[2].trim();
    let kind = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| language_for(file).to_string());
    let title = caps.get(3).map(|m| m.as_str()).filter(|t| !t.is_empty()).unwrap_or("Code Example");

    let dir = Path::new(filename).parent().unwrap_or_else(|| Path::new(""));
    let path = dir.join(file);
    match fs::read_to_string(&path) {
        Ok(code) => {
            let source = format!("@apiExample {{{kind}}} {title}\n{code}");
            elements.push(Element::new("apiExample", &code, &source));
        }
        Err(e) => tracing::warn!("could not load code file {}: {e}", path.display()),
    }
}

/// Highlighting language for a code file, by extension.
pub fn language_for(file: &str) -> &'static str {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "go" => "go",
        "rs" => "rust",
        "cpp" => "cpp",
        "c" => "c",
        "cs" => "csharp",
        "sh" | "bash" => "bash",
        "ps1" => "powershell",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "kt" => "kotlin",
        "swift" => "swift",
        "dart" => "dart",
        _ => "text",
    }
}
