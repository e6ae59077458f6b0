//! `@apiParam` and the tags sharing its grammar: `@apiSuccess`, `@apiError`,
//! `@apiHeader`, `@apiBody`, `@apiQuery`.
//!
//! ```text
//! @apiParam (group) {type{size}=allowed,values} [field.name=default] description
//! ```
//!
//! The group of the last call is kept in [`ParseContext::param_group`] and
//! decides the storage path of the element that produced it.

use super::{Descriptor, Registry, TagPath};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::languages::SENTINEL;
use crate::model::Method;
use crate::unindent::unindent;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

// -- Regex patterns -----------------------------------------------------------

static RE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:\(\s*(.+?)\s*\)\s*)?",
        r"\s*(?:\{\s*([a-zA-Z0-9()#:./\\\[\]_|-]+)",
        r"\s*(?:\{\s*(.+?)\s*\}\s*)?",
        r"\s*(?:=\s*(.+?))?",
        r"\s*\}\s*)?",
        r"(\[?\s*([#@a-zA-Z0-9\x{00C0}-\x{017F}$:./\\_-]+(?:\[[a-zA-Z0-9\x{00C0}-\x{017F}./\\_-]*\])?)",
        r#"(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|(.*?)(?:\s|\]|$)))?"#,
        r"\s*\]?\s*)",
        r"(.*)?$|@",
    ))
    .unwrap()
});

static RE_VALUES_DOUBLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*[^"]""#).unwrap());

static RE_VALUES_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'[^']*[^']'").unwrap());

static RE_VALUES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^,\s]+").unwrap());

pub fn register(registry: &mut Registry) {
    registry.register(
        "apiParam",
        Descriptor::new(parse_param, TagPath::Dynamic(|ctx| grouped("local.parameter.fields", ctx)), Method::Push)
            .markdown(&["description", "type"])
            .remove_p_tags(&["type"]),
    );
    registry.register(
        "apiSuccess",
        Descriptor::new(parse_success, TagPath::Dynamic(|ctx| grouped("local.success.fields", ctx)), Method::Push)
            .markdown(&["description", "type"])
            .remove_p_tags(&["type"]),
    );
    registry.register(
        "apiError",
        Descriptor::new(parse_error, TagPath::Dynamic(|ctx| grouped("local.error.fields", ctx)), Method::Push)
            .markdown(&["description", "type"])
            .remove_p_tags(&["type"]),
    );
    registry.register(
        "apiHeader",
        Descriptor::new(parse_header, TagPath::Dynamic(|ctx| grouped("local.header.fields", ctx)), Method::Push)
            .markdown(&["description"]),
    );
    registry.register(
        "apiBody",
        Descriptor::at(parse_body, "local.body", Method::Push).markdown(&["description"]),
    );
    registry.register(
        "apiQuery",
        Descriptor::at(parse_query, "local.query", Method::Push).markdown(&["description"]),
    );
}

fn grouped(prefix: &str, ctx: &ParseContext) -> String {
    format!("{prefix}.{}", ctx.param_group)
}

fn parse_param(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    parse_with_group(content, ctx, "Parameter")
}

fn parse_success(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    parse_with_group(content, ctx, "Success 200")
}

fn parse_error(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    parse_with_group(content, ctx, "Error 4xx")
}

fn parse_header(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    parse_with_group(content, ctx, "Header")
}

fn parse_query(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    parse_with_group(content, ctx, "Query")
}

fn parse_body(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let Some(mut value) = parse_with_group(content, ctx, "Body")? else {
        return Ok(None);
    };
    if let Value::Object(map) = &mut value {
        let is_boolean = map
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case("boolean"));
        if is_boolean {
            let checked = map
                .get("defaultValue")
                .and_then(Value::as_str)
                .is_some_and(|d| !d.is_empty());
            map.insert("checked".to_string(), Value::Bool(checked));
        }
    }
    Ok(Some(value))
}

/// Parse one parameter line, falling back to `default_group` when no
/// `(group)` is written. Updates the context's current group and the table
/// of `Object`-typed parents.
pub fn parse_with_group(content: &str, ctx: &mut ParseContext, default_group: &str) -> Parsed {
    let flattened = content.trim().replace('\n', &SENTINEL.to_string());
    let Some(caps) = RE_PARAM.captures(&flattened) else {
        return Ok(None);
    };
    let group_text = |i: usize| restored(&caps, i);

    let group = group_text(1)
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| default_group.to_string());
    ctx.param_group = group.clone();

    let kind = group_text(2);
    let field = group_text(6);
    let allowed_values = group_text(4).map(|v| split_allowed_values(&v));
    let optional = group_text(5).is_some_and(|m| m.starts_with('['));
    let is_array = kind.as_deref().is_some_and(|t| t.contains("[]"));
    let parent_node = field.as_deref().and_then(|f| parent_node(ctx, f));

    if let (Some(t), Some(f)) = (&kind, &field) {
        if t.contains("Object") {
            let entry = object! {
                "parentNode" => parent_node.clone(),
                "field" => f.as_str(),
                "type" => t.as_str(),
                "isArray" => is_array,
            };
            ctx.parents.insert(f.clone(), entry);
        }
    }

    let default_value = [7, 8, 9]
        .into_iter()
        .find_map(|i| group_text(i).filter(|v| !v.is_empty()));

    Ok(Some(object! {
        "group" => group,
        "type" => kind,
        "size" => group_text(3),
        "allowedValues" => allowed_values,
        "optional" => optional,
        "parentNode" => parent_node,
        "field" => field,
        "isArray" => is_array,
        "defaultValue" => default_value,
        "description" => unindent(&group_text(10).unwrap_or_default()),
    }))
}

/// Capture `i` with real newlines restored.
fn restored(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().replace(SENTINEL, "\n"))
}

/// Split `"a","b"`, `'a','b'` or `a,b c` into individual values.
pub fn split_allowed_values(values: &str) -> Vec<String> {
    let re: &Regex = match values.chars().next() {
        Some('"') => &RE_VALUES_DOUBLE_QUOTED,
        Some('\'') => &RE_VALUES_QUOTED,
        _ => &RE_VALUES,
    };
    re.find_iter(values).map(|m| m.as_str().to_string()).collect()
}

/// Nearest `Object`-typed ancestor of a dotted field, with its `path`.
fn parent_node(ctx: &ParseContext, field: &str) -> Option<Value> {
    field.char_indices().rev().filter(|(_, c)| *c == '.').find_map(|(i, _)| {
        let path = &field[..i];
        let Some(Value::Object(parent)) = ctx.parents.get(path) else {
            return None;
        };
        let mut node = Map::new();
        node.insert("path".to_string(), Value::String(path.to_string()));
        node.extend(parent.clone());
        Some(Value::Object(node))
    })
}
