//! Data model tags: `@model`, `@modelGroup`, `@modelName`, `@modelDescription`,
//! `@apiModel`, `@apiModelAttribute` and `@apiModelHook`.
//!
//! Attributes and hooks are filed under the model named in parentheses, or
//! under the last model announced by `@model` / `@apiModel`.

use super::{non_empty, Descriptor, Registry, TagPath};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::languages::SENTINEL;
use crate::model::Method;
use crate::unindent::unindent;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

// -- Regex patterns -----------------------------------------------------------

static RE_MODEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)(?:\s+(.+?))?$").unwrap());

static RE_API_MODEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{model=(.+?)\}\s*(.*)$").unwrap());

static RE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:\(\s*(.+?)\s*\)\s*)?",
        r"\s*(?:\{\s*([a-zA-Z0-9\[\]]+)\s*(@[a-zA-Z0-9()\s,.@_-]*)?\s*\}\s*)?",
        r#"(\[?\s*([a-zA-Z0-9$_]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|(.*?)(?:\s|\]|$)))?\s*\]?\s*)"#,
        r"(.*)?$",
    ))
    .unwrap()
});

static RE_DECORATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9_]+)(?:\(([^)]*)\))?").unwrap());

static RE_HOOK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(\s*(.+?)\s*\)\s*)?@([a-zA-Z0-9]+)\s+([a-zA-Z0-9_]+)\s*(.*)?$").unwrap()
});

// -- Decorator tables ---------------------------------------------------------

const RELATIONS: [&str; 4] = ["BelongsTo", "HasMany", "HasOne", "BelongsToMany"];
const TIMESTAMPS: [&str; 3] = ["CreatedAt", "UpdatedAt", "DeletedAt"];

static DECORATOR_CATEGORIES: &[(&str, &[&str])] = &[
    ("constraint", &["PrimaryKey", "Unique", "AllowNull", "AutoIncrement", "Default"]),
    ("relation", &RELATIONS),
    ("validation", &["ValidateAttribute", "Validate"]),
    ("index", &["Index"]),
    ("timestamp", &TIMESTAMPS),
    ("attribute", &["Attribute"]),
];

/// Lifecycle decorators that have a hook category of their own.
static LIFECYCLE_HOOKS: &[&str] = &[
    "BeforeValidate",
    "AfterValidate",
    "BeforeCreate",
    "AfterCreate",
    "BeforeDestroy",
    "AfterDestroy",
    "BeforeRestore",
    "AfterRestore",
    "BeforeUpdate",
    "AfterUpdate",
    "BeforeSave",
    "AfterSave",
    "BeforeUpsert",
    "AfterUpsert",
    "BeforeBulkCreate",
    "AfterBulkCreate",
    "BeforeBulkDestroy",
    "AfterBulkDestroy",
    "BeforeBulkRestore",
    "AfterBulkRestore",
    "BeforeBulkUpdate",
    "AfterBulkUpdate",
    "BeforeFind",
    "BeforeFindAfterExpandIncludeAll",
    "BeforeFindAfterOptions",
    "AfterFind",
    "BeforeCount",
    "BeforeSync",
    "AfterSync",
    "BeforeBulkSync",
    "AfterBulkSync",
    "BeforeAssociate",
    "AfterAssociate",
    "BeforeConnect",
    "AfterConnect",
    "BeforeDisconnect",
    "AfterDisconnect",
];

pub fn register(registry: &mut Registry) {
    registry.register("model", Descriptor::at(parse_model, "local", Method::Insert));
    registry.register("modelGroup", Descriptor::at(parse_group, "local", Method::Insert));
    registry.register("modelName", Descriptor::at(parse_name, "local", Method::Insert));
    registry.register(
        "modelDescription",
        Descriptor::at(parse_description, "local", Method::Insert).markdown(&["description"]),
    );
    registry.register("apiModel", Descriptor::at(parse_api_model, "local.model", Method::Insert));
    registry.register(
        "apiModelAttribute",
        Descriptor::new(
            parse_attribute,
            TagPath::Dynamic(|ctx| format!("local.model.attributes.{}", ctx.current_model)),
            Method::Push,
        )
        .markdown(&["description", "type"])
        .remove_p_tags(&["type"]),
    );
    registry.register(
        "apiModelHook",
        Descriptor::new(
            parse_hook,
            TagPath::Dynamic(|ctx| format!("local.model.hooks.{}", ctx.current_model)),
            Method::Push,
        )
        .markdown(&["description"]),
    );
}

/// `@model Name title`
fn parse_model(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let first_line = content.trim().split(['\n', '@']).next().unwrap_or("").trim();
    let Some(caps) = RE_MODEL.captures(first_line) else {
        return Ok(None);
    };
    ctx.current_model = caps[1].to_string();
    Ok(Some(json!({
        "name": &caps[1],
        "title": caps.get(2).map_or("", |m| m.as_str()),
    })))
}

fn parse_group(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|group| json!({ "group": group })))
}

fn parse_name(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|name| json!({ "name": name })))
}

fn parse_description(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|description| json!({ "description": description })))
}

/// `@apiModel {model=Name} description`
fn parse_api_model(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let Some(caps) = RE_API_MODEL.captures(content) else {
        return Ok(None);
    };
    ctx.current_model = caps[1].to_string();
    let description = caps.get(2).map(|m| m.as_str()).filter(|d| !d.is_empty());
    Ok(Some(object! {
        "name" => &caps[1],
        "description" => description,
    }))
}

fn restore(text: &str) -> String {
    text.replace(SENTINEL, "\n")
}

/// Switch to the model named in parentheses, falling back to the current one.
fn select_model(ctx: &mut ParseContext, explicit: Option<regex::Match<'_>>) {
    if let Some(model) = explicit {
        ctx.current_model = restore(model.as_str());
    }
    if ctx.current_model.is_empty() {
        ctx.current_model = "Model".to_string();
    }
}

/// `@apiModelAttribute (Model) {Type @Decorator(args)} [field=default] description`
fn parse_attribute(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let content = content.trim().replace('\n', &SENTINEL.to_string());
    let Some(caps) = RE_ATTRIBUTE.captures(&content) else {
        return Ok(None);
    };
    select_model(ctx, caps.get(1));

    let decorators: Vec<(String, Option<String>)> = caps
        .get(3)
        .map(|m| {
            RE_DECORATOR
                .captures_iter(m.as_str())
                .map(|d| (d[1].to_string(), d.get(2).map(|p| p.as_str().to_string()).filter(|p| !p.is_empty())))
                .collect()
        })
        .unwrap_or_default();
    let has = |names: &[&str]| decorators.iter().any(|(name, _)| names.contains(&name.as_str()));

    let default_value = caps
        .get(6)
        .or_else(|| caps.get(7))
        .or_else(|| caps.get(8))
        .map(|m| restore(m.as_str()))
        .filter(|v| !v.is_empty());
    let optional = caps.get(4).is_some_and(|m| m.as_str().starts_with('['));
    let description = caps.get(9).map(|m| unindent(&restore(m.as_str()))).unwrap_or_default();

    Ok(Some(object! {
        "model" => ctx.current_model.as_str(),
        "type" => caps.get(2).map_or("Unknown", |m| m.as_str()),
        "decorators" => Value::Array(
            decorators
                .iter()
                .map(|(name, params)| {
                    object! {
                        "name" => name.as_str(),
                        "params" => params.as_deref(),
                        "category" => decorator_category(name),
                    }
                })
                .collect(),
        ),
        "optional" => optional,
        "field" => &caps[5],
        "defaultValue" => default_value,
        "description" => description,
        "isRelation" => has(&RELATIONS),
        "isPrimaryKey" => has(&["PrimaryKey"]),
        "isUnique" => has(&["Unique"]),
        "isIndex" => has(&["Index"]),
        "isTimestamp" => has(&TIMESTAMPS),
    }))
}

fn decorator_category(name: &str) -> &'static str {
    DECORATOR_CATEGORIES
        .iter()
        .find(|(_, names)| names.contains(&name))
        .map_or("other", |(category, _)| *category)
}

/// `@apiModelHook (Model) @AfterCreate methodName description`
fn parse_hook(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let content = content.trim().replace('\n', &SENTINEL.to_string());
    let Some(caps) = RE_HOOK.captures(&content) else {
        return Ok(None);
    };
    select_model(ctx, caps.get(1));
    let decorator = &caps[2];
    let description = caps.get(4).map(|m| unindent(&restore(m.as_str()))).unwrap_or_default();
    Ok(Some(json!({
        "model": ctx.current_model,
        "decorator": decorator,
        "methodName": &caps[3],
        "description": description,
        "category": hook_category(decorator),
        "phase": hook_phase(decorator),
        "isBulk": decorator.contains("Bulk"),
    })))
}

/// `AfterCreate` becomes `afterCreate`; `ValidationFailed` is an after-validate hook.
fn hook_category(decorator: &str) -> String {
    if decorator == "ValidationFailed" {
        return "afterValidate".to_string();
    }
    if !LIFECYCLE_HOOKS.contains(&decorator) {
        return "other".to_string();
    }
    let mut chars = decorator.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => "other".to_string(),
    }
}

fn hook_phase(decorator: &str) -> &'static str {
    if decorator.starts_with("Before") {
        "before"
    } else if decorator.starts_with("After") {
        "after"
    } else if decorator.contains("Validat") {
        "validation"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn model_sets_current_model() {
        let mut ctx = ParseContext::new();
        let v = parse_model("User Complete user entity\nmore", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v, json!({"name": "User", "title": "Complete user entity"}));
        assert_eq!(ctx.current_model, "User");
    }

    #[test]
    fn api_model_requires_reference_syntax() {
        let mut ctx = ParseContext::new();
        assert!(parse_api_model("User", "", &mut ctx).unwrap().is_none());
        let v = parse_api_model("{model=Order}", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v, json!({"name": "Order"}));
        assert_eq!(ctx.current_model, "Order");
    }

    #[test]
    fn attribute_with_decorators() {
        let mut ctx = ParseContext::new();
        ctx.current_model = "User".into();
        let v = parse_attribute(
            "{String @Unique @BelongsTo(Company)} [email=none] Contact address",
            "",
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            v,
            json!({
                "model": "User",
                "type": "String",
                "decorators": [
                    {"name": "Unique", "category": "constraint"},
                    {"name": "BelongsTo", "params": "Company", "category": "relation"}
                ],
                "optional": true,
                "field": "email",
                "defaultValue": "none",
                "description": "Contact address",
                "isRelation": true,
                "isPrimaryKey": false,
                "isUnique": true,
                "isIndex": false,
                "isTimestamp": false
            })
        );
    }

    #[test]
    fn attribute_explicit_model_sticks() {
        let mut ctx = ParseContext::new();
        let v = parse_attribute("(Post) {Number} id", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["model"], "Post");
        let v = parse_attribute("title", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["model"], "Post");
        assert_eq!(v["type"], "Unknown");
    }

    #[test]
    fn attribute_without_any_model_uses_placeholder() {
        let mut ctx = ParseContext::new();
        let v = parse_attribute("{Number} id", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["model"], "Model");
    }

    #[test]
    fn hook_categories() {
        let mut ctx = ParseContext::new();
        let v = parse_hook("(User) @BeforeBulkCreate hashAll Hash passwords", "", &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(v["category"], "beforeBulkCreate");
        assert_eq!(v["phase"], "before");
        assert_eq!(v["isBulk"], true);
        assert_eq!(v["methodName"], "hashAll");

        let v = parse_hook("@ValidationFailed report", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["category"], "afterValidate");
        assert_eq!(v["phase"], "validation");
        assert_eq!(v["model"], "User");

        let v = parse_hook("@Custom run", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["category"], "other");
    }
}
