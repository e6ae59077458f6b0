//! Endpoint-level tags: `@api`, `@apiDefine`, `@apiUse`, `@apiVersion` and the
//! single-value tags that describe an endpoint.

use super::{non_empty, underscore_whitespace, Descriptor, Registry};
use crate::context::ParseContext;
use crate::error::{ParameterError, TagError};
use crate::model::Method;
use crate::unindent::unindent;
use crate::version;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

// -- Regex patterns -----------------------------------------------------------

static RE_API: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:\{(.+?)\})?\s*)?(.+?)(?:\s+(.+?))?$").unwrap());

static RE_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Za-z0-9_:]*)(.*?)(?:\s+|$)(.*)$").unwrap());

pub fn register(registry: &mut Registry) {
    registry.register("api", Descriptor::at(parse_api, "local", Method::Insert));
    registry.register(
        "apiDefine",
        Descriptor::at(parse_define, "global.define", Method::Insert).markdown(&["description"]),
    );
    registry.register("apiUse", Descriptor::at(parse_use, "local.use", Method::Push).prevent_global());
    registry.register(
        "apiVersion",
        Descriptor::at(parse_version, "local", Method::Insert).extend_root(),
    );
    registry.register("apiGroup", Descriptor::at(parse_group, "local", Method::Insert));
    registry.register("apiName", Descriptor::at(parse_name, "local", Method::Insert));
    registry.register(
        "apiDescription",
        Descriptor::at(parse_description, "local", Method::Insert).markdown(&["description"]),
    );
    registry.register("apiPrivate", Descriptor::at(parse_private, "local", Method::Insert));
    registry.register(
        "apiDeprecated",
        Descriptor::at(parse_deprecated, "local", Method::Insert)
            .markdown(&["deprecated.content"])
            .remove_p_tags(&["deprecated.content"]),
    );
    registry.register(
        "apiPermission",
        Descriptor::at(parse_permission, "local.permission", Method::Push),
    );
    registry.register(
        "apiSampleRequest",
        Descriptor::at(parse_sample_request, "local.sampleRequest", Method::Push),
    );

    for (tag, path) in [
        ("apiStructure", "local.structure"),
        ("apiSuccessStructure", "local.successStructure"),
        ("apiErrorStructure", "local.errorStructure"),
        ("apiHeaderStructure", "local.headerStructure"),
    ] {
        registry.register(
            tag,
            Descriptor::at(parse_use, path, Method::Push)
                .prevent_global()
                .deprecated(Some("@apiUse")),
        );
    }
}

/// `@api {method} url title`
pub fn parse_api(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(caps) = RE_API.captures(content.trim()) else {
        return Ok(None);
    };
    Ok(Some(object! {
        "type" => caps.get(1).map(|m| m.as_str()),
        "url" => caps.get(2).map_or("", |m| m.as_str()),
        "title" => caps.get(3).map_or("", |m| m.as_str()),
    }))
}

/// `@apiDefine name [title]` followed by description lines.
pub fn parse_define(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let content = content.trim();
    let define_error =
        |message: &str| ParameterError::new(message, "apiDefine", "@apiDefine name", "@apiDefine MyValidName");

    let mut matches = RE_DEFINE.captures_iter(content);
    let Some(first) = matches.next() else {
        return Ok(None);
    };
    if first[0].is_empty() {
        return Err(define_error("No arguments found.").into());
    }
    if !first[2].is_empty() {
        return Err(define_error("Name must contain only alphanumeric and colon characters.").into());
    }

    let mut description = String::new();
    for caps in matches {
        description.push_str(&caps[0]);
        description.push('\n');
    }
    Ok(Some(json!({
        "name": &first[1],
        "title": &first[3],
        "description": unindent(&description),
    })))
}

/// `@apiUse name`, also used by the deprecated structure tags.
pub fn parse_use(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|name| json!({ "name": name })))
}

pub fn parse_version(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(text) = non_empty(content) else {
        return Ok(None);
    };
    if !version::is_valid(text) {
        return Err(ParameterError::new(
            "Version format not valid.",
            "apiVersion",
            "@apiVersion major.minor.patch",
            "@apiVersion 1.2.3",
        )
        .into());
    }
    Ok(Some(json!({ "version": text })))
}

fn parse_group(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|g| json!({ "group": underscore_whitespace(g) })))
}

fn parse_name(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|n| json!({ "name": underscore_whitespace(n) })))
}

fn parse_description(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|d| json!({ "description": unindent(d) })))
}

fn parse_private(_content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(Some(json!({ "private": true })))
}

fn parse_deprecated(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let value = match non_empty(content) {
        Some(text) => json!({ "deprecated": { "content": unindent(text) } }),
        None => json!({ "deprecated": true }),
    };
    Ok(Some(value))
}

fn parse_permission(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|name| json!({ "name": name, "title": "", "description": "" })))
}

fn parse_sample_request(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|url| json!({ "url": url })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(f: crate::parsers::ParseFn, content: &str) -> Parsed {
        f(content, "", &mut ParseContext::new())
    }

    #[test]
    fn api_with_type_url_and_title() {
        let v = run(parse_api, "{get} /user/:id Get User").unwrap().unwrap();
        assert_eq!(v, json!({"type": "get", "url": "/user/:id", "title": "Get User"}));
    }

    #[test]
    fn api_without_type_omits_it() {
        let v = run(parse_api, "/health").unwrap().unwrap();
        assert_eq!(v, json!({"url": "/health", "title": ""}));
    }

    #[test]
    fn define_collects_description_lines() {
        let v = run(parse_define, "UserNotFound Not found title\n  The user was\n  not found.")
            .unwrap()
            .unwrap();
        assert_eq!(v["name"], "UserNotFound");
        assert_eq!(v["title"], "Not found title");
        assert_eq!(v["description"], "The user was\nnot found.\n");
    }

    #[test]
    fn define_rejects_empty_and_bad_names() {
        let err = run(parse_define, "   ").unwrap_err();
        assert_eq!(err.to_string(), "No arguments found.");
        let err = run(parse_define, "My-Name title").unwrap_err();
        assert_eq!(err.to_string(), "Name must contain only alphanumeric and colon characters.");
    }

    #[test]
    fn define_allows_colons() {
        let v = run(parse_define, "admin:read").unwrap().unwrap();
        assert_eq!(v["name"], "admin:read");
        assert_eq!(v["title"], "");
    }

    #[test]
    fn version_must_be_semver() {
        assert_eq!(run(parse_version, " 1.2.3 ").unwrap().unwrap(), json!({"version": "1.2.3"}));
        match run(parse_version, "1.2") {
            Err(TagError::Parameter(e)) => {
                assert_eq!(e.message, "Version format not valid.");
                assert_eq!(e.element, "apiVersion");
            }
            other => panic!("expected parameter error, got {other:?}"),
        }
        assert!(run(parse_version, "").unwrap().is_none());
    }

    #[test]
    fn group_and_name_replace_whitespace() {
        assert_eq!(run(parse_group, "User Admin").unwrap().unwrap(), json!({"group": "User_Admin"}));
        assert_eq!(run(parse_name, " GetUser ").unwrap().unwrap(), json!({"name": "GetUser"}));
        assert!(run(parse_name, "  ").unwrap().is_none());
    }

    #[test]
    fn deprecated_with_and_without_text() {
        assert_eq!(run(parse_deprecated, "").unwrap().unwrap(), json!({"deprecated": true}));
        assert_eq!(
            run(parse_deprecated, "use (#User:GetUserV2)").unwrap().unwrap(),
            json!({"deprecated": {"content": "use (#User:GetUserV2)"}})
        );
    }

    #[test]
    fn permission_has_empty_title() {
        assert_eq!(
            run(parse_permission, "admin").unwrap().unwrap(),
            json!({"name": "admin", "title": "", "description": ""})
        );
    }
}
