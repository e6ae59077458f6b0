//! JSDoc file-level tags and the TSDoc subset.
//!
//! `@file`, `@author`, `@copyright`, `@license`, `@package` and `@see` merge
//! flat fields into the block. The TSDoc tags keep their data under
//! `tsdoc*` keys so they never collide with the endpoint fields.

use super::{non_empty, Descriptor, Registry};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::model::Method;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

static RE_NAME_EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)\s*<([^>]+)>$").unwrap());
static RE_COPYRIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4}(?:-\d{4})?)\s*(.+)?$").unwrap());
static RE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static RE_SEE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{@link\s+([^\s}]+)(?:\s+([^}]+))?\}(?:\s+(.+))?$").unwrap());
static RE_SEE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(https?://\S+)(?:\s+(.+))?$").unwrap());
static RE_PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_TSDOC_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([a-zA-Z_$][a-zA-Z0-9_$]*)\??(?:\s*-\s*)?(.*)$").unwrap());
static RE_CODE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```|^//|^#|^\s*\*|^\s*const|^\s*let|^\s*var|^\s*function|^\s*class|^\s*interface|^\s*type").unwrap()
});

pub fn register(registry: &mut Registry) {
    registry.register("file", Descriptor::at(parse_file, "local", Method::Insert));
    registry.register("author", Descriptor::at(parse_author, "local", Method::Insert));
    registry.register("copyright", Descriptor::at(parse_copyright, "local", Method::Insert));
    registry.register("license", Descriptor::at(parse_license, "local", Method::Insert));
    registry.register("package", Descriptor::at(parse_package, "local", Method::Insert));
    registry.register("see", Descriptor::at(parse_see, "local", Method::Insert));

    registry.register("param", Descriptor::at(parse_param, "local.tsdocParams", Method::Push));
    registry.register("returns", Descriptor::at(parse_description, "local.tsdocReturns", Method::Insert));
    registry.register("remarks", Descriptor::at(parse_description, "local.tsdocRemarks", Method::Insert));
    registry.register("example", Descriptor::at(parse_example, "local.tsdocExamples", Method::Push));
    registry.register(
        "public",
        Descriptor::at(|_, _, _| Ok(Some(json!({"visibility": "public", "stable": true}))), "local.tsdocVisibility", Method::Insert),
    );
    registry.register(
        "internal",
        Descriptor::at(
            |_, _, _| Ok(Some(json!({"visibility": "internal", "publishable": false}))),
            "local.tsdocVisibility",
            Method::Insert,
        ),
    );
    registry.register(
        "alpha",
        Descriptor::at(
            |_, _, _| Ok(Some(json!({"releaseStage": "alpha", "released": false, "hideInPublic": true}))),
            "local.tsdocReleaseStage",
            Method::Insert,
        ),
    );
    registry.register(
        "beta",
        Descriptor::at(
            |_, _, _| Ok(Some(json!({"releaseStage": "beta", "experimental": true, "productionReady": false}))),
            "local.tsdocReleaseStage",
            Method::Insert,
        ),
    );
}

// -- JSDoc --------------------------------------------------------------------

/// First paragraph is the short description; the full text is kept when
/// there is more than one.
fn parse_file(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(description) = non_empty(content) else {
        return Ok(None);
    };
    let mut parts = RE_PARAGRAPH_BREAK.split(description);
    let short = parts.next().unwrap_or("").trim();
    let long = parts.next().is_some().then_some(description);
    Ok(Some(object! {
        "fileDescription" => short,
        "fileDescriptionLong" => long,
    }))
}

/// `Name <mail@host>`, a bare address or a bare name.
fn parse_author(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(author) = non_empty(content) else {
        return Ok(None);
    };
    let (name, email) = match RE_NAME_EMAIL.captures(author) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().trim()),
            caps.get(2).map(|m| m.as_str().trim()),
        ),
        None if author.contains('@') => (None, Some(author)),
        None => (Some(author), None),
    };
    Ok(Some(object! {
        "author" => author,
        "authorName" => name,
        "authorEmail" => email,
    }))
}

/// `2019-2024 Holder`: leading year or year range, then the holder.
fn parse_copyright(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(copyright) = non_empty(content) else {
        return Ok(None);
    };
    let (year, holder) = match RE_COPYRIGHT.captures(copyright) {
        Some(caps) => (
            Some(caps[1].to_string()),
            caps.get(2).map(|m| m.as_str().trim()).filter(|h| !h.is_empty()).map(str::to_string),
        ),
        None => (None, Some(copyright.to_string())),
    };
    Ok(Some(object! {
        "copyright" => copyright,
        "copyrightYear" => year,
        "copyrightHolder" => holder,
    }))
}

/// License name, URL, or both in any order.
fn parse_license(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(license) = non_empty(content) else {
        return Ok(None);
    };
    let (kind, url) = match RE_URL.find(license) {
        Some(m) => {
            let rest = license.replacen(m.as_str(), "", 1);
            let rest = rest.trim();
            ((!rest.is_empty()).then(|| rest.to_string()), Some(m.as_str()))
        }
        None => (Some(license.to_string()), None),
    };
    Ok(Some(object! {
        "license" => license,
        "licenseType" => kind,
        "licenseUrl" => url,
    }))
}

/// `com.example.billing` splits into namespace and module at the last dot.
fn parse_package(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(package) = non_empty(content) else {
        return Ok(None);
    };
    let split = package.rsplit_once('.');
    Ok(Some(object! {
        "packageName" => package,
        "packageNamespace" => split.map(|(namespace, _)| namespace),
        "packageModule" => split.map(|(_, module)| module),
    }))
}

/// `{@link target title}`, a URL with an optional title, or a plain reference.
fn parse_see(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(see) = non_empty(content) else {
        return Ok(None);
    };
    if let Some(caps) = RE_SEE_LINK.captures(see) {
        let title = caps.get(3).or_else(|| caps.get(2)).map(|m| m.as_str());
        return Ok(Some(object! {
            "see" => see,
            "seeType" => "link",
            "seeUrl" => &caps[1],
            "seeTitle" => title,
        }));
    }
    if let Some(caps) = RE_SEE_URL.captures(see) {
        return Ok(Some(object! {
            "see" => see,
            "seeType" => "url",
            "seeUrl" => &caps[1],
            "seeTitle" => caps.get(2).map(|m| m.as_str()),
        }));
    }
    Ok(Some(json!({ "see": see, "seeType": "reference", "seeReference": see })))
}

// -- TSDoc --------------------------------------------------------------------

/// `name - description`; a `name?` marks the parameter optional.
fn parse_param(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let Some(caps) = RE_TSDOC_PARAM.captures(content) else {
        return Ok(None);
    };
    let name = &caps[1];
    let optional = content.contains(&format!("{name}?"));
    Ok(Some(object! {
        "name" => name,
        "description" => caps[2].trim(),
        "optional" => optional.then_some(true),
    }))
}

fn parse_description(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|description| json!({ "description": description })))
}

/// A first line that does not look like code is the example title.
fn parse_example(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(trimmed) = non_empty(content) else {
        return Ok(None);
    };
    let lines: Vec<&str> = content.lines().collect();
    let first_line = lines.first().map_or("", |l| l.trim());
    if lines.len() == 1 || RE_CODE_START.is_match(first_line) {
        return Ok(Some(json!({ "code": trimmed })));
    }
    let code = lines[1..].join("\n");
    let code = code.trim();
    if code.is_empty() {
        return Ok(Some(json!({ "code": first_line })));
    }
    Ok(Some(json!({ "title": first_line, "code": code })))
}
