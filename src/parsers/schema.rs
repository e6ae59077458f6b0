//! `@apiSchema (group) {interface=Name} element` and
//! `@apiSchema (group) {jsonschema=path.json} element`.
//!
//! A hook replaces the schema element with one parameter element per
//! property, before the dispatcher sees the block.

use super::typescript;
use super::{Descriptor, Registry};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::hooks::{Hooks, FIND_ELEMENTS};
use crate::model::{Element, Method};
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static RE_SCHEMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\((.+?)\))?\s*\{(.+?)=(.+?)\}\s*(?:(.+?))?$").unwrap());

/// Runs before `@apiCode` expansion.
const SCHEMA_HOOK_PRIORITY: i32 = 200;

pub fn register(registry: &mut Registry) {
    registry.register(
        "apiSchema",
        Descriptor::at(parse_schema, "local", Method::Push).with_init(init_schema_hook),
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRef {
    pub group: String,
    pub schema_type: String,
    pub schema_value: String,
    pub element: String,
}

/// Parse the single-line schema reference.
pub fn parse_reference(content: &str) -> Option<SchemaRef> {
    let content = content.trim();
    if content.is_empty() || content.contains('\n') || content.contains("//") {
        return None;
    }
    if !(content.contains('{') && content.contains('=') && content.contains('}')) {
        return None;
    }
    let caps = RE_SCHEMA.captures(content)?;
    Some(SchemaRef {
        group: caps.get(1).map_or("", |m| m.as_str()).to_string(),
        schema_type: caps[2].to_string(),
        schema_value: caps[3].to_string(),
        element: caps.get(4).map_or("apiParam", |m| m.as_str()).to_string(),
    })
}

fn parse_schema(content: &str, _source: &str, _ctx: &mut ParseContext) -> Result<Option<Value>, TagError> {
    Ok(parse_reference(content).map(|r| {
        object! {
            "group" => r.group,
            "schemaType" => r.schema_type,
            "schemaValue" => r.schema_value,
            "element" => r.element,
        }
    }))
}

fn init_schema_hook(hooks: &mut Hooks) {
    hooks.add_elements_hook(FIND_ELEMENTS, SCHEMA_HOOK_PRIORITY, expand_schema);
}

fn expand_schema(elements: &mut Vec<Element>, _block: &str, filename: &str) {
    if elements.last().map(|e| e.name.as_str()) != Some("apischema") {
        return;
    }
    let Some(element) = elements.pop() else {
        return;
    };
    let Some(reference) = parse_reference(&element.content) else {
        let c = &element.content;
        if c.contains('{') && c.contains('=') && c.contains('}') {
            tracing::warn!("could not parse @apiSchema: {c}");
        }
        return;
    };

    let filename = Path::new(filename);
    match reference.schema_type.as_str() {
        "interface" => elements.extend(interface_elements(&reference, filename)),
        "jsonschema" => elements.extend(json_schema_elements(&reference, filename)),
        other => tracing::warn!("unknown @apiSchema type '{other}'"),
    }
}

fn interface_elements(reference: &SchemaRef, filename: &Path) -> Vec<Element> {
    let name = &reference.schema_value;
    if let Some(iface) = typescript::find_interface(name, filename) {
        return iface.to_elements(&reference.element, &reference.group);
    }
    tracing::warn!("could not find TypeScript interface '{name}' in source files");
    let prefix = if reference.group.is_empty() {
        String::new()
    } else {
        format!("({}) ", reference.group)
    };
    let content = format!("{prefix}{{Object}} data {name} interface");
    let source = format!("@{} {content}", reference.element);
    vec![Element::new(&reference.element, &content, &source)]
}

fn json_schema_elements(reference: &SchemaRef, filename: &Path) -> Vec<Element> {
    let dir = filename.parent().unwrap_or_else(|| Path::new(""));
    let path = dir.join(&reference.schema_value);
    let schema: Value = match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(schema) => schema,
        Err(e) => {
            tracing::warn!("could not parse JSON schema at {}: {e}", reference.schema_value);
            return Vec::new();
        }
    };

    let mut definitions = Vec::new();
    traverse(&schema, "", &mut definitions);

    let element = reference.element.as_str();
    definitions
        .into_iter()
        .map(|definition| {
            let (content, source) = if reference.group.is_empty() {
                (definition.clone(), format!("@{element} {definition}"))
            } else {
                let group = &reference.group;
                (
                    format!("({group}) {definition}"),
                    format!("@{element} {definition}").replacen('{', &format!("({group}) {{"), 1),
                )
            };
            Element::new(element, &content, &source)
        })
        .collect()
}

/// `{type} field description` per property, nested objects dotted.
fn traverse(schema: &Value, prefix: &str, out: &mut Vec<String>) {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return;
    }
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for (key, prop) in properties {
        let name = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        let field = if required.contains(&key.as_str()) { name.clone() } else { format!("[{name}]") };
        let description = prop.get("description").and_then(Value::as_str).unwrap_or("");
        out.push(format!("{{{}}} {field} {description}", json_type(prop)));
        if prop.get("type").and_then(Value::as_str) == Some("object") && prop.get("properties").is_some() {
            traverse(prop, &name, out);
        }
    }
}

fn json_type(schema: &Value) -> String {
    match schema.get("type").and_then(Value::as_str) {
        Some("string") => "String".to_string(),
        Some("number" | "integer") => "Number".to_string(),
        Some("boolean") => "Boolean".to_string(),
        Some("array") => match schema.get("items") {
            Some(items) => format!("{}[]", json_type(items)),
            None => "Array".to_string(),
        },
        Some("object") => "Object".to_string(),
        _ => "Mixed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reference_with_group_and_element() {
        let r = parse_reference("(Body) {interface=CreateUser} apiBody").unwrap();
        assert_eq!(r.group, "Body");
        assert_eq!(r.schema_type, "interface");
        assert_eq!(r.schema_value, "CreateUser");
        assert_eq!(r.element, "apiBody");
    }

    #[test]
    fn reference_defaults_to_api_param() {
        let r = parse_reference("{jsonschema=./user.json}").unwrap();
        assert_eq!(r.element, "apiParam");
        assert_eq!(r.group, "");
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert!(parse_reference("User").is_none());
        assert!(parse_reference("{interface=A}\napiParam").is_none());
        assert!(parse_reference("{jsonschema=http://x/y.json}").is_none());
    }

    #[test]
    fn json_schema_expands_to_elements() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("user.json"),
            r#"{
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": {"type": "integer", "description": "User ID"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "address": {"type": "object", "properties": {"city": {"type": "string"}}}
                }
            }"#,
        )
        .unwrap();
        let filename = dir.path().join("api.js");
        let mut elements = vec![Element::new(
            "apiSchema",
            "(Input) {jsonschema=user.json} apiBody",
            "@apiSchema (Input) {jsonschema=user.json} apiBody",
        )];
        expand_schema(&mut elements, "", filename.to_str().unwrap());

        let contents: Vec<_> = elements.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(
            contents,
            [
                "(Input) {Number} id User ID",
                "(Input) {String[]} [tags] ",
                "(Input) {Object} [address] ",
                "(Input) {String} [address.city] ",
            ]
        );
        assert_eq!(elements[0].name, "apibody");
        assert_eq!(elements[0].source, "@apiBody (Input) {Number} id User ID");
    }

    #[test]
    fn missing_interface_falls_back_to_object() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("api.js");
        let mut elements = vec![Element::new(
            "apiSchema",
            "{interface=Nope} apiSuccess",
            "@apiSchema {interface=Nope} apiSuccess",
        )];
        expand_schema(&mut elements, "", filename.to_str().unwrap());
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].source_name, "apiSuccess");
        assert_eq!(elements[0].content, "{Object} data Nope interface");
    }

    #[test]
    fn interface_in_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("types.ts"), "interface Login { user: string; remember?: boolean }").unwrap();
        let filename = dir.path().join("api.ts");
        let mut elements = vec![Element::new("apiSchema", "{interface=Login}", "@apiSchema {interface=Login}")];
        expand_schema(&mut elements, "", filename.to_str().unwrap());
        let contents: Vec<_> = elements.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["{String} user User", "{Boolean} [remember] Remember"]);
    }
}
