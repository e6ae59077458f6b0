//! OpenAPI 3 fragments written directly in comments.
//!
//! `@openapi` takes an inline YAML or JSON document (a `paths` object, a bare
//! operation, or a components/info document) and maps its first operation
//! onto the classic endpoint fields. `@openapi {openapi=spec.yaml}` or
//! `@openapi /users {openapi=spec.yaml}` pulls operations from a file next
//! to the source. `@openapi-path`, `@openapi-schema` and `@openapi-operation`
//! document a single path, schema or operation.

use super::{underscore_whitespace, Descriptor, Registry};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::hooks::{Hooks, FIND_ELEMENTS};
use crate::model::{is_falsy, Element, Method};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

/// Version reported when the document carries none.
const DEFAULT_VERSION: &str = "4.0.0";

/// Runs before `@apiSchema` expansion.
const EXTERNAL_HOOK_PRIORITY: i32 = 190;

const HTTP_METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "head", "options", "trace"];

// -- Regex patterns -----------------------------------------------------------

static RE_EXTERNAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)\s*\{openapi=(.+?)\}$").unwrap());
static RE_EXTERNAL_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{openapi=(.+?)\}$").unwrap());

static RE_PATH_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]+)\}").unwrap());
static RE_NAME_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[{}/:]").unwrap());

static RE_VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^v?(\d+\.\d+(?:\.\d+)?)$").unwrap());
static RE_VERSION_PREFIX_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^version:?[\s-]*(\d+\.\d+(?:\.\d+)?)$").unwrap());

static RE_SCHEMA_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(schema|component|model)\s+").unwrap());

pub fn register(registry: &mut Registry) {
    registry.register(
        "openapi",
        Descriptor::at(parse_openapi, "local", Method::Insert).with_init(init_external_hook),
    );
    registry.register("openapi-path", Descriptor::at(parse_path, "local", Method::Insert));
    registry.register("openapi-schema", Descriptor::at(parse_schema, "local", Method::Insert));
    registry.register("openapi-operation", Descriptor::at(parse_operation, "local", Method::Insert));
}

// -- Document loading ---------------------------------------------------------

/// Parse YAML or JSON, trying the likelier format first.
pub fn load_document(text: &str) -> Result<Value, String> {
    let json = || serde_json::from_str::<Value>(text).map_err(|e| e.to_string());
    let yaml = || {
        serde_yaml::from_str::<serde_yaml::Value>(text)
            .map(yaml_to_json)
            .map_err(|e| e.to_string())
    };
    if text.starts_with('{') || text.starts_with('[') {
        json().or_else(|_| yaml())
    } else {
        yaml().or_else(|_| json())
    }
}

/// YAML keys may be numbers (`200:`); JSON object keys are always strings.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                map.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Lenient variant used for definition bodies: failures become `{}`.
fn load_or_empty(text: &str, what: &str) -> Value {
    if text.is_empty() {
        return json!({});
    }
    match load_document(text) {
        Ok(Value::Null) => json!({}),
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse OpenAPI definition for {what}: {e}");
            json!({})
        }
    }
}

// -- Small accessors ----------------------------------------------------------

fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn truthy<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !is_falsy(v))
}

fn first_operation<'a>(item: &'a Value, methods: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    methods
        .iter()
        .find_map(|m| truthy(item, m).map(|operation| (*m, operation)))
}

/// `/users/{id}` becomes `/users/:id`.
pub fn to_route(path: &str) -> String {
    RE_PATH_PARAM.replace_all(path, ":$1").into_owned()
}

/// `get` + `/users/{id}` becomes `getUsersId`.
pub fn operation_name(method: &str, path: &str) -> String {
    let cleaned = RE_NAME_SEPARATORS.replace_all(path, " ");
    let mut name = method.to_lowercase();
    for word in cleaned.split_whitespace() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(&chars.as_str().to_lowercase());
        }
    }
    name
}

/// `x-version`, or a tag shaped like `v1.2` / `version: 1.2.0`.
fn operation_version(operation: &Value) -> Option<String> {
    if let Some(version) = text(operation, "x-version") {
        return Some(version.to_string());
    }
    let tags = operation.get("tags").and_then(Value::as_array)?;
    tags.iter().filter_map(Value::as_str).find_map(|tag| {
        RE_VERSION_TAG
            .captures(tag)
            .or_else(|| RE_VERSION_PREFIX_TAG.captures(tag))
            .map(|caps| caps[1].to_string())
    })
}

fn operation_group(operation: &Value) -> Option<String> {
    text(operation, "x-group")
        .or_else(|| {
            operation
                .get("tags")
                .and_then(Value::as_array)
                .and_then(|tags| tags.first())
                .and_then(Value::as_str)
        })
        .map(underscore_whitespace)
}

// -- @openapi -----------------------------------------------------------------

fn parse_openapi(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }
    if let Some((path_spec, file)) = external_reference(content) {
        return Ok(load_external(&path_spec, &file, &ctx.filename).map(|(document, source_file, path_spec)| {
            json!({ "openapi": document, "sourceFile": source_file, "pathSpec": path_spec })
        }));
    }

    let document = match load_document(content) {
        Ok(document) if document.is_object() => document,
        Ok(_) => return Ok(None),
        Err(e) => {
            tracing::warn!("failed to parse @openapi content: {e}");
            return Ok(None);
        }
    };
    Ok(convert_document(&document))
}

/// `(path spec, file)` of an `{openapi=file}` reference.
fn external_reference(content: &str) -> Option<(String, String)> {
    if let Some(caps) = RE_EXTERNAL_ONLY.captures(content) {
        return Some((String::new(), caps[1].trim().to_string()));
    }
    RE_EXTERNAL
        .captures(content)
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
}

fn convert_document(document: &Value) -> Option<Value> {
    let is_paths = document
        .as_object()
        .is_some_and(|o| o.keys().any(|k| k.starts_with('/')));
    if let Some(paths) = truthy(document, "paths") {
        return convert_paths(paths, document.get("components"));
    }
    if is_paths {
        return convert_paths(document, document.get("components"));
    }
    let is_operation = ["responses", "parameters", "requestBody", "operationId"]
        .iter()
        .any(|k| document.get(*k).is_some());
    if is_operation {
        return Some(standalone_operation(document));
    }
    if ["components", "schemas", "info"].iter().any(|k| truthy(document, k).is_some()) {
        return Some(documentation_entry(document));
    }
    None
}

/// Classic endpoint fields for the first operation of the first path.
fn convert_paths(paths: &Value, components: Option<&Value>) -> Option<Value> {
    let (path, item) = paths.as_object()?.iter().next()?;
    let (method, operation) = first_operation(item, &HTTP_METHODS)?;

    let mut result = Map::new();
    result.insert("type".into(), json!(method));
    result.insert("url".into(), json!(to_route(path)));
    result.insert("title".into(), json!(operation_title(operation, method, path)));
    result.insert(
        "name".into(),
        json!(text(operation, "operationId").map_or_else(|| operation_name(method, path), str::to_string)),
    );
    result.insert("description".into(), json!(text(operation, "description").unwrap_or("")));
    result.insert(
        "version".into(),
        json!(operation_version(operation).unwrap_or_else(|| DEFAULT_VERSION.to_string())),
    );
    result.insert("openapi".into(), json!({ "paths": { path.as_str(): item } }));

    if let Some(parameters) = operation.get("parameters").and_then(Value::as_array).filter(|p| !p.is_empty()) {
        result.insert("parameter".into(), Value::Array(parameters.iter().map(convert_parameter).collect()));
    }
    if let Some(body) = truthy(operation, "requestBody") {
        result.insert("body".into(), Value::Array(request_body_fields(body, components)));
    }
    if let Some(responses) = operation.get("responses").and_then(Value::as_object) {
        let (success, error) = response_fields(responses, components);
        if !success.is_empty() {
            result.insert("success".into(), json!({ "fields": { "Success 200": success } }));
        }
        if !error.is_empty() {
            result.insert("error".into(), json!({ "fields": { "Error 4xx": error } }));
        }
    }
    if let Some(group) = operation_group(operation) {
        result.insert("group".into(), json!(group));
    }
    Some(Value::Object(result))
}

fn operation_title(operation: &Value, method: &str, path: &str) -> String {
    text(operation, "summary")
        .or_else(|| text(operation, "operationId"))
        .map_or_else(|| format!("{} {path}", method.to_uppercase()), str::to_string)
}

fn standalone_operation(operation: &Value) -> Value {
    let title = text(operation, "summary")
        .or_else(|| text(operation, "operationId"))
        .unwrap_or("OpenAPI Operation");
    json!({
        "type": "openapi-operation",
        "title": title,
        "name": text(operation, "operationId").unwrap_or("OpenAPIOperation"),
        "description": text(operation, "description").unwrap_or(""),
        "version": operation_version(operation).unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        "openapi": operation,
        "group": operation_group(operation).unwrap_or_else(|| "OpenAPI".to_string()),
    })
}

fn documentation_entry(document: &Value) -> Value {
    let version = text(document, "x-version")
        .or_else(|| document.get("info").and_then(|info| text(info, "version")))
        .unwrap_or(DEFAULT_VERSION);
    let (title, name, description, group) = if let Some(info) = truthy(document, "info") {
        (
            text(info, "title").unwrap_or("API Documentation"),
            "APIInfo",
            text(info, "description").unwrap_or(""),
            "API_Information",
        )
    } else if truthy(document, "components").is_some() {
        ("OpenAPI Components", "Components", "Reusable OpenAPI components", "Components")
    } else {
        ("OpenAPI Schemas", "Schemas", "OpenAPI schema definitions", "Schemas")
    };
    json!({
        "type": "openapi-doc",
        "group": group,
        "version": version,
        "openapi": document,
        "title": title,
        "name": name,
        "description": description,
    })
}

fn convert_parameter(parameter: &Value) -> Value {
    let schema = parameter.get("schema");
    object! {
        "group" => "Parameter",
        "type" => api_type(schema),
        "optional" => !parameter.get("required").is_some_and(|r| !is_falsy(r)),
        "field" => parameter.get("name").cloned(),
        "description" => text(parameter, "description").unwrap_or(""),
        "defaultValue" => schema.and_then(|s| truthy(s, "example")).cloned(),
    }
}

fn request_body_fields(body: &Value, components: Option<&Value>) -> Vec<Value> {
    let Some((content_type, media)) = body
        .get("content")
        .and_then(Value::as_object)
        .and_then(|c| c.iter().next())
    else {
        return Vec::new();
    };
    match media.get("schema") {
        Some(schema) => schema_fields(schema, content_type, None, components),
        None => Vec::new(),
    }
}

fn response_fields(responses: &Map<String, Value>, components: Option<&Value>) -> (Vec<Value>, Vec<Value>) {
    let mut success = Vec::new();
    let mut error = Vec::new();
    for (status, response) in responses {
        let is_error = is_error_status(status);
        let target = if is_error { &mut error } else { &mut success };
        match response.get("content").and_then(Value::as_object) {
            Some(content) => {
                if let Some((content_type, media)) = content.iter().next() {
                    if let Some(schema) = media.get("schema") {
                        target.extend(schema_fields(schema, content_type, Some(status), components));
                    }
                }
            }
            None => target.push(json!({
                "group": if is_error { "Error" } else { "Success" },
                "type": "Object",
                "field": status,
                "description": text(response, "description").unwrap_or(""),
                "optional": false,
            })),
        }
    }
    (success, error)
}

/// Leading integer of a status key (`404`, `4XX`) is at least 400.
fn is_error_status(status: &str) -> bool {
    let digits: String = status.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<u32>().is_ok_and(|code| code >= 400)
}

fn schema_fields(schema: &Value, content_type: &str, status: Option<&str>, components: Option<&Value>) -> Vec<Value> {
    let group = if status.is_some_and(is_error_status) { "Error" } else { "Success" };
    let resolved = resolve_ref(schema, components);
    let properties = |s: &Value| s.get("properties").and_then(Value::as_object).cloned();
    let required = |s: &Value, field: &str| {
        s.get("required")
            .and_then(Value::as_array)
            .is_some_and(|r| r.iter().any(|f| f.as_str() == Some(field)))
    };
    fn kind(s: &Value) -> Option<&str> {
        s.get("type").and_then(Value::as_str)
    }

    if kind(resolved) == Some("object") {
        if let Some(props) = properties(resolved) {
            return props
                .iter()
                .map(|(name, prop)| {
                    let prop_resolved = resolve_ref(prop, components);
                    object! {
                        "group" => group,
                        "type" => api_type(Some(prop_resolved)),
                        "optional" => !required(resolved, name),
                        "field" => name.as_str(),
                        "description" => text(prop_resolved, "description").or_else(|| text(prop, "description")).unwrap_or(""),
                        "defaultValue" => truthy(prop_resolved, "example").cloned(),
                        "allowedValues" => truthy(prop_resolved, "enum").cloned(),
                    }
                })
                .collect();
        }
    }
    if kind(resolved) == Some("array") {
        if let Some(items) = truthy(resolved, "items") {
            let item = resolve_ref(items, components);
            if let (Some("object"), Some(props)) = (kind(item), properties(item)) {
                return props
                    .iter()
                    .map(|(name, prop)| {
                        let prop_resolved = resolve_ref(prop, components);
                        object! {
                            "group" => group,
                            "type" => format!("{}[]", api_type(Some(prop_resolved))),
                            "optional" => !required(item, name),
                            "field" => format!("{name}[]"),
                            "description" => text(prop_resolved, "description").or_else(|| text(prop, "description")).unwrap_or(""),
                            "defaultValue" => truthy(prop_resolved, "example").cloned(),
                        }
                    })
                    .collect();
            }
            return vec![json!({
                "group": group,
                "type": format!("{}[]", api_type(Some(item))),
                "field": "items[]",
                "description": text(resolved, "description").unwrap_or(""),
                "optional": false,
            })];
        }
    }

    let field = if content_type == "multipart/form-data" {
        "file".to_string()
    } else {
        text(resolved, "title").map_or_else(|| "data".to_string(), str::to_lowercase)
    };
    vec![json!({
        "group": group,
        "type": api_type(Some(resolved)),
        "field": field,
        "description": text(resolved, "description").or_else(|| text(schema, "description")).unwrap_or(""),
        "optional": false,
    })]
}

/// Follow a local `#/components/schemas/Name` reference.
fn resolve_ref<'a>(schema: &'a Value, components: Option<&'a Value>) -> &'a Value {
    let (Some(reference), Some(components)) = (text(schema, "$ref"), components) else {
        return schema;
    };
    reference
        .strip_prefix("#/components/schemas/")
        .and_then(|name| components.get("schemas")?.get(name))
        .unwrap_or(schema)
}

fn api_type(schema: Option<&Value>) -> String {
    let Some(schema) = schema else {
        return "String".to_string();
    };
    match schema.get("type").and_then(Value::as_str) {
        Some("integer" | "number") => "Number".to_string(),
        Some("boolean") => "Boolean".to_string(),
        Some("array") => format!("{}[]", api_type(schema.get("items"))),
        Some("object") => "Object".to_string(),
        Some("string") => match schema.get("format").and_then(Value::as_str) {
            Some("binary") => "File".to_string(),
            Some("date-time") => "Date".to_string(),
            _ => "String".to_string(),
        },
        _ => "String".to_string(),
    }
}

// -- External files -----------------------------------------------------------

/// Load `file` relative to `current_file`, narrowed to `path_spec` when it
/// names a path of the document. Returns the document, the resolved file
/// and the spec actually used.
fn load_external(path_spec: &str, file: &str, current_file: &Path) -> Option<(Value, String, String)> {
    let dir = current_file.parent().unwrap_or_else(|| Path::new(""));
    let resolved = dir.join(file);
    let text = match fs::read_to_string(&resolved) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("OpenAPI file not readable: {}: {e}", resolved.display());
            return None;
        }
    };
    let ext = resolved
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let loaded = match ext.as_str() {
        "json" => serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str::<serde_yaml::Value>(&text)
            .map(yaml_to_json)
            .map_err(|e| e.to_string()),
        _ => load_document(text.trim_start()),
    };
    let document = match loaded {
        Ok(document) if document.is_object() => document,
        Ok(_) => {
            tracing::warn!("invalid OpenAPI content in file: {}", resolved.display());
            return None;
        }
        Err(e) => {
            tracing::warn!("failed to load OpenAPI file {file}: {e}");
            return None;
        }
    };
    let document = narrow_to_path(document, path_spec);
    let spec = if path_spec.is_empty() { "full-spec" } else { path_spec };
    Some((document, resolved.display().to_string(), spec.to_string()))
}

fn narrow_to_path(document: Value, path_spec: &str) -> Value {
    if !path_spec.starts_with('/') {
        return document;
    }
    let Some(item) = document.get("paths").and_then(|p| p.get(path_spec)) else {
        return document;
    };
    json!({
        "openapi": document.get("openapi").cloned().unwrap_or_else(|| json!("3.0.0")),
        "info": document.get("info").cloned().unwrap_or_else(|| json!({"title": "API", "version": "1.0.0"})),
        "paths": { path_spec: item },
        "components": document.get("components").cloned().unwrap_or_else(|| json!({})),
    })
}

fn init_external_hook(hooks: &mut Hooks) {
    hooks.add_elements_hook(FIND_ELEMENTS, EXTERNAL_HOOK_PRIORITY, expand_external);
}

/// Replace a trailing `{openapi=file}` element by one `@openapi` element per
/// operation of the referenced document.
fn expand_external(elements: &mut Vec<Element>, _block: &str, filename: &str) {
    let Some(last) = elements.last() else {
        return;
    };
    if last.name != "openapi" {
        return;
    }
    let Some((path_spec, file)) = external_reference(last.content.trim()) else {
        return;
    };
    elements.pop();

    let Some((document, _, _)) = load_external(&path_spec, &file, Path::new(filename)) else {
        tracing::warn!("failed to load external OpenAPI file: {file}");
        return;
    };
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return;
    };
    for (path, item) in paths {
        if !item.is_object() {
            continue;
        }
        for method in &HTTP_METHODS[..7] {
            let Some(operation) = truthy(item, method) else {
                continue;
            };
            let spec = json!({
                "openapi": document.get("openapi").cloned().unwrap_or_else(|| json!("3.0.0")),
                "info": document.get("info").cloned().unwrap_or_else(|| json!({"title": "API", "version": "1.0.0"})),
                "paths": { path.as_str(): { *method: operation } },
                "components": document.get("components").cloned().unwrap_or_else(|| json!({})),
            });
            match serde_yaml::to_string(&spec) {
                Ok(yaml) => elements.push(Element::new("openapi", &yaml, &format!("@openapi\n{yaml}"))),
                Err(e) => tracing::warn!("could not serialize OpenAPI operation {method} {path}: {e}"),
            }
        }
    }
}

// -- @openapi-path, @openapi-schema, @openapi-operation -----------------------

/// First line names the path (or contains a word starting with `/`); the
/// remaining lines hold its operations.
fn parse_path(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let content = content.trim();
    let (first_line, rest) = content.split_once('\n').unwrap_or((content, ""));
    let first_line = first_line.trim();
    if first_line.is_empty() {
        return Ok(None);
    }
    let path = if first_line.starts_with('/') {
        first_line
    } else {
        match first_line.split_whitespace().find(|w| w.starts_with('/')) {
            Some(word) => word,
            None => return Ok(None),
        }
    };
    let operations = load_or_empty(rest.trim(), path);
    let Some((method, operation)) = first_operation(&operations, &HTTP_METHODS) else {
        return Ok(None);
    };

    let mut result = Map::new();
    result.insert("type".into(), json!(method));
    result.insert("url".into(), json!(to_route(path)));
    result.insert("title".into(), json!(operation_title(operation, method, path)));
    result.insert(
        "name".into(),
        json!(text(operation, "operationId").map_or_else(|| operation_name(method, path), str::to_string)),
    );
    result.insert("description".into(), json!(text(operation, "description").unwrap_or("")));
    result.insert(
        "version".into(),
        json!(operation_version(operation).unwrap_or_else(|| DEFAULT_VERSION.to_string())),
    );
    result.insert("openapi".into(), json!({ "paths": { path: &operations } }));
    if let Some(group) = operation_group(operation) {
        result.insert("group".into(), json!(group));
    }
    Ok(Some(Value::Object(result)))
}

/// `@openapi-schema [schema|component|model] Name` followed by the schema.
fn parse_schema(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }
    let (first_line, rest) = content.split_once('\n').unwrap_or((content, ""));
    let name = RE_SCHEMA_PREFIX.replace(first_line.trim(), "").into_owned();
    if name.is_empty() {
        return Ok(None);
    }
    let schema = load_or_empty(rest.trim(), &name);

    let mut description = text(&schema, "description")
        .map_or_else(|| format!("OpenAPI schema definition for {name}"), str::to_string);
    if let Some(kind) = truthy(&schema, "type") {
        let kind = kind.as_str().map_or_else(|| kind.to_string(), str::to_string);
        description = format!("{description} (Type: {kind})").trim().to_string();
    }
    let version = text(&schema, "x-version")
        .or_else(|| text(&schema, "version"))
        .or_else(|| text(&schema, "apiVersion"))
        .unwrap_or(DEFAULT_VERSION)
        .to_string();

    Ok(Some(json!({
        "type": "openapi-schema",
        "name": underscore_whitespace(&name),
        "title": text(&schema, "title").map_or_else(|| format!("Schema: {name}"), str::to_string),
        "group": "Schemas",
        "description": description,
        "version": version,
        "openapi": { "components": { "schemas": { name.as_str(): &schema } } },
    })))
}

fn parse_operation(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }
    let operation = match load_document(content) {
        Ok(operation) if operation.is_object() => operation,
        Ok(_) => return Ok(None),
        Err(e) => {
            tracing::warn!("failed to parse @openapi-operation content: {e}");
            return Ok(None);
        }
    };
    let name = text(&operation, "operationId")
        .or_else(|| text(&operation, "summary"))
        .unwrap_or("Operation")
        .to_string();
    Ok(Some(json!({
        "type": "openapi-operation",
        "name": underscore_whitespace(&name),
        "title": text(&operation, "summary").unwrap_or(&name),
        "description": text(&operation, "description").unwrap_or(""),
        "version": operation_version(&operation).unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        "openapi": &operation,
        "group": operation_group(&operation).unwrap_or_else(|| "Operations".to_string()),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(f: crate::parsers::ParseFn, content: &str) -> Option<Value> {
        f(content, "", &mut ParseContext::new()).unwrap()
    }

    const USERS: &str = "\
/users/{id}:
  get:
    summary: Get user by ID
    tags: [User Admin, v1.2.0]
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: integer
      - name: expand
        in: query
        schema:
          type: string
          example: roles
    responses:
      200:
        description: User details
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/User'
      404:
        description: Not found
components:
  schemas:
    User:
      type: object
      required: [id]
      properties:
        id:
          type: integer
          description: User ID
        role:
          type: string
          enum: [admin, user]
";

    #[test]
    fn bare_paths_document_becomes_endpoint() {
        let v = run(parse_openapi, USERS).unwrap();
        assert_eq!(v["type"], "get");
        assert_eq!(v["url"], "/users/:id");
        assert_eq!(v["title"], "Get user by ID");
        assert_eq!(v["name"], "getUsersId");
        assert_eq!(v["version"], "1.2.0");
        assert_eq!(v["group"], "User_Admin");
        assert_eq!(
            v["parameter"],
            json!([
                {"group": "Parameter", "type": "Number", "optional": false, "field": "id", "description": ""},
                {"group": "Parameter", "type": "String", "optional": true, "field": "expand", "description": "", "defaultValue": "roles"}
            ])
        );
        assert_eq!(
            v["success"]["fields"]["Success 200"],
            json!([
                {"group": "Success", "type": "Number", "optional": false, "field": "id", "description": "User ID"},
                {"group": "Success", "type": "String", "optional": true, "field": "role", "description": "", "allowedValues": ["admin", "user"]}
            ])
        );
        assert_eq!(
            v["error"]["fields"]["Error 4xx"],
            json!([{"group": "Error", "type": "Object", "field": "404", "description": "Not found", "optional": false}])
        );
    }

    #[test]
    fn json_operation_and_info_documents() {
        let v = run(parse_openapi, r#"{"operationId": "ping", "responses": {}}"#).unwrap();
        assert_eq!(v["type"], "openapi-operation");
        assert_eq!(v["group"], "OpenAPI");
        assert_eq!(v["title"], "ping");

        let v = run(parse_openapi, "info:\n  title: Shop\n  version: 2.1.0").unwrap();
        assert_eq!(v["type"], "openapi-doc");
        assert_eq!(v["name"], "APIInfo");
        assert_eq!(v["group"], "API_Information");
        assert_eq!(v["version"], "2.1.0");

        assert!(run(parse_openapi, "just words").is_none());
    }

    #[test]
    fn route_and_name_helpers() {
        assert_eq!(to_route("/a/{b}/c/{d}"), "/a/:b/c/:d");
        assert_eq!(operation_name("POST", "/user-groups/{groupId}"), "postUser-groupsGroupid");
    }

    #[test]
    fn path_tag() {
        let v = run(parse_path, "GET /orders/{id}\nget:\n  operationId: getOrder\n  x-group: Order History").unwrap();
        assert_eq!(v["type"], "get");
        assert_eq!(v["url"], "/orders/:id");
        assert_eq!(v["name"], "getOrder");
        assert_eq!(v["title"], "getOrder");
        assert_eq!(v["group"], "Order_History");
        assert_eq!(v["version"], DEFAULT_VERSION);
        assert!(run(parse_path, "/orders").is_none());
    }

    #[test]
    fn schema_tag() {
        let v = run(parse_schema, "schema User Account\ntype: object\ndescription: A user").unwrap();
        assert_eq!(v["name"], "User_Account");
        assert_eq!(v["title"], "Schema: User Account");
        assert_eq!(v["description"], "A user (Type: object)");
        assert_eq!(v["openapi"]["components"]["schemas"]["User Account"]["type"], "object");
    }

    #[test]
    fn operation_tag() {
        let v = run(parse_operation, "summary: List pets\ntags: [Pets]").unwrap();
        assert_eq!(v["name"], "List_pets");
        assert_eq!(v["title"], "List pets");
        assert_eq!(v["group"], "Pets");
    }

    #[test]
    fn external_file_expands_per_operation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("spec.yaml"),
            "openapi: 3.0.0\npaths:\n  /pets:\n    get:\n      summary: List\n    post:\n      summary: Create\n  /owners:\n    get:\n      summary: Owners\n",
        )
        .unwrap();
        let filename = dir.path().join("api.js");

        let mut elements = vec![Element::new("openapi", "/pets {openapi=spec.yaml}", "@openapi /pets {openapi=spec.yaml}")];
        expand_external(&mut elements, "", filename.to_str().unwrap());
        assert_eq!(elements.len(), 2);

        let mut ctx = ParseContext::new();
        let titles: Vec<_> = elements
            .iter()
            .map(|e| parse_openapi(&e.content, &e.source, &mut ctx).unwrap().unwrap()["title"].clone())
            .collect();
        assert_eq!(titles, [json!("List"), json!("Create")]);
    }

    #[test]
    fn unexpanded_reference_keeps_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("spec.json"), r#"{"paths": {}}"#).unwrap();
        let mut ctx = ParseContext::new();
        ctx.start_file(dir.path().join("api.js"));
        let v = parse_openapi("{openapi=spec.json}", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["pathSpec"], "full-spec");
        assert_eq!(v["openapi"], json!({"paths": {}}));
    }
}
