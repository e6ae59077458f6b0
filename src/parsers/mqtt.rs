//! MQTT operation tags.
//!
//! ```text
//! @mqtt publish Temperature reading
//! @topic sensors/{deviceId}/temperature
//! @topicParam {String} deviceId Device identifier
//! @qos 1
//! @retain false
//! @payload application/json Reading
//! @payloadSchema inline
//! {"type": "object"}
//! ```

use super::{non_empty, underscore_whitespace, Descriptor, Registry, TagPath};
use crate::context::ParseContext;
use crate::error::{ParameterError, TagError};
use crate::model::Method;
use crate::unindent::unindent;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

// -- Regex patterns -----------------------------------------------------------

static RE_OPERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(publish|subscribe)(?:\s+(.+?))?$").unwrap());

static RE_TOPIC_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)^\s*(?:\(\s*(.+?)\s*\)\s*)?",
        r"\s*(?:\{\s*([a-zA-Z0-9()#:./\\\[\]_|-]+)\s*(?:\{\s*(.+?)\s*\}\s*)?\s*\}\s*)?",
        r"\s*([a-zA-Z0-9$:./_-]+)\s*",
        r"(.*)?$|@",
    ))
    .unwrap()
});

static RE_MIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([a-zA-Z0-9][a-zA-Z0-9!#$&\-\^_]*/[a-zA-Z0-9][a-zA-Z0-9!#$&\-\^_.]*",
        r"(?:\+[a-zA-Z0-9][a-zA-Z0-9!#$&\-\^_]*)?)",
        r"\s*(.*)?$",
    ))
    .unwrap()
});

static RE_AUTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(username|tls|apikey|oauth|none|certificate|token)\s*(.*)?$").unwrap());

static RE_RATELIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/([a-zA-Z]+)\s*(.*)?$").unwrap());

static RE_TAG_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

/// Keys whose presence marks an inline JSON Schema.
const SCHEMA_KEYWORDS: [&str; 7] = ["type", "properties", "items", "$ref", "anyOf", "oneOf", "allOf"];

pub fn register(registry: &mut Registry) {
    registry.register("mqtt", Descriptor::at(parse_operation, "local", Method::Insert));
    registry.register("topic", Descriptor::at(parse_topic, "local", Method::Insert));
    registry.register("responseTopic", Descriptor::at(parse_response_topic, "local", Method::Insert));
    registry.register(
        "topicParam",
        Descriptor::new(
            parse_topic_param,
            TagPath::Dynamic(|ctx| format!("local.topicParameter.fields.{}", ctx.topic_param_group)),
            Method::Push,
        ),
    );
    registry.register("qos", Descriptor::at(parse_qos, "local", Method::Insert));
    registry.register("retain", Descriptor::at(parse_retain, "local", Method::Insert));
    registry.register("payload", Descriptor::at(parse_payload, "local", Method::Insert));
    registry.register("payloadSchema", Descriptor::at(parse_payload_schema, "local.payloadSchema", Method::Insert));
    registry.register("auth", Descriptor::at(parse_auth, "local.auth", Method::Insert));
    registry.register("examplePublish", Descriptor::at(parse_example_publish, "local.examplePublish", Method::Push));
    registry.register(
        "exampleSubscribe",
        Descriptor::at(parse_example_subscribe, "local.exampleSubscribe", Method::Push),
    );
    registry.register(
        "responseExample",
        Descriptor::at(parse_response_example, "local.responseExample", Method::Push),
    );
    registry.register("errors", Descriptor::at(parse_errors, "local.errors", Method::Push));
    registry.register("tags", Descriptor::at(parse_tags, "local", Method::Insert));
    registry.register("ratelimit", Descriptor::at(parse_ratelimit, "local.ratelimit", Method::Insert));
    registry.register("mqttGroup", Descriptor::at(parse_group, "local", Method::Insert));
}

/// First line of the content, cut at a stray `@`.
fn first_line(content: &str) -> &str {
    content.split(['\n', '@']).next().unwrap_or("").trim()
}

fn parse_operation(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(caps) = RE_OPERATION.captures(first_line(content.trim())) else {
        return Ok(None);
    };
    Ok(Some(json!({
        "type": &caps[1],
        "title": caps.get(2).map_or("", |m| m.as_str()),
    })))
}

/// Reject broker-internal (`$SYS/...`) topics and NUL bytes.
fn check_topic(topic: &str, element: &str) -> Result<(), TagError> {
    let usage = format!("@{element} path/to/{{param}}/topic");
    let example = format!("@{element} sensors/{{deviceId}}/temperature");
    if topic.starts_with('$') && !topic.starts_with("$share/") {
        return Err(ParameterError::new(
            "Topics starting with '$' are reserved for the broker.",
            element,
            usage,
            example,
        )
        .into());
    }
    if topic.contains('\0') {
        return Err(ParameterError::new("Topic must not contain NUL characters.", element, usage, example).into());
    }
    Ok(())
}

fn parse_topic(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(topic) = non_empty(content) else {
        return Ok(None);
    };
    check_topic(topic, "topic")?;
    Ok(Some(json!({ "topic": topic })))
}

fn parse_response_topic(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(topic) = non_empty(content) else {
        return Ok(None);
    };
    check_topic(topic, "responseTopic")?;
    Ok(Some(json!({ "responseTopic": topic })))
}

/// `@topicParam (group) {type{size}} name description`. The group sticks
/// until the next explicit one.
fn parse_topic_param(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let Some(caps) = RE_TOPIC_PARAM.captures(content.trim()) else {
        return Ok(None);
    };
    if let Some(group) = caps.get(1) {
        ctx.topic_param_group = group.as_str().to_string();
    }
    if ctx.topic_param_group.is_empty() {
        ctx.topic_param_group = "Parameter".to_string();
    }
    let description = caps.get(5).map(|m| unindent(m.as_str())).unwrap_or_default();
    Ok(Some(object! {
        "group" => ctx.topic_param_group.as_str(),
        "type" => caps.get(2).map_or("String", |m| m.as_str()),
        "size" => caps.get(3).map(|m| m.as_str()),
        "name" => caps.get(4).map(|m| m.as_str()),
        "description" => description,
    }))
}

fn parse_qos(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let digits: String = content.trim().chars().take_while(char::is_ascii_digit).collect();
    match digits.parse::<u64>() {
        Ok(qos) if qos <= 2 => Ok(Some(json!({ "qos": qos }))),
        _ => Ok(None),
    }
}

fn parse_retain(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let retain = match first_line(content).to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => return Ok(None),
    };
    Ok(Some(json!({ "retain": retain })))
}

/// `@payload mime/type description`
fn parse_payload(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let Some(caps) = RE_MIME.captures(first_line(content)) else {
        return Ok(None);
    };
    Ok(Some(json!({
        "mimeType": &caps[1],
        "description": caps.get(2).map_or("", |m| m.as_str().trim()),
    })))
}

/// `@payloadSchema inline` + JSON, `@payloadSchema file path`, or bare JSON.
fn parse_payload_schema(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let (head, rest) = content.split_once('\n').unwrap_or((content, ""));
    let head = head.trim();

    if head == "inline" {
        let schema = rest.trim();
        if schema.is_empty() {
            return Ok(None);
        }
        return Ok(Some(inline_schema(schema)));
    }
    if let Some(path) = head.strip_prefix("file ") {
        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }
        let is_valid = !path.contains("..") && !path.starts_with('/');
        return Ok(Some(json!({
            "type": "file",
            "schema": path,
            "isValid": is_valid,
            "content": path,
        })));
    }
    Ok(Some(inline_schema(content)))
}

fn inline_schema(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(schema) => {
            let is_valid = schema
                .as_object()
                .is_some_and(|o| SCHEMA_KEYWORDS.iter().any(|k| o.get(*k).is_some_and(|v| !crate::model::is_falsy(v))));
            json!({ "type": "inline", "schema": schema, "isValid": is_valid, "content": text })
        }
        Err(_) => json!({ "type": "inline", "schema": text, "isValid": false, "content": text }),
    }
}

fn parse_auth(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let Some(caps) = RE_AUTH.captures(content) else {
        return Ok(None);
    };
    Ok(Some(json!({
        "type": &caps[1],
        "details": caps.get(2).map_or("", |m| m.as_str().trim()),
    })))
}

fn example(content: &str, kind: &str, title: &str) -> Value {
    json!({ "title": title, "content": unindent(content), "type": kind })
}

fn is_braced(text: &str, open: char, close: char) -> bool {
    text.starts_with(open) && text.ends_with(close)
}

fn parse_example_publish(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let (kind, title) = if content.contains("mosquitto_pub") {
        ("bash", "mosquitto_pub Command")
    } else if is_braced(content, '{', '}') {
        ("json", "Payload Example")
    } else if content.contains('$') || content.contains("#!/") {
        ("bash", "Command Example")
    } else {
        ("text", "Publish Example")
    };
    Ok(Some(example(content, kind, title)))
}

fn parse_example_subscribe(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let (kind, title) = if content.contains("mosquitto_sub") {
        ("bash", "mosquitto_sub Command")
    } else if is_braced(content, '{', '}') {
        ("json", "Expected Message")
    } else if content.contains('$') || content.contains("#!/") {
        ("bash", "Command Example")
    } else {
        ("text", "Subscribe Example")
    };
    Ok(Some(example(content, kind, title)))
}

fn parse_response_example(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let lower = content.to_lowercase();
    let (kind, title) = if is_braced(content, '{', '}') {
        ("json", "Response Example")
    } else if is_braced(content, '<', '>') {
        ("xml", "XML Response")
    } else if lower.contains("ack") || lower.contains("status") {
        ("text", "Acknowledgment Example")
    } else {
        ("text", "Response Example")
    };
    Ok(Some(example(content, kind, title)))
}

fn parse_errors(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|text| json!({ "description": unindent(text) })))
}

/// Comma or whitespace separated, lowercased, first occurrence kept.
fn parse_tags(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let mut tags: Vec<String> = Vec::new();
    for tag in RE_TAG_SEPARATOR.split(content).filter(|t| !t.is_empty()) {
        let tag = tag.to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        return Ok(None);
    }
    Ok(Some(json!({ "tags": tags })))
}

/// `@ratelimit 100/minute description`
fn parse_ratelimit(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let Some(caps) = RE_RATELIMIT.captures(content) else {
        return Ok(None);
    };
    let Ok(rate) = caps[1].parse::<u64>() else {
        return Ok(None);
    };
    Ok(Some(json!({
        "rate": rate,
        "unit": normalize_unit(&caps[2]),
        "description": caps.get(3).map_or("", |m| m.as_str().trim()),
    })))
}

fn normalize_unit(unit: &str) -> String {
    let unit = unit.to_lowercase();
    let normalized = match unit.as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => "second",
        "m" | "min" | "mins" | "minute" | "minutes" => "minute",
        "h" | "hr" | "hrs" | "hour" | "hours" => "hour",
        "d" | "day" | "days" => "day",
        _ => return unit,
    };
    normalized.to_string()
}

fn parse_group(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|g| json!({ "group": underscore_whitespace(g) })))
}
