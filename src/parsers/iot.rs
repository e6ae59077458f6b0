//! Embedded / IoT API tags for C and C++ sources.
//!
//! ```text
//! @iot {function} gpio_set_level Set the output level
//! @iotParam {gpio_num_t} gpio_num GPIO number
//! @iotParam {uint32_t} level 0 for low, 1 for high
//! @iotReturn {esp_err_t} ESP_OK on success
//! @iotError {ESP_ERR_INVALID_ARG} EINVAL Invalid GPIO number
//! @iotPlatform {ESP32, ESP32-S3} Requires IDF 5
//! ```

use super::param::split_allowed_values;
use super::{non_empty, underscore_whitespace, Descriptor, Registry, TagPath};
use crate::context::ParseContext;
use crate::error::TagError;
use crate::languages::SENTINEL;
use crate::model::Method;
use crate::unindent::unindent;
use regex::{Captures, Regex};
use serde_json::{json, Value};
use std::sync::LazyLock;

type Parsed = Result<Option<Value>, TagError>;

// -- Regex patterns -----------------------------------------------------------

static RE_IOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\{(function|macro|struct|enum|typedef|callback|isr|define|const|variable|class)\}",
        r"\s+([A-Za-z0-9_]+)(?:\s+(.+?))?$",
    ))
    .unwrap()
});

static RE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:\(\s*(.+?)\s*\)\s*)?",
        r"\s*(?:\{\s*([a-zA-Z0-9_*\[\]\s]+)",
        r"\s*(?:\{\s*(.+?)\s*\}\s*)?",
        r"\s*(?:=\s*(.+?))?",
        r"\s*\}\s*)?",
        r"(\[?\s*([a-zA-Z0-9_.\->]+(?:\[[a-zA-Z0-9_]*\])?)",
        r#"(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|(.*?)(?:\s|\]|$)))?"#,
        r"\s*\]?\s*)",
        r"(.*)?$|@",
    ))
    .unwrap()
});

static RE_RETURN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:\(\s*(.+?)\s*\)\s*)?",
        r"\s*(?:\{\s*([a-zA-Z0-9_*\[\]\s]+)\s*\}\s*)?",
        r"\s*([a-zA-Z0-9_.\->]*)\s*",
        r"(.*)?$|@",
    ))
    .unwrap()
});

static RE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:\(\s*(.+?)\s*\)\s*)?",
        r"\s*(?:\{\s*([a-zA-Z0-9_*\[\]\s-]+)\s*\}\s*)?",
        r"\s*([a-zA-Z0-9_]+)\s*",
        r"(.*)?$|@",
    ))
    .unwrap()
});

static RE_EXAMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\{([a-zA-Z0-9_+-]+)\}\s*)?(.+?)(?:\x{FFFF}(.*))?$").unwrap());

static RE_PLATFORMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{([^}]+)\}\s*(.*)$").unwrap());

pub fn register(registry: &mut Registry) {
    registry.register("iot", Descriptor::at(parse_iot, "local", Method::Insert));
    registry.register(
        "iotParam",
        Descriptor::new(parse_param, TagPath::Dynamic(|ctx| grouped("local.parameter.fields", ctx)), Method::Push)
            .markdown(&["description", "type"])
            .remove_p_tags(&["type"]),
    );
    registry.register(
        "iotReturn",
        Descriptor::new(parse_return, TagPath::Dynamic(|ctx| grouped("local.return.fields", ctx)), Method::Push)
            .markdown(&["description", "type"])
            .remove_p_tags(&["type"]),
    );
    registry.register(
        "iotError",
        Descriptor::new(parse_error, TagPath::Dynamic(|ctx| grouped("local.error.fields", ctx)), Method::Push)
            .markdown(&["description"]),
    );
    registry.register("iotExample", Descriptor::at(parse_example, "local.examples", Method::Push));
    registry.register("iotPlatform", Descriptor::at(parse_platform, "local", Method::Insert));
    registry.register("iotName", Descriptor::at(|c, _, _| Ok(keyed("name", c)), "local", Method::Insert));
    registry.register("iotGroup", Descriptor::at(parse_group, "local", Method::Insert));
    registry.register(
        "iotDescription",
        Descriptor::at(|c, _, _| Ok(keyed("description", c)), "local", Method::Insert),
    );
    registry.register("iotSince", Descriptor::at(|c, _, _| Ok(keyed("since", c)), "local", Method::Insert));
    registry.register("iotVersion", Descriptor::at(|c, _, _| Ok(keyed("version", c)), "local", Method::Insert));
    registry.register("iotDeprecated", Descriptor::at(parse_deprecated, "local", Method::Insert));
    registry.register(
        "iotSee",
        Descriptor::at(|c, _, _| Ok(keyed("reference", c)), "local.see", Method::Push),
    );
}

fn grouped(prefix: &str, ctx: &ParseContext) -> String {
    format!("{prefix}.{}", ctx.iot_group)
}

/// `{ key: trimmed content }`, or nothing for blank content.
fn keyed(key: &str, content: &str) -> Option<Value> {
    let value = non_empty(content)?;
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    Some(Value::Object(map))
}

fn sentinel_lines(content: &str) -> String {
    content.trim().replace('\n', &SENTINEL.to_string())
}

/// Capture `i` with line breaks restored, `None` when absent or empty.
fn restored(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i)
        .map(|m| m.as_str().replace(SENTINEL, "\n"))
        .filter(|s| !s.is_empty())
}

/// `@iot {kind} Name title`
fn parse_iot(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let first_line = content.trim().split(['\n', '@']).next().unwrap_or("").trim();
    let Some(caps) = RE_IOT.captures(first_line) else {
        return Ok(None);
    };
    Ok(Some(json!({
        "type": &caps[1],
        "name": &caps[2],
        "title": caps.get(3).map_or("", |m| m.as_str()),
    })))
}

/// `@iotParam (group) {type{size}=values} [field=default] description`
fn parse_param(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let content = sentinel_lines(content);
    let Some(caps) = RE_PARAM.captures(&content) else {
        return Ok(None);
    };
    ctx.iot_group = restored(&caps, 1).unwrap_or_else(|| "Parameter".to_string());

    let kind = restored(&caps, 2).map(|t| t.trim().to_string()).unwrap_or_default();
    let allowed_values = restored(&caps, 4).map(|v| split_allowed_values(&v));
    let optional = caps.get(5).is_some_and(|m| m.as_str().starts_with('['));
    let default_value = restored(&caps, 7).or_else(|| restored(&caps, 8)).or_else(|| restored(&caps, 9));
    let is_pointer = kind.contains('*');
    let is_array = kind.contains('[');

    Ok(Some(object! {
        "group" => ctx.iot_group.as_str(),
        "type" => kind,
        "size" => restored(&caps, 3),
        "allowedValues" => allowed_values,
        "optional" => optional,
        "field" => restored(&caps, 6),
        "isPointer" => is_pointer,
        "isArray" => is_array,
        "defaultValue" => default_value,
        "description" => unindent(&restored(&caps, 10).unwrap_or_default()),
    }))
}

/// `@iotReturn (group) {type} [field] description`
fn parse_return(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let content = sentinel_lines(content);
    let Some(caps) = RE_RETURN.captures(&content) else {
        return Ok(None);
    };
    ctx.iot_group = restored(&caps, 1).unwrap_or_else(|| "Return".to_string());
    let kind = restored(&caps, 2).map_or_else(|| "void".to_string(), |t| t.trim().to_string());
    Ok(Some(json!({
        "group": ctx.iot_group,
        "type": kind,
        "field": restored(&caps, 3).unwrap_or_default(),
        "isPointer": kind.contains('*'),
        "isArray": kind.contains('['),
        "description": unindent(&restored(&caps, 4).unwrap_or_default()),
    })))
}

/// `@iotError (group) {code} name description`
fn parse_error(content: &str, _source: &str, ctx: &mut ParseContext) -> Parsed {
    let content = sentinel_lines(content);
    let Some(caps) = RE_ERROR.captures(&content) else {
        return Ok(None);
    };
    ctx.iot_group = restored(&caps, 1).unwrap_or_else(|| "Error".to_string());
    Ok(Some(json!({
        "group": ctx.iot_group,
        "type": restored(&caps, 2).map(|t| t.trim().to_string()).unwrap_or_default(),
        "field": restored(&caps, 3).unwrap_or_default(),
        "description": unindent(&restored(&caps, 4).unwrap_or_default()),
    })))
}

/// `@iotExample {lang} title` followed by code. A lone line of code is
/// taken as the content.
fn parse_example(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let content = sentinel_lines(content);
    let Some(caps) = RE_EXAMPLE.captures(&content) else {
        return Ok(None);
    };
    let mut title = caps.get(2).map_or("", |m| m.as_str().trim()).to_string();
    let mut code = restored(&caps, 3).map(|c| c.trim().to_string()).unwrap_or_default();
    if code.is_empty() && title.contains(['=', ';', '(']) {
        code = std::mem::take(&mut title);
    }
    Ok(Some(json!({
        "type": caps.get(1).map_or("c", |m| m.as_str()),
        "title": title,
        "content": code,
    })))
}

/// `@iotPlatform {ESP32, STM32} description` or `@iotPlatform ESP32 description`.
fn parse_platform(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    let Some(content) = non_empty(content) else {
        return Ok(None);
    };
    let (platforms, description): (Vec<String>, String) = match RE_PLATFORMS.captures(content) {
        Some(caps) => (
            caps[1]
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            caps[2].trim().to_string(),
        ),
        None => {
            let mut words = content.split_whitespace();
            let first = words.next().map(str::to_string);
            (first.into_iter().collect(), words.collect::<Vec<_>>().join(" "))
        }
    };
    if platforms.is_empty() {
        return Ok(None);
    }
    Ok(Some(json!({ "platforms": platforms, "description": description })))
}

fn parse_group(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(non_empty(content).map(|g| json!({ "group": underscore_whitespace(g) })))
}

fn parse_deprecated(content: &str, _source: &str, _ctx: &mut ParseContext) -> Parsed {
    Ok(Some(json!({ "deprecated": true, "message": content.trim() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(f: crate::parsers::ParseFn, content: &str) -> Value {
        f(content, "", &mut ParseContext::new()).unwrap().unwrap()
    }

    #[test]
    fn iot_header() {
        assert_eq!(
            run(parse_iot, "{function} gpio_set_level Set the output level"),
            json!({"type": "function", "name": "gpio_set_level", "title": "Set the output level"})
        );
        assert!(parse_iot("{module} x", "", &mut ParseContext::new()).unwrap().is_none());
    }

    #[test]
    fn param_pointer_and_default() {
        let mut ctx = ParseContext::new();
        let v = parse_param("(Config) {uint32_t*} [timeout=100] Timeout in ms", "", &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(
            v,
            json!({
                "group": "Config",
                "type": "uint32_t*",
                "optional": true,
                "field": "timeout",
                "isPointer": true,
                "isArray": false,
                "defaultValue": "100",
                "description": "Timeout in ms"
            })
        );
        assert_eq!(ctx.iot_group, "Config");

        parse_param("{char[32]} name Device name", "", &mut ctx).unwrap();
        assert_eq!(ctx.iot_group, "Parameter");
    }

    #[test]
    fn param_allowed_values() {
        let v = run(parse_param, "{int=0,1} level Output level");
        assert_eq!(v["allowedValues"], json!(["0", "1"]));
        assert_eq!(v["field"], "level");
    }

    #[test]
    fn return_defaults_to_void() {
        let mut ctx = ParseContext::new();
        let v = parse_return("Nothing useful", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["type"], "void");
        assert_eq!(v["group"], "Return");
        let v = parse_return("{esp_err_t} ESP_OK on success", "", &mut ctx).unwrap().unwrap();
        assert_eq!(v["type"], "esp_err_t");
        assert_eq!(v["field"], "ESP_OK");
        assert_eq!(v["description"], "on success");
    }

    #[test]
    fn error_code() {
        let v = run(parse_error, "{ESP_ERR_INVALID_ARG} EINVAL Invalid GPIO number");
        assert_eq!(
            v,
            json!({"group": "Error", "type": "ESP_ERR_INVALID_ARG", "field": "EINVAL", "description": "Invalid GPIO number"})
        );
    }

    #[test]
    fn example_title_and_code() {
        let v = run(parse_example, "{cpp} Blink\ngpio_set_level(2, 1);\ndelay(500);");
        assert_eq!(
            v,
            json!({"type": "cpp", "title": "Blink", "content": "gpio_set_level(2, 1);\ndelay(500);"})
        );
        let v = run(parse_example, "gpio_set_level(2, 0);");
        assert_eq!(v, json!({"type": "c", "title": "", "content": "gpio_set_level(2, 0);"}));
    }

    #[test]
    fn platforms() {
        assert_eq!(
            run(parse_platform, "{ESP32, ESP32-S3,} Requires IDF 5"),
            json!({"platforms": ["ESP32", "ESP32-S3"], "description": "Requires IDF 5"})
        );
        assert_eq!(
            run(parse_platform, "STM32 with   HAL"),
            json!({"platforms": ["STM32"], "description": "with HAL"})
        );
    }

    #[test]
    fn simple_keys() {
        let registry = {
            let mut r = Registry::new();
            register(&mut r);
            r
        };
        let mut ctx = ParseContext::new();
        let see = registry.get("iotsee").unwrap();
        assert_eq!(see.parse(" gpio_get_level ", "", &mut ctx).unwrap().unwrap(), json!({"reference": "gpio_get_level"}));
        assert_eq!(see.path(&ctx).as_deref(), Some("local.see"));
        assert!(registry.get("iotsince").unwrap().parse("  ", "", &mut ctx).unwrap().is_none());
        assert_eq!(run(parse_group, "GPIO Driver"), json!({"group": "GPIO_Driver"}));
        assert_eq!(run(parse_deprecated, ""), json!({"deprecated": true, "message": ""}));
    }
}
