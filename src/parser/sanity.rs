//! Cross-check of `:param` URL segments against documented `@apiParam` fields.
//!
//! Findings are warnings only.

use crate::log::Logger;
use crate::model::{is_falsy, Block};
use serde_json::Value;
use std::collections::HashMap;

pub fn check(blocks: &[Block], log: &dyn Logger, filename: &str) {
    let defines: HashMap<&str, &Block> = blocks
        .iter()
        .filter_map(|b| {
            let name = b.global.get("define")?.get("name")?.as_str()?;
            Some((name, b))
        })
        .collect();

    for block in blocks {
        let fields = param_fields(block);
        let inherited: Vec<&Value> = block
            .local
            .get("use")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|u| defines.get(u.get("name")?.as_str()?).copied())
            .flat_map(param_fields)
            .collect();

        let title = block.local.get("title").and_then(Value::as_str).unwrap_or("undefined");
        let url_params = block
            .local
            .get("url")
            .and_then(Value::as_str)
            .map(path_params)
            .unwrap_or_default();

        for param in &url_params {
            if !documents(&fields, param) && !documents(&inherited, param) {
                log.warn(&format!(
                    "URL contains a parameter ':{param}' that is not documented as @apiParam in @api '{title}' in file: '{filename}'"
                ));
            }
        }

        if block.global.contains_key("define") {
            continue;
        }
        for field in &fields {
            let optional = field.get("optional").is_some_and(|o| !is_falsy(o));
            let name = field.get("field").and_then(Value::as_str).unwrap_or("");
            if !optional && !url_params.iter().any(|p| p == name) {
                log.warn(&format!(
                    "@apiParam '{name}' was defined but does not appear in URL of @api '{title}' in file: '{filename}'"
                ));
            }
        }
    }
}

fn documents(fields: &[&Value], name: &str) -> bool {
    fields.iter().any(|f| f.get("field").and_then(Value::as_str) == Some(name))
}

/// Every `@apiParam` field of a block, across all groups.
fn param_fields(block: &Block) -> Vec<&Value> {
    block
        .local
        .get("parameter")
        .and_then(|p| p.get("fields"))
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|groups| groups.values())
        .filter_map(Value::as_array)
        .flatten()
        .collect()
}

/// Names of `/:name` path segments. Scheme, host, query and fragment are
/// ignored.
fn path_params(url: &str) -> Vec<String> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => path,
    };
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{Level, RecordingLogger};
    use crate::model::Method;
    use serde_json::json;

    fn endpoint(url: &str, params: &[(&str, bool)]) -> Block {
        let mut block = Block::default();
        block
            .attach("local", Method::Insert, json!({"type": "get", "url": url, "title": "Get User"}))
            .unwrap();
        for (field, optional) in params {
            block
                .attach(
                    "local.parameter.fields.Parameter",
                    Method::Push,
                    json!({"field": field, "optional": optional}),
                )
                .unwrap();
        }
        block
    }

    #[test]
    fn documented_url_param_is_quiet() {
        let log = RecordingLogger::new();
        check(&[endpoint("/user/:id", &[("id", false)])], &log, "a.js");
        assert!(log.messages(Level::Warn).is_empty());
    }

    #[test]
    fn required_param_missing_from_url() {
        let log = RecordingLogger::new();
        check(&[endpoint("/user", &[("id", false), ("q", true)])], &log, "a.js");
        assert_eq!(
            log.messages(Level::Warn),
            ["@apiParam 'id' was defined but does not appear in URL of @api 'Get User' in file: 'a.js'"]
        );
    }

    #[test]
    fn undocumented_url_param() {
        let log = RecordingLogger::new();
        check(&[endpoint("https://api.example.com/user/:id?x=1", &[])], &log, "a.js");
        assert_eq!(
            log.messages(Level::Warn),
            ["URL contains a parameter ':id' that is not documented as @apiParam in @api 'Get User' in file: 'a.js'"]
        );
    }

    #[test]
    fn untitled_block_prints_undefined() {
        let mut block = Block::default();
        block.attach("local", Method::Insert, json!({"type": "get", "url": "/user"})).unwrap();
        block
            .attach("local.parameter.fields.Parameter", Method::Push, json!({"field": "id", "optional": false}))
            .unwrap();
        let log = RecordingLogger::new();
        check(&[block], &log, "a.js");
        assert_eq!(
            log.messages(Level::Warn),
            ["@apiParam 'id' was defined but does not appear in URL of @api 'undefined' in file: 'a.js'"]
        );
    }

    #[test]
    fn params_from_used_define_count() {
        let mut define = Block::default();
        define.attach("global.define", Method::Insert, json!({"name": "UserId"})).unwrap();
        define
            .attach("local.parameter.fields.Parameter", Method::Push, json!({"field": "id", "optional": false}))
            .unwrap();
        let mut user = endpoint("/user/:id", &[]);
        user.attach("local.use", Method::Push, json!({"name": "UserId"})).unwrap();

        let log = RecordingLogger::new();
        check(&[define, user], &log, "a.js");
        assert!(log.messages(Level::Warn).is_empty());
    }
}
