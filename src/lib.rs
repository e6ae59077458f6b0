//! apidoc: extract API documentation from comment blocks in source files.
//!
//! The pipeline reads every matching file under the configured inputs,
//! splits it into documentation blocks and `@tag` elements, runs each
//! element through its tag parser, resolves cross-block references
//! (`@apiDefine`/`@apiUse`, group titles, permissions) and serializes the
//! resulting endpoint records to JSON.
//!
//! ```no_run
//! use apidoc::log::TracingLogger;
//! use apidoc::options::{Options, PackageInfos};
//!
//! let outcome = apidoc::parse(&Options::default(), &PackageInfos::default(), &TracingLogger);
//! if let apidoc::Outcome::Data { data, .. } = outcome {
//!     println!("{data}");
//! }
//! ```

pub mod category;
pub mod context;
pub mod error;
pub mod filter;
pub mod finder;
pub mod hooks;
pub mod languages;
pub mod log;
pub mod markdown;
pub mod model;
pub mod options;
pub mod parser;
pub mod parsers;
pub mod unindent;
pub mod version;
pub mod worker;

use crate::error::{Error, ParserError};
use crate::finder::{FileFinder, DOCUMENT_INCLUDE};
use crate::log::{Level, Logger};
use crate::markdown::CommonMark;
use crate::model::{is_falsy, Block, ParsedFile};
use crate::options::{Generator, LineEnding, Options, PackageInfos};
use crate::parser::Parser;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::path::Path;

/// Version of the output format.
pub const SPECIFICATION_VERSION: &str = "4.0.0";

/// Result of a [`parse`] run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Serialized endpoint records and project metadata.
    Data { data: String, project: String },
    /// No input file held documentation.
    Nothing,
    /// The run was aborted; the cause has been logged.
    Failed,
}

/// Run the whole pipeline. Errors are reported through `log`.
pub fn parse(options: &Options, package: &PackageInfos, log: &dyn Logger) -> Outcome {
    match run(options, package, log) {
        Ok(outcome) => outcome,
        Err(e) => {
            report(&e, log);
            Outcome::Failed
        }
    }
}

/// Parse one in-memory source as if read from `filename`.
pub fn parse_source(src: &str, filename: &Path, log: &dyn Logger) -> Result<Vec<Block>, ParserError> {
    let mut parser = Parser::new(log).markdown(Box::new(CommonMark));
    Ok(parser.parse_source(src, filename)?.unwrap_or_default())
}

fn run(options: &Options, package: &PackageInfos, log: &dyn Logger) -> Result<Outcome, Error> {
    let mut parser = Parser::new(log).api_private(options.api_private);
    if options.markdown {
        parser = parser.markdown(Box::new(CommonMark));
    }
    if let Some(filter_by) = options.filter_by.as_deref() {
        parser = parser.filter_by(filter_by);
    }
    let finder = FileFinder::new(&options.include_filters, &options.exclude_filters)?;

    log.verbose("run parser");
    let mut files: Vec<ParsedFile> = Vec::new();
    let mut filenames: Vec<String> = Vec::new();
    for src in &options.src {
        let category = src.category.as_deref();
        let finder = if category == Some("docs") {
            log.verbose("Added markdown file filters for 'docs' category");
            finder.including(DOCUMENT_INCLUDE)?
        } else {
            finder.clone()
        };
        parser.parse_files(&src.path, &finder, options.encoding, category, &mut files, &mut filenames)?;
    }

    let mut blocks = Vec::new();
    if !files.is_empty() {
        log.verbose("run worker");
        worker::process(&mut files, &filenames, package, log)?;

        log.verbose("run filter");
        blocks = filter::process(&mut files, log);
        sort_blocks(&mut blocks);

        if options.mqtt_only {
            blocks.retain(is_mqtt);
            log.verbose(&format!("MQTT-only mode: filtered to {} MQTT endpoints", blocks.len()));
        }
        if options.fail_on_mqtt_schema_error && !validate_mqtt_schemas(&blocks, log) {
            return Ok(Outcome::Failed);
        }
    }

    let has_documentation = package.has_documentation();
    if files.is_empty() && !has_documentation {
        return Ok(Outcome::Nothing);
    }
    if files.is_empty() {
        log.info("Generating documentation from markdown files only (no API endpoints)");
    }

    let mut project = package.clone();
    project.apidoc = Some(SPECIFICATION_VERSION.to_string());
    project.generator = Some(Generator::now());

    let data = serde_json::to_string_pretty(&blocks).map_err(|e| Error::Other(e.to_string()))?;
    let project = serde_json::to_string_pretty(&project).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Outcome::Data {
        data: with_line_ending(&data, options.line_ending),
        project: with_line_ending(&project, options.line_ending),
    })
}

fn text<'a>(block: &'a Map<String, Value>, key: &str) -> &'a str {
    block.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Group and name ascending, then version descending.
fn sort_blocks(blocks: &mut [Map<String, Value>]) {
    blocks.sort_by(|a, b| {
        let key_a = format!("{}{}", text(a, "group"), text(a, "name"));
        let key_b = format!("{}{}", text(b, "group"), text(b, "name"));
        key_a.cmp(&key_b).then_with(|| {
            let (va, vb) = (text(a, "version"), text(b, "version"));
            if va == vb {
                Ordering::Equal
            } else {
                version::compare(vb, va)
            }
        })
    });
}

fn is_mqtt(block: &Map<String, Value>) -> bool {
    let kind = text(block, "type");
    matches!(kind, "publish" | "subscribe")
        || block.get("topic").is_some_and(|t| !is_falsy(t))
        || block.contains_key("qos")
        || block.contains_key("retain")
        || (text(block, "url").is_empty() && kind == "inline")
}

/// Inline payload schemas of MQTT endpoints must be valid JSON.
fn validate_mqtt_schemas(blocks: &[Map<String, Value>], log: &dyn Logger) -> bool {
    let mqtt: Vec<_> = blocks
        .iter()
        .filter(|b| matches!(text(b, "type"), "publish" | "subscribe") || b.get("topic").is_some_and(|t| !is_falsy(t)))
        .collect();
    for block in &mqtt {
        let Some(schema) = block.get("payloadSchema") else {
            continue;
        };
        if schema.get("type").and_then(Value::as_str) != Some("inline") {
            continue;
        }
        let content = schema.get("content").and_then(Value::as_str).unwrap_or("");
        if let Err(e) = serde_json::from_str::<Value>(content) {
            log.error(&format!("Invalid MQTT payload schema in {}: {e}", text(block, "name")));
            return false;
        }
    }
    log.verbose(&format!("MQTT schema validation passed for {} endpoints", mqtt.len()));
    true
}

fn with_line_ending(json: &str, ending: LineEnding) -> String {
    match ending {
        LineEnding::Lf => json.to_string(),
        _ => json.replace('\n', ending.as_str()),
    }
}

/// Log `e` with its labelled context.
fn report(e: &Error, log: &dyn Logger) {
    match e {
        Error::File(e) => log.log(Level::Error, &e.message, &[("Path".to_string(), e.path.clone())]),
        Error::Parser(e) => log.log(Level::Error, &e.message, &e.meta()),
        Error::Worker(e) => log.log(Level::Error, &e.message, &e.meta()),
        Error::Other(message) => log.error(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RecordingLogger;
    use crate::options::SrcEntry;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn options_for(dir: &Path) -> Options {
        Options {
            src: vec![SrcEntry::new(dir)],
            line_ending: LineEnding::Lf,
            markdown: false,
            ..Options::default()
        }
    }

    #[test]
    fn sorts_by_group_name_then_newest_version() {
        let mut blocks = vec![
            record(json!({"group": "User", "name": "Get", "version": "1.0.0"})),
            record(json!({"group": "Admin", "name": "List", "version": "1.0.0"})),
            record(json!({"group": "User", "name": "Get", "version": "2.0.0"})),
        ];
        sort_blocks(&mut blocks);
        let order: Vec<_> = blocks.iter().map(|b| (text(b, "group"), text(b, "version"))).collect();
        assert_eq!(order, [("Admin", "1.0.0"), ("User", "2.0.0"), ("User", "1.0.0")]);
    }

    #[test]
    fn mqtt_markers() {
        assert!(is_mqtt(&record(json!({"type": "publish", "url": ""}))));
        assert!(is_mqtt(&record(json!({"type": "get", "url": "/a", "qos": 1}))));
        assert!(is_mqtt(&record(json!({"type": "inline", "url": ""}))));
        assert!(!is_mqtt(&record(json!({"type": "get", "url": "/users"}))));
    }

    #[test]
    fn invalid_inline_schema_fails_validation() {
        let log = RecordingLogger::new();
        let blocks = [record(json!({
            "type": "publish",
            "name": "Temp",
            "payloadSchema": {"type": "inline", "content": "{not json"},
        }))];
        assert!(!validate_mqtt_schemas(&blocks, &log));
        assert!(log.messages(Level::Error)[0].starts_with("Invalid MQTT payload schema in Temp: "));
    }

    #[test]
    fn crlf_output_endings() {
        assert_eq!(with_line_ending("[\n  1\n]", LineEnding::Crlf), "[\r\n  1\r\n]");
    }

    #[test]
    fn parse_produces_data_and_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("user.js"),
            "/**\n * @api {get} /user/:id Get User\n * @apiParam {Number} id User ID\n */\n",
        )
        .unwrap();
        let log = RecordingLogger::new();
        let Outcome::Data { data, project } = parse(&options_for(dir.path()), &PackageInfos::default(), &log) else {
            panic!("expected data");
        };
        let data: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(data[0]["url"], "/user/:id");
        assert_eq!(data[0]["filename"], "user.js");
        let project: Value = serde_json::from_str(&project).unwrap();
        assert_eq!(project["apidoc"], SPECIFICATION_VERSION);
        assert_eq!(project["generator"]["name"], "apidoc");
    }

    #[test]
    fn empty_tree_is_a_logged_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordingLogger::new();
        assert_eq!(parse(&options_for(dir.path()), &PackageInfos::default(), &log), Outcome::Failed);
        let records = log.records();
        assert_eq!(records[records.len() - 1].message, "No files found.");
        assert_eq!(records[records.len() - 1].meta[0].0, "Path");
    }

    #[test]
    fn sources_without_blocks_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.js"), "const a = 1;\n").unwrap();
        let log = RecordingLogger::new();
        assert_eq!(parse(&options_for(dir.path()), &PackageInfos::default(), &log), Outcome::Nothing);
    }

    #[test]
    fn parse_source_helper() {
        let log = RecordingLogger::new();
        let blocks = parse_source("/** @api {get} /a A */", Path::new("a.js"), &log).unwrap();
        assert_eq!(blocks[0].local["url"], "/a");
    }
}
