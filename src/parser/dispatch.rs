//! Block element parser: runs each element through its tag parser and
//! attaches the result to the block tree.

use super::Parser;
use crate::category::is_parser_enabled;
use crate::error::{ParserError, TagError};
use crate::markdown::render_field;
use crate::model::{get_path, is_falsy, set_path, Block, Element};
use crate::parsers::TagParser;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// `foo[bar]`: property access in the old square bracket notation.
static RE_SQUARE_BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\s:]\[[^\]]").unwrap());

impl Parser<'_> {
    /// Parse the `selected` blocks. Blocks where no element wrote data are
    /// dropped.
    pub(super) fn parse_block_elements(
        &mut self,
        selected: &[usize],
        blocks: &[Vec<Element>],
        filename: &str,
    ) -> Result<Vec<Block>, ParserError> {
        let mut parsed = Vec::new();
        for &block_index in selected {
            let mut block = Block::default();
            let mut allowed_multiple = 0;
            for element in &blocks[block_index] {
                self.parse_element(&mut block, &mut allowed_multiple, element, block_index, filename)?;
            }
            if block.index > 0 {
                parsed.push(block);
            }
        }
        Ok(parsed)
    }

    fn parse_element(
        &mut self,
        block: &mut Block,
        allowed_multiple: &mut usize,
        element: &Element,
        block_index: usize,
        filename: &str,
    ) -> Result<(), ParserError> {
        let position = block_index + 1;
        let fail = |message: &str| ParserError::new(message, filename, position, &element.source_name, &element.source);

        if let Some(category) = self.ctx.category.as_deref() {
            if !is_parser_enabled(category, &element.name) {
                self.log.debug(&format!(
                    "Skipping parser '{}' for category '{category}' in block: '{block_index}'",
                    element.name
                ));
                return Ok(());
            }
        }

        let Some(parser) = self.registry.get(&element.name) else {
            self.log.warn(&format!(
                "parser plugin '{}' not found in block: '{block_index}' in file: '{filename}'",
                element.name
            ));
            return Ok(());
        };

        if !element.source_name.ends_with("Example") && RE_SQUARE_BRACKETS.is_match(&element.source) {
            self.log.warn(&format!(
                "The use of square brackets for object properties is deprecated. Please use dot notation instead: \"{}\"",
                element.source
            ));
        }
        self.log.debug(&format!("found @{} in block: {block_index}", element.source_name));

        if parser.deprecated() {
            let message = match parser.alternative() {
                Some(alternative) => format!("@{} is deprecated, please use {alternative}", element.source_name),
                None => format!("@{} is deprecated", element.source_name),
            };
            if self.ctx.note_deprecated(&element.source_name) == 1 {
                self.log.warn(&message);
            } else {
                self.log.verbose(&message);
            }
            self.log.verbose(&format!("in file: {filename}, block: {block_index}"));
        }

        let mut value = match parser.parse(&element.content, &element.source, &mut self.ctx) {
            Ok(Some(value)) if !is_falsy(&value) => value,
            Ok(_) => return Err(fail("Empty parser result.")),
            Err(TagError::Parameter(e)) => {
                let mut err = fail(&e.message);
                if !e.definition.is_empty() {
                    err.extra.push(("Definition".to_string(), e.definition));
                }
                if !e.example.is_empty() {
                    err.extra.push(("Example".to_string(), e.example));
                }
                return Err(err);
            }
            Err(e) => return Err(fail(&format!("Undefined error: {e}"))),
        };

        // Read after `parse`: dynamic paths depend on what it just recorded.
        let Some(path) = parser.path(&self.ctx) else {
            return Err(fail("pathTo is not defined in the parser file."));
        };
        let method = parser.method();

        self.render_markdown(parser, &mut value);

        if parser.prevent_global() && block.global.len() > *allowed_multiple {
            return Err(fail("Only one definition or usage is allowed in the same block."));
        }
        // Every global write is counted, so a definition may still carry
        // `prevent_global` elements such as `@apiUse`.
        if path == "global" || path.starts_with("global.") {
            if !parser.allow_multiple() && !block.global.is_empty() {
                return Err(fail("Only one definition is allowed in the same block."));
            }
            *allowed_multiple += 1;
        }

        if parser.extend_root() {
            block.extend_root(&value);
        }
        if block.attach(&path, method, value).is_none() {
            return Err(fail(&format!("Cannot attach value at '{path}': the existing value has another shape.")));
        }
        block.index = position;
        Ok(())
    }

    fn render_markdown(&self, parser: &dyn TagParser, value: &mut Value) {
        let Some(renderer) = self.markdown.as_deref() else {
            return;
        };
        for field in parser.markdown_fields() {
            let Some(text) = get_path(value, field).and_then(Value::as_str).filter(|t| !t.is_empty()) else {
                continue;
            };
            let remove_p = parser.markdown_remove_p_tags().contains(field);
            let rendered = render_field(renderer, text, remove_p);
            set_path(value, field, Value::String(rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TagError;
    use crate::log::{Level, RecordingLogger};
    use crate::markdown::CommonMark;
    use crate::model::Method;
    use crate::parsers::Descriptor;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn parse(parser: &mut Parser<'_>, src: &str) -> Result<Vec<crate::model::Block>, crate::error::ParserError> {
        parser
            .parse_source(src, Path::new("api.js"))
            .map(Option::unwrap_or_default)
    }

    #[test]
    fn two_global_definitions_fail() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let err = parse(&mut parser, "/**\n * @apiDefine A\n * @apiDefine B\n */").unwrap_err();
        assert_eq!(err.to_string(), "Only one definition is allowed in the same block.");
        assert_eq!(err.block, 1);
        assert_eq!(err.element, "apiDefine");
    }

    #[test]
    fn definition_may_use_another_definition() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let src = "/**\n * @apiDefine A\n * @apiUse B\n */\n/**\n * @apiDefine B\n * @apiParam {String} token Token\n */";
        let blocks = parse(&mut parser, src).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].global["define"]["name"], "A");
        assert_eq!(blocks[0].local["use"], json!([{"name": "B"}]));
    }

    #[test]
    fn invalid_version_becomes_parser_error() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let src = "/** @api {get} /a A */\n/**\n * @api {get} /b B\n * @apiVersion 1.2\n */";
        let err = parse(&mut parser, src).unwrap_err();
        assert_eq!(err.to_string(), "Version format not valid.");
        assert_eq!(err.file, "api.js");
        assert_eq!(err.block, 2);
        assert_eq!(err.element_source, "@apiVersion 1.2");
        assert!(err.extra.iter().any(|(k, _)| k == "Example"));
    }

    #[test]
    fn unknown_tags_warn_and_continue() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let blocks = parse(&mut parser, "/**\n * @api {get} /a A\n * @apiFancy x\n */").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            log.messages(Level::Warn),
            ["parser plugin 'apifancy' not found in block: '0' in file: 'api.js'"]
        );
    }

    #[test]
    fn empty_result_is_an_error() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        parser.add_parser("apiNothing", Descriptor::at(|_, _, _| Ok(None), "local", Method::Insert));
        let err = parse(&mut parser, "/** @apiNothing */").unwrap_err();
        assert_eq!(err.to_string(), "Empty parser result.");
    }

    #[test]
    fn other_failures_are_wrapped() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        parser.add_parser(
            "apiBroken",
            Descriptor::at(|_, _, _| Err(TagError::Other("boom".into())), "local", Method::Insert),
        );
        let err = parse(&mut parser, "/** @apiBroken */").unwrap_err();
        assert_eq!(err.to_string(), "Undefined error: boom");
    }

    #[test]
    fn square_brackets_warn_but_parse() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let blocks = parse(&mut parser, "/**\n * @api {get} /a A\n * @apiParam {String} [user[name]] Name\n */").unwrap();
        assert!(blocks[0].local.contains_key("parameter"));
        assert!(log.messages(Level::Warn)[0].starts_with("The use of square brackets"));
    }

    #[test]
    fn deprecated_tag_warns_once() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let src = "/**\n * @api {get} /a A\n * @apiStructure S\n */\n/**\n * @api {get} /b B\n * @apiStructure S\n */";
        parse(&mut parser, src).unwrap();
        let deprecations: Vec<_> = log
            .records()
            .into_iter()
            .filter(|r| r.message.starts_with("@apiStructure is deprecated"))
            .map(|r| r.level)
            .collect();
        assert_eq!(deprecations, [Level::Warn, Level::Verbose]);
    }

    #[test]
    fn version_extends_block_root() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        let blocks = parse(&mut parser, "/**\n * @api {get} /a A\n * @apiVersion 1.2.3\n */").unwrap();
        assert_eq!(blocks[0].version(), Some("1.2.3"));
        assert_eq!(blocks[0].local["version"], "1.2.3");
    }

    #[test]
    fn category_disables_tags() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log);
        parser.ctx.category = Some("api".to_string());
        let blocks = parse(&mut parser, "/**\n * @api {get} /a A\n * @topic sensors/temp\n */").unwrap();
        assert!(!blocks[0].local.contains_key("topic"));
    }

    #[test]
    fn markdown_fields_are_rendered() {
        let log = RecordingLogger::new();
        let mut parser = Parser::new(&log).markdown(Box::new(CommonMark));
        let blocks = parse(&mut parser, "/**\n * @api {get} /user/:id A\n * @apiParam {Number} id The *user* id\n */").unwrap();
        assert_eq!(
            blocks[0].local["parameter"]["fields"]["Parameter"][0]["description"],
            json!("<p>The <em>user</em> id</p>")
        );
        assert_eq!(blocks[0].local["parameter"]["fields"]["Parameter"][0]["type"], json!("Number"));
    }
}
