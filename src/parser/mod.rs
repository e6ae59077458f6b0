//! File-level orchestration: find files, decode them, split them into
//! blocks and elements, dispatch every element, run the sanity checks.

mod blocks;
mod dispatch;
mod elements;
mod sanity;

pub use blocks::find_blocks;
pub use elements::{find_elements, is_recognized};

use crate::context::ParseContext;
use crate::error::{Error, FileError, ParserError};
use crate::finder::FileFinder;
use crate::hooks::Hooks;
use crate::languages::{Language, Languages};
use crate::log::Logger;
use crate::markdown::MarkdownRenderer;
use crate::model::{Element, ParsedFile};
use crate::options::Encoding;
use crate::parsers::{Registry, TagParser};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions handled by the markdown document collaborator, never parsed here.
const DOCUMENT_EXTENSIONS: [&str; 2] = [".md", ".markdown"];

/// Extensions the TypeScript symbol extractor owns in the `tsdoc` category.
const TSDOC_EXTENSIONS: [&str; 2] = [".ts", ".tsx"];

/// `--filter-by tag=value`: keep blocks where a tag starting with `tag` has
/// exactly `value` as content.
#[derive(Debug, Clone)]
struct FilterBy {
    tag: String,
    value: Option<String>,
}

pub struct Parser<'a> {
    languages: Languages,
    registry: Registry,
    hooks: Hooks,
    markdown: Option<Box<dyn MarkdownRenderer>>,
    log: &'a dyn Logger,
    ctx: ParseContext,
    api_private: bool,
    filter_by: Option<FilterBy>,
}

impl<'a> Parser<'a> {
    /// Parser with the built-in languages and tag parsers.
    pub fn new(log: &'a dyn Logger) -> Self {
        Self::with_registry(Registry::with_defaults(), log)
    }

    pub fn with_registry(registry: Registry, log: &'a dyn Logger) -> Self {
        let mut hooks = Hooks::new();
        registry.init_hooks(&mut hooks);
        Self {
            languages: Languages::default(),
            registry,
            hooks,
            markdown: None,
            log,
            ctx: ParseContext::new(),
            api_private: false,
            filter_by: None,
        }
    }

    pub fn markdown(mut self, renderer: Box<dyn MarkdownRenderer>) -> Self {
        self.markdown = Some(renderer);
        self
    }

    /// Keep blocks marked `@apiPrivate`.
    pub fn api_private(mut self, enabled: bool) -> Self {
        self.api_private = enabled;
        self
    }

    /// `tag=value`. Ignored unless the tag part contains `api`.
    pub fn filter_by(mut self, expr: &str) -> Self {
        let mut parts = expr.split('=');
        let tag = parts.next().unwrap_or("");
        self.filter_by = tag.contains("api").then(|| FilterBy {
            tag: tag.to_lowercase(),
            value: parts.next().map(str::to_string),
        });
        self
    }

    pub fn add_language(&mut self, extension: &str, language: Language) {
        self.log.debug(&format!("inject parser language: {extension}"));
        self.languages.add(extension, language);
    }

    /// Add or replace a tag parser and register its hooks.
    pub fn add_parser(&mut self, name: &str, parser: impl TagParser + 'static) {
        self.log.debug(&format!("inject parser: {name}"));
        parser.init(&mut self.hooks);
        self.registry.register(name, parser);
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Parse every file `finder` yields under `src`. Filenames are reported
    /// relative to `src`.
    pub fn parse_files(
        &mut self,
        src: &Path,
        finder: &FileFinder,
        encoding: Encoding,
        category: Option<&str>,
        parsed_files: &mut Vec<ParsedFile>,
        parsed_filenames: &mut Vec<String>,
    ) -> Result<(), Error> {
        self.ctx.category = category.map(str::to_string);
        if let Some(category) = category {
            self.log.verbose(&format!("Parsing with category filter: {category}"));
        }

        for file in finder.search(src)? {
            let filename = src.join(&file);
            if let Some(parsed) = self.parse_file(&filename, encoding)? {
                self.log.verbose(&format!("parse file: {}", filename.display()));
                parsed_files.push(parsed);
                parsed_filenames.push(file);
            }
        }
        Ok(())
    }

    /// `None` when the file is skipped or holds no documentation blocks.
    pub fn parse_file(&mut self, filename: &Path, encoding: Encoding) -> Result<Option<ParsedFile>, Error> {
        self.log.debug(&format!("inspect file: {}", filename.display()));
        let extension = extension_of(filename);

        if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
            self.log.verbose(&format!(
                "Skipping parser for {extension} file (processed separately): {}",
                filename.display()
            ));
            return Ok(None);
        }
        if self.ctx.category.as_deref() == Some("tsdoc") && TSDOC_EXTENSIONS.contains(&extension.as_str()) {
            self.log.verbose(&format!(
                "Skipping parser for {extension} in tsdoc category (processed via TypeScript compiler): {}",
                filename.display()
            ));
            return Ok(None);
        }

        let bytes = fs::read(filename)
            .map_err(|e| FileError::new(format!("Cannot read file: {e}"), filename.display().to_string()))?;
        let src = encoding.decode(&bytes);
        Ok(self.parse_source(&src, filename)?)
    }

    /// Parse already decoded source text as if it came from `filename`.
    pub fn parse_source(&mut self, src: &str, filename: &Path) -> Result<Option<ParsedFile>, ParserError> {
        self.log.debug(&format!("size: {}", src.len()));
        let src = src.replace("\r\n", "\n");
        let display = filename.display().to_string();
        self.ctx.start_file(PathBuf::from(filename));

        let language = self.languages.for_extension(&extension_of(filename));
        let blocks = find_blocks(&src, language);
        if blocks.is_empty() {
            return Ok(None);
        }
        self.log.debug(&format!("count blocks: {}", blocks.len()));

        let elements: Vec<Vec<Element>> = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let elements = find_elements(block, &display, &self.hooks);
                self.log.debug(&format!("count elements in block {i}: {}", elements.len()));
                elements
            })
            .collect();

        let selected = self.select_blocks(&elements);
        if selected.is_empty() {
            return Ok(None);
        }

        let parsed = self.parse_block_elements(&selected, &elements, &display)?;
        if parsed.is_empty() {
            return Ok(None);
        }
        sanity::check(&parsed, self.log, &display);
        Ok(Some(parsed))
    }

    /// Indices of blocks that document something and are not ignored.
    fn select_blocks(&self, blocks: &[Vec<Element>]) -> Vec<usize> {
        let mut selected = Vec::new();
        'blocks: for (i, elements) in blocks.iter().enumerate() {
            let mut found = false;
            let mut matches_filter = false;
            let mut is_define = false;
            for element in elements {
                let name = element.name.as_str();
                if name.starts_with("apiignore") {
                    self.log.debug(&format!("apiIgnore found in block: {i}"));
                    continue 'blocks;
                }
                if !self.api_private && name.starts_with("apiprivate") {
                    self.log
                        .debug(&format!("private flag is set to false and apiPrivate found in block: {i}"));
                    continue 'blocks;
                }
                if let Some(filter) = &self.filter_by {
                    if name.starts_with("apidefine") {
                        is_define = true;
                    }
                    if name.starts_with(filter.tag.as_str()) && filter.value.as_deref() == Some(element.content.as_str()) {
                        matches_filter = true;
                    }
                }
                if documents_something(name) {
                    found = true;
                }
            }
            if self.filter_by.is_some() {
                found = found && (matches_filter || is_define);
            }
            if found {
                self.log.debug(&format!("api found in block: {i}"));
                selected.push(i);
            }
        }
        selected
    }
}

fn documents_something(name: &str) -> bool {
    ["api", "openapi", "mqtt", "model", "iot"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
        || elements::JSDOC_NAMES.contains(&name)
}

/// Lowercased extension with its dot, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}
