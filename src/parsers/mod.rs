//! Tag parser registry.
//!
//! Each `@tag` is handled by one [`TagParser`], looked up by its lowercased
//! name. The built-in parsers are plain [`Descriptor`] tables: a parse
//! function plus the storage contract the dispatcher applies to its result.

/// Build a JSON object, leaving out `None` values.
macro_rules! object {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut map = ::serde_json::Map::new();
        $(
            if let Some(v) = $crate::parsers::IntoField::into_field($value) {
                map.insert($key.to_string(), v);
            }
        )*
        ::serde_json::Value::Object(map)
    }};
}

pub mod api;
pub mod example;
pub mod iot;
pub mod jsdoc;
pub mod lang;
pub mod model;
pub mod mqtt;
pub mod openapi;
pub mod param;
pub mod schema;
pub mod typescript;

use crate::context::ParseContext;
use crate::error::TagError;
use crate::hooks::Hooks;
use crate::model::Method;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Converts the content of one element into structured data.
pub trait TagParser {
    /// `Ok(None)` means the content produced nothing; the dispatcher reports
    /// that as an empty result.
    fn parse(&self, content: &str, source: &str, ctx: &mut ParseContext) -> Result<Option<Value>, TagError>;

    /// Dotted destination (`local.parameter.fields.Parameter`). Read after
    /// `parse`, so it may depend on state the call just updated.
    fn path(&self, ctx: &ParseContext) -> Option<String>;

    fn method(&self) -> Method {
        Method::Push
    }

    fn prevent_global(&self) -> bool {
        false
    }

    /// Whether the value may join other global entries of the same block.
    fn allow_multiple(&self) -> bool {
        self.method() == Method::Push
    }

    fn extend_root(&self) -> bool {
        false
    }

    fn markdown_fields(&self) -> &[&str] {
        &[]
    }

    fn markdown_remove_p_tags(&self) -> &[&str] {
        &[]
    }

    fn deprecated(&self) -> bool {
        false
    }

    fn alternative(&self) -> Option<&str> {
        None
    }

    /// Register element-stream hooks. Called once when the registry is wired
    /// into a parser.
    fn init(&self, _hooks: &mut Hooks) {}
}

pub type ParseFn = fn(&str, &str, &mut ParseContext) -> Result<Option<Value>, TagError>;

#[derive(Clone, Copy)]
pub enum TagPath {
    Static(&'static str),
    Dynamic(fn(&ParseContext) -> String),
}

/// Table-driven [`TagParser`] used by every built-in tag.
#[derive(Clone)]
pub struct Descriptor {
    parse: ParseFn,
    path: TagPath,
    method: Method,
    prevent_global: bool,
    extend_root: bool,
    allow_multiple: Option<bool>,
    markdown_fields: &'static [&'static str],
    markdown_remove_p_tags: &'static [&'static str],
    deprecated: bool,
    alternative: Option<&'static str>,
    init: Option<fn(&mut Hooks)>,
}

impl Descriptor {
    pub fn new(parse: ParseFn, path: TagPath, method: Method) -> Self {
        Self {
            parse,
            path,
            method,
            prevent_global: false,
            extend_root: false,
            allow_multiple: None,
            markdown_fields: &[],
            markdown_remove_p_tags: &[],
            deprecated: false,
            alternative: None,
            init: None,
        }
    }

    /// Shorthand for a fixed path.
    pub fn at(parse: ParseFn, path: &'static str, method: Method) -> Self {
        Self::new(parse, TagPath::Static(path), method)
    }

    pub fn prevent_global(mut self) -> Self {
        self.prevent_global = true;
        self
    }

    pub fn extend_root(mut self) -> Self {
        self.extend_root = true;
        self
    }

    pub fn allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = Some(allow);
        self
    }

    pub fn markdown(mut self, fields: &'static [&'static str]) -> Self {
        self.markdown_fields = fields;
        self
    }

    pub fn remove_p_tags(mut self, fields: &'static [&'static str]) -> Self {
        self.markdown_remove_p_tags = fields;
        self
    }

    pub fn deprecated(mut self, alternative: Option<&'static str>) -> Self {
        self.deprecated = true;
        self.alternative = alternative;
        self
    }

    pub fn with_init(mut self, init: fn(&mut Hooks)) -> Self {
        self.init = Some(init);
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self.path {
            TagPath::Static(p) => p,
            TagPath::Dynamic(_) => "<dynamic>",
        };
        f.debug_struct("Descriptor")
            .field("path", &path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl TagParser for Descriptor {
    fn parse(&self, content: &str, source: &str, ctx: &mut ParseContext) -> Result<Option<Value>, TagError> {
        (self.parse)(content, source, ctx)
    }

    fn path(&self, ctx: &ParseContext) -> Option<String> {
        let path = match self.path {
            TagPath::Static(p) => p.to_string(),
            TagPath::Dynamic(f) => f(ctx),
        };
        (!path.is_empty()).then_some(path)
    }

    fn method(&self) -> Method {
        self.method
    }

    fn prevent_global(&self) -> bool {
        self.prevent_global
    }

    fn allow_multiple(&self) -> bool {
        self.allow_multiple.unwrap_or(self.method == Method::Push)
    }

    fn extend_root(&self) -> bool {
        self.extend_root
    }

    fn markdown_fields(&self) -> &[&str] {
        self.markdown_fields
    }

    fn markdown_remove_p_tags(&self) -> &[&str] {
        self.markdown_remove_p_tags
    }

    fn deprecated(&self) -> bool {
        self.deprecated
    }

    fn alternative(&self) -> Option<&str> {
        self.alternative
    }

    fn init(&self, hooks: &mut Hooks) {
        if let Some(init) = self.init {
            init(hooks);
        }
    }
}

/// Tag name to parser map. Names are stored lowercased.
#[derive(Default)]
pub struct Registry {
    parsers: HashMap<String, Box<dyn TagParser>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.parsers.keys().collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("parsers", &names).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in tag parser.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        api::register(&mut registry);
        param::register(&mut registry);
        example::register(&mut registry);
        schema::register(&mut registry);
        lang::register(&mut registry);
        mqtt::register(&mut registry);
        model::register(&mut registry);
        iot::register(&mut registry);
        openapi::register(&mut registry);
        jsdoc::register(&mut registry);
        registry
    }

    /// Add or replace the parser for `name`.
    pub fn register(&mut self, name: &str, parser: impl TagParser + 'static) {
        self.parsers.insert(name.to_lowercase(), Box::new(parser));
    }

    pub fn get(&self, name: &str) -> Option<&dyn TagParser> {
        self.parsers.get(name).map(|p| p.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Let every parser register its hooks.
    pub fn init_hooks(&self, hooks: &mut Hooks) {
        for parser in self.parsers.values() {
            parser.init(hooks);
        }
    }
}

// -- Shared helpers -----------------------------------------------------------

/// Trimmed content, or `None` when nothing is left.
pub(crate) fn non_empty(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Collapse whitespace runs to `_` (group and name tags).
pub(crate) fn underscore_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, "_").into_owned()
}

/// Conversion used by [`object!`]: `Option::None` drops the key.
pub trait IntoField {
    fn into_field(self) -> Option<Value>;
}

impl IntoField for Value {
    fn into_field(self) -> Option<Value> {
        Some(self)
    }
}

impl IntoField for String {
    fn into_field(self) -> Option<Value> {
        Some(Value::String(self))
    }
}

impl IntoField for &str {
    fn into_field(self) -> Option<Value> {
        Some(Value::String(self.to_string()))
    }
}

impl IntoField for bool {
    fn into_field(self) -> Option<Value> {
        Some(Value::Bool(self))
    }
}

impl IntoField for u64 {
    fn into_field(self) -> Option<Value> {
        Some(Value::from(self))
    }
}

impl IntoField for Vec<String> {
    fn into_field(self) -> Option<Value> {
        Some(Value::from(self))
    }
}

impl<T: IntoField> IntoField for Option<T> {
    fn into_field(self) -> Option<Value> {
        self.and_then(IntoField::into_field)
    }
}
