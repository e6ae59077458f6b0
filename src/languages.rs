//! Per-extension comment syntax descriptors used by the block finder.
//!
//! Source text reaches these regexes with every `\n` replaced by
//! [`SENTINEL`], so `.` spans lines. The doc-block regex captures the
//! comment interior in group 2 or, failing that, group 1. The inline regex
//! strips comment leaders once real newlines are back.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Private-use stand-in for `\n` while block regexes run.
pub const SENTINEL: char = '\u{FFFF}';

#[derive(Debug, Clone)]
pub struct Language {
    pub doc_blocks: Regex,
    pub inline: Regex,
}

impl Language {
    pub fn new(doc_blocks: &str, inline: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            doc_blocks: Regex::new(doc_blocks)?,
            inline: Regex::new(inline)?,
        })
    }
}

// -- Built-in descriptors ------------------------------------------------------

static DEFAULT: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r"/\*\*\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?\*/", r"(?m)^(\s*)?(\*)[ ]?").unwrap()
});

static PYTHON: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r#"("""|''')\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?(?:"""|''')"#, r"(?m)^(\t*)?").unwrap()
});

static RUBY: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r"=begin\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?=end", r"(?m)^(\t*)?").unwrap()
});

static COFFEE: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r"###\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?###", r"(?m)^(\t*)?").unwrap()
});

static ERLANG: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r"%\{\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?%\}", r"(?m)^(\s*)?(%)[ ]?").unwrap()
});

static PERL: LazyLock<Language> = LazyLock::new(|| {
    Language::new(
        r"#\*\*\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?#\*|=pod\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?=cut",
        r"(?m)^(\s+)?(#)[ ]?",
    )
    .unwrap()
});

static LUA: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r"--\[\[\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?\]\]", r"(?m)^(\t*)?").unwrap()
});

static CLOJURE: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r";;;;\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?;;;;", r"(?m)^(\s*)?(;+)[ ]?").unwrap()
});

static ELIXIR: LazyLock<Language> = LazyLock::new(|| {
    Language::new(r#"@\w*doc\s*"""\x{FFFF}?(.+?)\x{FFFF}?(?:\s*)?""""#, r"(?m)^(\t*)?").unwrap()
});

/// Descriptor registry keyed by lowercased extension with its dot (`.py`).
#[derive(Debug, Clone)]
pub struct Languages {
    by_extension: HashMap<String, Language>,
    default: Language,
}

impl Default for Languages {
    fn default() -> Self {
        let mut langs = Self {
            by_extension: HashMap::new(),
            default: DEFAULT.clone(),
        };
        langs.add(".py", PYTHON.clone());
        langs.add(".rb", RUBY.clone());
        langs.add(".coffee", COFFEE.clone());
        langs.add(".litcoffee", COFFEE.clone());
        langs.add(".erl", ERLANG.clone());
        langs.add(".pm", PERL.clone());
        langs.add(".pl", PERL.clone());
        langs.add(".lua", LUA.clone());
        langs.add(".clj", CLOJURE.clone());
        langs.add(".ex", ELIXIR.clone());
        langs.add(".exs", ELIXIR.clone());
        langs
    }
}

impl Languages {
    /// Register or replace the descriptor for an extension. `default` replaces
    /// the fallback.
    pub fn add(&mut self, extension: &str, language: Language) {
        if extension == "default" {
            self.default = language;
        } else {
            self.by_extension.insert(extension.to_lowercase(), language);
        }
    }

    pub fn for_extension(&self, extension: &str) -> &Language {
        self.by_extension
            .get(&extension.to_lowercase())
            .unwrap_or(&self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_falls_back_to_default() {
        let langs = Languages::default();
        assert_eq!(langs.for_extension(".js").doc_blocks.as_str(), DEFAULT.doc_blocks.as_str());
        assert_eq!(langs.for_extension(".PY").doc_blocks.as_str(), PYTHON.doc_blocks.as_str());
    }

    #[test]
    fn custom_language_overrides() {
        let mut langs = Languages::default();
        langs.add(".sh", Language::new(r"#\*\*(.+?)#\*", r"(?m)^#").unwrap());
        assert!(langs.for_extension(".sh").doc_blocks.is_match("#** x #*"));
    }
}
