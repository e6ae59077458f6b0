//! Sequencing state shared by consecutive tag parser calls.
//!
//! One `ParseContext` lives for one parse invocation. Parsers read and write
//! it in element order, which is why elements must be dispatched strictly
//! left to right.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ParseContext {
    /// Group of the last `@apiParam`-family element; drives its storage path.
    pub param_group: String,
    /// Object-typed fields seen so far, for `parentNode` lookup.
    pub parents: HashMap<String, Value>,
    /// Group of the last `@topicParam`.
    pub topic_param_group: String,
    /// Model named by the last `@apiModel` / `@model`.
    pub current_model: String,
    /// Group of the last `@iotParam`, `@iotReturn` or `@iotError`.
    pub iot_group: String,
    /// Deprecated tag usage counts, keyed by tag name as written.
    pub deprecated_counts: HashMap<String, usize>,
    /// Category of the source folder being parsed.
    pub category: Option<String>,
    /// File currently being parsed.
    pub filename: PathBuf,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one use of a deprecated tag and return the running total.
    pub fn note_deprecated(&mut self, source_name: &str) -> usize {
        let count = self.deprecated_counts.entry(source_name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Point the context at the next file. Groups and parents carry over.
    pub fn start_file(&mut self, filename: PathBuf) {
        self.filename = filename;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deprecated_counter_increments_per_tag() {
        let mut ctx = ParseContext::new();
        assert_eq!(ctx.note_deprecated("apiStructure"), 1);
        assert_eq!(ctx.note_deprecated("apiStructure"), 2);
        assert_eq!(ctx.note_deprecated("apiErrorStructure"), 1);
    }
}
