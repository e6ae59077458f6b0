//! Error taxonomy of the extraction pipeline.

use thiserror::Error;

/// Labelled diagnostic pairs such as `("Groupname", "User")`.
pub type Extra = Vec<(String, String)>;

/// Path-level problem: unreadable file, no files under a source root.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FileError {
    pub message: String,
    pub path: String,
}

impl FileError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Malformed tag content, raised by a single tag parser.
///
/// Carries no file or block context; the dispatcher adds it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParameterError {
    pub message: String,
    pub element: String,
    pub definition: String,
    pub example: String,
}

impl ParameterError {
    pub fn new(
        message: impl Into<String>,
        element: impl Into<String>,
        definition: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            element: element.into(),
            definition: definition.into(),
            example: example.into(),
        }
    }
}

/// Failure of a tag parser call.
#[derive(Debug, Error)]
pub enum TagError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Other(String),
}

/// Failure while dispatching one element of one block.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParserError {
    pub message: String,
    pub file: String,
    pub block: usize,
    pub element: String,
    /// Raw element text (`source` is reserved by thiserror).
    pub element_source: String,
    pub extra: Extra,
}

impl ParserError {
    pub fn new(message: impl Into<String>, file: &str, block: usize, element: &str, source: &str) -> Self {
        Self {
            message: message.into(),
            file: file.to_string(),
            block,
            element: element.to_string(),
            element_source: source.to_string(),
            extra: Vec::new(),
        }
    }

    /// Labelled context in reporting order: File, Block, Element, Source, extras.
    pub fn meta(&self) -> Extra {
        let mut meta = Vec::new();
        if !self.file.is_empty() {
            meta.push(("File".to_string(), self.file.clone()));
        }
        if self.block > 0 {
            meta.push(("Block".to_string(), self.block.to_string()));
        }
        if !self.element.is_empty() {
            meta.push(("Element".to_string(), format!("@{}", self.element)));
        }
        if !self.element_source.is_empty() {
            meta.push(("Source".to_string(), self.element_source.clone()));
        }
        meta.extend(self.extra.iter().cloned());
        meta
    }
}

/// Cross-block reference resolution failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct WorkerError {
    pub message: String,
    pub file: String,
    pub block: usize,
    pub element: String,
    pub definition: String,
    pub example: String,
    pub extra: Extra,
}

impl WorkerError {
    /// Labelled context in reporting order: File, Block, Element, extras,
    /// Definition, Example.
    pub fn meta(&self) -> Extra {
        let mut meta = vec![
            ("File".to_string(), self.file.clone()),
            ("Block".to_string(), self.block.to_string()),
            ("Element".to_string(), format!("@{}", self.element)),
        ];
        meta.extend(self.extra.iter().cloned());
        if !self.definition.is_empty() {
            meta.push(("Definition".to_string(), self.definition.clone()));
        }
        if !self.example.is_empty() {
            meta.push(("Example".to_string(), self.example.clone()));
        }
        meta
    }
}

/// Anything that aborts a whole `parse` run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_error_meta_order() {
        let mut err = ParserError::new("Version format not valid.", "src/a.js", 2, "apiVersion", "@apiVersion 1.2");
        err.extra.push(("Definition".into(), "@apiVersion major.minor.patch".into()));
        let keys: Vec<_> = err.meta().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["File", "Block", "Element", "Source", "Definition"]);
        assert_eq!(err.meta()[2].1, "@apiVersion");
    }

    #[test]
    fn worker_error_meta_order() {
        let err = WorkerError {
            message: "m".into(),
            file: "a.js".into(),
            block: 1,
            element: "apiUse".into(),
            definition: "@apiUse group".into(),
            example: "ex".into(),
            extra: vec![("Groupname".into(), "User".into())],
        };
        let keys: Vec<_> = err.meta().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["File", "Block", "Element", "Groupname", "Definition", "Example"]);
    }
}
