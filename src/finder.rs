//! Source file discovery under one input root.

use crate::error::{Error, FileError};
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Source extensions scanned when no include filter is configured.
pub const DEFAULT_INCLUDE: &str =
    r".*\.(clj|cls|coffee|cpp|cs|dart|erl|exs?|go|groovy|ino?|java|js|jsx|litcoffee|lua|p|php?|pl|pm|py|rb|scala|ts|vue)$";

/// Added to the include filters of `docs` inputs.
pub const DOCUMENT_INCLUDE: &str = r".*\.(md|markdown)$";

/// Include/exclude regex filters applied to every file below a root.
#[derive(Debug, Clone)]
pub struct FileFinder {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl FileFinder {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, Error> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Include [`DEFAULT_INCLUDE`] only.
    pub fn with_defaults() -> Self {
        Self {
            include: compile(&[DEFAULT_INCLUDE]).unwrap_or_default(),
            exclude: Vec::new(),
        }
    }

    /// Copy of this finder that also includes `pattern`.
    pub fn including(&self, pattern: &str) -> Result<Self, Error> {
        let mut finder = self.clone();
        finder.include.extend(compile(&[pattern])?);
        Ok(finder)
    }

    /// Files below `root` matching at least one include filter and no
    /// exclude filter, relative to `root` with `/` separators, in
    /// file name order.
    pub fn search(&self, root: &Path) -> Result<Vec<String>, FileError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| FileError::new(e.to_string(), root.display().to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let full = entry.path().to_string_lossy().replace('\\', "/");
            if !self.include.iter().any(|re| re.is_match(&full)) {
                continue;
            }
            if self.exclude.iter().any(|re| re.is_match(&full)) {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }

        if files.is_empty() {
            return Err(FileError::new("No files found.", root.display().to_string()));
        }
        Ok(files)
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, Error> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref()).map_err(|e| Error::Other(format!("Invalid file filter '{}': {e}", p.as_ref())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/vendor")).unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("lib/user.ts"), "").unwrap();
        fs::write(dir.path().join("lib/vendor/x.js"), "").unwrap();
        dir
    }

    #[test]
    fn default_filters_keep_sources() {
        let dir = tree();
        let files = FileFinder::with_defaults().search(dir.path()).unwrap();
        assert_eq!(files, ["a.py", "b.js", "lib/user.ts", "lib/vendor/x.js"]);
    }

    #[test]
    fn exclude_wins_over_include() {
        let dir = tree();
        let finder = FileFinder::new(&[DEFAULT_INCLUDE], &["vendor/"]).unwrap();
        assert_eq!(finder.search(dir.path()).unwrap(), ["a.py", "b.js", "lib/user.ts"]);
    }

    #[test]
    fn no_match_is_a_file_error() {
        let dir = tree();
        let finder = FileFinder::new(&[r"\.rb$"], &[]).unwrap();
        let err = finder.search(dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "No files found.");
        assert_eq!(err.path, dir.path().display().to_string());
    }

    #[test]
    fn empty_include_list_keeps_nothing() {
        let dir = tree();
        let finder = FileFinder::new::<&str>(&[], &[]).unwrap();
        assert!(finder.search(dir.path()).is_err());
    }

    #[test]
    fn documents_can_be_added() {
        let dir = tree();
        fs::write(dir.path().join("guide.md"), "# Guide").unwrap();
        let finder = FileFinder::with_defaults().including(DOCUMENT_INCLUDE).unwrap();
        assert!(finder.search(dir.path()).unwrap().contains(&"guide.md".to_string()));
    }

    #[test]
    fn invalid_filter_is_rejected() {
        assert!(FileFinder::new(&["("], &[]).is_err());
    }
}
