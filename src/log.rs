//! Logger interface consumed by the pipeline.

use std::cell::RefCell;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Verbose,
    Info,
    Warn,
    Error,
}

/// Sink for diagnostics. The pipeline never depends on what it does with them.
pub trait Logger {
    fn log(&self, level: Level, message: &str, meta: &[(String, String)]);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message, &[]);
    }

    fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message, &[]);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message, &[]);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message, &[]);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message, &[]);
    }
}

/// Forwards to `tracing`. `verbose` maps to `debug!`, `debug` to `trace!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

macro_rules! emit {
    ($mac:ident, $message:expr, $meta:expr) => {
        if $meta.is_empty() {
            tracing::$mac!("{}", $message)
        } else {
            tracing::$mac!(meta = %format_meta($meta), "{}", $message)
        }
    };
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, meta: &[(String, String)]) {
        match level {
            Level::Debug => emit!(trace, message, meta),
            Level::Verbose => emit!(debug, message, meta),
            Level::Info => emit!(info, message, meta),
            Level::Warn => emit!(warn, message, meta),
            Level::Error => emit!(error, message, meta),
        }
    }
}

/// Render labelled pairs one per line as `Label: value`.
pub fn format_meta(meta: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in meta {
        let _ = write!(out, "\n  {key}: {value}");
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub message: String,
    pub meta: Vec<(String, String)>,
}

/// Keeps every message in memory. Used by tests and tools that inspect warnings.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: RefCell<Vec<Record>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.borrow().clone()
    }

    /// Messages logged at exactly `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, message: &str, meta: &[(String, String)]) {
        self.records.borrow_mut().push(Record {
            level,
            message: message.to_string(),
            meta: meta.to_vec(),
        });
    }
}
