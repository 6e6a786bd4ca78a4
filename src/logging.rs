//! Logging collaborator for the connection layer.
//!
//! The connection layer only needs `debug(message)` and `error(message, cause)`.
//! `TracingLogger` forwards those to `tracing`; `MemoryLogger` records them for tests.

use std::error::Error as StdError;
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::EnvFilter;

/// Logging contract consumed by the connection provider.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);

    fn error(&self, message: &str, cause: &(dyn StdError + 'static));
}

/// Forwards log calls to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn error(&self, message: &str, cause: &(dyn StdError + 'static)) {
        tracing::error!(error = %error_chain(cause), "{message}");
    }
}

/// Severity of a recorded entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Error,
}

/// A single entry captured by `MemoryLogger`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Rendered cause chain for error entries.
    pub cause: Option<String>,
}

/// In-memory logger for tests.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Returns recorded entries at the given level.
    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|entry| entry.level == level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        // A panic while holding the lock leaves the Vec intact.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.lock().push(LogEntry {
            level: LogLevel::Debug,
            message: message.to_string(),
            cause: None,
        });
    }

    fn error(&self, message: &str, cause: &(dyn StdError + 'static)) {
        self.lock().push(LogEntry {
            level: LogLevel::Error,
            message: message.to_string(),
            cause: Some(error_chain(cause)),
        });
    }
}

/// Renders an error and its sources as `outer: inner: root`.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}

/// Initializes logging to stderr.
///
/// Honours `RUST_LOG`, defaulting to `info`. Safe to call more than once;
/// later calls are ignored.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
