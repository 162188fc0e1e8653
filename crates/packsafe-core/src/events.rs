//! Append-only audit trail of security-relevant events.
//!
//! Components report through the [`SecurityEventLog`] trait and never see a
//! failure from it: a sink that cannot write must degrade to a `tracing`
//! warning rather than block the operation that produced the event.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

/// What kind of operation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An external program was started or refused.
    ProcessExecution,
    /// A file or directory was created, removed or inspected.
    FileAccess,
    /// An archive was validated or extracted.
    ArchiveExtraction,
    /// A path failed sanitization.
    PathValidation,
    /// A process exceeded its timeout.
    Timeout,
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine activity.
    Info,
    /// Allowed but unexpected.
    Warning,
    /// Blocked or failed.
    Error,
}

/// One audit record. Write-once; ordering is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEvent {
    /// Operation category.
    pub kind: EventKind,
    /// Severity.
    pub severity: Severity,
    /// Free-form description.
    pub message: String,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for an [`Severity::Info`] event.
    #[must_use]
    pub fn info(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    /// Shorthand for a [`Severity::Warning`] event.
    #[must_use]
    pub fn warning(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    /// Shorthand for a [`Severity::Error`] event.
    #[must_use]
    pub fn error(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    fn trace(&self) {
        match self.severity {
            Severity::Info => tracing::info!(kind = ?self.kind, "{}", self.message),
            Severity::Warning => tracing::warn!(kind = ?self.kind, "{}", self.message),
            Severity::Error => tracing::error!(kind = ?self.kind, "{}", self.message),
        }
    }
}

/// Fire-and-forget sink for [`SecurityEvent`]s.
pub trait SecurityEventLog: Send + Sync {
    /// Records an event. Must not panic and must not block on failure.
    fn log(&self, event: SecurityEvent);
}

/// Forwards events to `tracing` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl SecurityEventLog for TracingEventLog {
    fn log(&self, event: SecurityEvent) {
        event.trace();
    }
}

/// Keeps events in memory, for tests and in-process inspection.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the events of one kind.
    #[must_use]
    pub fn events_of(&self, kind: EventKind) -> Vec<SecurityEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}

impl SecurityEventLog for MemoryEventLog {
    fn log(&self, event: SecurityEvent) {
        event.trace();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Appends events as JSON lines to a process-wide file.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileEventLog {
    /// Opens (creating if needed) `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened. Later write failures
    /// are only reported through `tracing`.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecurityEventLog for FileEventLog {
    fn log(&self, event: SecurityEvent) {
        event.trace();
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize security event");
                return;
            }
        };
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append security event");
        }
    }
}
