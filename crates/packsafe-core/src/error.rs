//! Error types for process execution, archive validation and extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors raised by [`SecureProcessRunner`](crate::process::SecureProcessRunner)
/// before or while running an external program.
///
/// Every precondition variant is raised before any process is spawned.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The executable path contains traversal, control characters or shell
    /// substitution sequences.
    #[error("unsafe executable path: {path}")]
    UnsafeExecutablePath {
        /// The rejected executable path.
        path: PathBuf,
    },

    /// The executable does not exist, is not a regular file, or lacks the
    /// executable permission bit.
    #[error("executable not found or not executable: {path}")]
    ExecutableNotFound {
        /// The executable path as requested.
        path: PathBuf,
    },

    /// An argument failed path-safety validation.
    #[error("unsafe argument at position {index}: {argument:?}")]
    UnsafeArgument {
        /// Zero-based index into the argument vector.
        index: usize,
        /// The rejected argument.
        argument: String,
    },

    /// The requested working directory is unsafe or not a directory.
    #[error("unsafe working directory: {path}")]
    UnsafeWorkingDirectory {
        /// The rejected directory.
        path: PathBuf,
    },

    /// Spawning the process failed after all preconditions passed.
    #[error("failed to launch {program}: {source}")]
    ProcessLaunchFailed {
        /// The program that failed to start.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while supervising a running process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutionError {
    /// Returns `true` if the error was raised before any process was spawned.
    ///
    /// # Examples
    ///
    /// ```
    /// use packsafe_core::ExecutionError;
    ///
    /// let err = ExecutionError::UnsafeArgument {
    ///     index: 0,
    ///     argument: "$(rm -rf ~)".to_string(),
    /// };
    /// assert!(err.is_precondition());
    /// ```
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UnsafeExecutablePath { .. }
                | Self::ExecutableNotFound { .. }
                | Self::UnsafeArgument { .. }
                | Self::UnsafeWorkingDirectory { .. }
        )
    }
}

/// Reason an archive failed validation.
///
/// Safety rejections and corruption are kept apart: see
/// [`is_security_violation`](Self::is_security_violation).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// The archive file does not exist or is not a regular file.
    #[error("archive not found: {path}")]
    ArchiveNotFound {
        /// The archive path.
        path: PathBuf,
    },

    /// The archive path itself failed path-safety validation.
    #[error("unsafe archive path: {path}")]
    UnsafeArchivePath {
        /// The archive path.
        path: PathBuf,
    },

    /// The on-disk (compressed) size already exceeds the total-size limit.
    #[error("archive too large: {size} bytes on disk (limit {max})")]
    ArchiveTooLarge {
        /// Compressed size in bytes.
        size: u64,
        /// Configured total-size limit.
        max: u64,
    },

    /// More members than the entry-count limit.
    #[error("too many entries: {count} (limit {max})")]
    TooManyEntries {
        /// Count at the moment the limit was crossed.
        count: usize,
        /// Configured entry-count limit.
        max: usize,
    },

    /// A single member is larger than the per-entry limit.
    #[error("entry too large: {name} is {size} bytes (limit {max})")]
    EntryTooLarge {
        /// Member name.
        name: String,
        /// Uncompressed member size.
        size: u64,
        /// Configured per-entry limit.
        max: u64,
    },

    /// A member name contains a parent-directory segment.
    #[error("path traversal in member name: {name}")]
    PathTraversal {
        /// Member name.
        name: String,
    },

    /// A member name starts with a root or drive prefix.
    #[error("absolute path in member name: {name}")]
    AbsolutePath {
        /// Member name.
        name: String,
    },

    /// Aggregate uncompressed size exceeds the total-size limit.
    #[error("total uncompressed size {total} bytes exceeds limit {max}")]
    TotalSizeExceeded {
        /// Accumulated uncompressed size.
        total: u64,
        /// Configured total-size limit.
        max: u64,
    },

    /// Uncompressed/compressed ratio exceeds the bomb-detection threshold.
    #[error(
        "compression ratio {ratio:.2} exceeds limit {max:.2} (compressed={compressed} bytes, uncompressed={uncompressed} bytes)"
    )]
    CompressionRatio {
        /// Compressed size in bytes.
        compressed: u64,
        /// Accumulated uncompressed size in bytes.
        uncompressed: u64,
        /// Computed ratio.
        ratio: f64,
        /// Configured maximum ratio.
        max: f64,
    },

    /// The listing tool failed or produced output that could not be parsed.
    #[error("archive corrupted: {reason}")]
    ArchiveCorrupted {
        /// What went wrong.
        reason: String,
    },

    /// The listing tool could not be started at all.
    #[error("archive listing unavailable: {reason}")]
    ListingUnavailable {
        /// Rendered execution error.
        reason: String,
    },
}

impl ValidationFailure {
    /// Returns `true` if this failure is a safety rejection rather than a
    /// corrupted or unreadable archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use packsafe_core::ValidationFailure;
    ///
    /// let err = ValidationFailure::PathTraversal {
    ///     name: "../../etc/passwd".to_string(),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = ValidationFailure::ArchiveCorrupted {
    ///     reason: "bad header".to_string(),
    /// };
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::UnsafeArchivePath { .. }
                | Self::ArchiveTooLarge { .. }
                | Self::TooManyEntries { .. }
                | Self::EntryTooLarge { .. }
                | Self::PathTraversal { .. }
                | Self::AbsolutePath { .. }
                | Self::TotalSizeExceeded { .. }
                | Self::CompressionRatio { .. }
        )
    }

    /// Returns the name of the configured limit that was exceeded, if any.
    #[must_use]
    pub const fn limit_name(&self) -> Option<&'static str> {
        match self {
            Self::ArchiveTooLarge { .. } | Self::TotalSizeExceeded { .. } => {
                Some("max_total_size")
            }
            Self::TooManyEntries { .. } => Some("max_entries"),
            Self::EntryTooLarge { .. } => Some("max_entry_size"),
            Self::CompressionRatio { .. } => Some("max_compression_ratio"),
            _ => None,
        }
    }
}

/// Errors that can occur while extracting an archive for processing.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Validation rejected the archive; nothing was extracted.
    #[error("archive rejected: {0}")]
    Rejected(#[from] ValidationFailure),

    /// The extraction tool could not be run.
    #[error("extraction tool failed to run: {0}")]
    Execution(#[from] ExecutionError),

    /// The extraction tool ran but did not succeed.
    #[error("extraction tool failed (exit code {exit_code:?}, timed out: {timed_out})")]
    ExtractionFailed {
        /// Exit code, if the tool exited normally.
        exit_code: Option<i32>,
        /// Whether the tool was stopped by the timeout.
        timed_out: bool,
        /// Tail of the tool's combined output.
        output: String,
    },

    /// The extracted tree failed the post-extraction audit.
    #[error("extracted tree failed audit: {reason}")]
    AuditFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// I/O operation on the extraction workspace failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Returns `true` if this error represents a security violation.
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        match self {
            Self::Rejected(failure) => failure.is_security_violation(),
            Self::AuditFailed { .. } => true,
            Self::Execution(ExecutionError::UnsafeArgument { .. })
            | Self::Execution(ExecutionError::UnsafeExecutablePath { .. }) => true,
            _ => false,
        }
    }

    /// Returns the validation failure, if this error is a rejection.
    #[must_use]
    pub const fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Rejected(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_traversal_display() {
        let err = ValidationFailure::PathTraversal {
            name: "../../etc/passwd".into(),
        };
        assert!(err.to_string().contains("path traversal"));
        assert!(err.to_string().contains("../../etc/passwd"));
    }

    #[test]
    fn test_compression_ratio_display() {
        let err = ValidationFailure::CompressionRatio {
            compressed: 1000,
            uncompressed: 200_000,
            ratio: 200.0,
            max: 100.0,
        };
        let display = err.to_string();
        assert!(display.contains("compression ratio"));
        assert!(display.contains("200.00"));
        assert_eq!(err.limit_name(), Some("max_compression_ratio"));
    }

    #[test]
    fn test_security_violation_classification() {
        assert!(
            ValidationFailure::TooManyEntries {
                count: 10_001,
                max: 10_000
            }
            .is_security_violation()
        );
        assert!(
            !ValidationFailure::ArchiveNotFound {
                path: PathBuf::from("missing.zip")
            }
            .is_security_violation()
        );
        assert!(
            !ValidationFailure::ListingUnavailable {
                reason: "no unzip".into()
            }
            .is_security_violation()
        );
    }

    #[test]
    fn test_extraction_error_wraps_rejection() {
        let err: ExtractionError = ValidationFailure::AbsolutePath {
            name: "/etc/passwd".into(),
        }
        .into();
        assert!(err.is_security_violation());
        assert!(matches!(
            err.validation_failure(),
            Some(ValidationFailure::AbsolutePath { .. })
        ));
        assert!(err.to_string().starts_with("archive rejected"));
    }

    #[test]
    fn test_launch_failure_keeps_source() {
        use std::error::Error;

        let err = ExecutionError::ProcessLaunchFailed {
            program: PathBuf::from("/bin/true"),
            source: std::io::Error::other("resource exhausted"),
        };
        assert!(!err.is_precondition());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("resource exhausted"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ExtractionError = io_err.into();
        assert!(matches!(err, ExtractionError::Io(_)));
        assert!(!err.is_security_violation());
    }
}
