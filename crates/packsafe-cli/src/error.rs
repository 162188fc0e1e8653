//! Error conversion utilities for CLI.
//!
//! Converts packsafe-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use packsafe_core::ExecutionError;
use packsafe_core::ExtractionError;
use packsafe_core::ValidationFailure;
use std::path::Path;

/// Converts a validation rejection into an error with a hint.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn convert_validation_failure(failure: ValidationFailure, archive: &Path) -> anyhow::Error {
    match failure {
        ValidationFailure::PathTraversal { name } => anyhow!(
            "Security violation: Archive '{}' contains path traversal in '{}'\n\
             HINT: This archive may be malicious. Do not extract from untrusted sources.",
            archive.display(),
            name
        ),
        ValidationFailure::AbsolutePath { name } => anyhow!(
            "Security violation: Archive '{}' contains absolute path '{}'\n\
             HINT: This archive may be malicious. Do not extract from untrusted sources.",
            archive.display(),
            name
        ),
        ValidationFailure::CompressionRatio {
            compressed,
            uncompressed,
            ratio,
            ..
        } => anyhow!(
            "Security violation: Archive '{}' appears to be a zip bomb\n\
             Compression ratio: {}:1 ({}KB → {}MB)\n\
             HINT: Use --max-compression-ratio to allow higher ratios if legitimate.",
            archive.display(),
            ratio as u64,
            compressed / 1024,
            uncompressed / 1024 / 1024
        ),
        ValidationFailure::TooManyEntries { .. } => anyhow!(
            "Validation limit exceeded for '{}': {}\n\
             HINT: Use --max-files to increase the limit.",
            archive.display(),
            failure
        ),
        ValidationFailure::EntryTooLarge { .. } => anyhow!(
            "Validation limit exceeded for '{}': {}\n\
             HINT: Use --max-file-size to increase the limit.",
            archive.display(),
            failure
        ),
        ValidationFailure::ArchiveTooLarge { .. }
        | ValidationFailure::TotalSizeExceeded { .. } => anyhow!(
            "Validation limit exceeded for '{}': {}\n\
             HINT: Use --max-total-size to increase the limit.",
            archive.display(),
            failure
        ),
        ValidationFailure::UnsafeArchivePath { .. } => anyhow!(
            "Refusing archive path '{}'\n\
             HINT: Rename the file so its path has no '..' segments, control characters or '$(' / '`' sequences.",
            archive.display()
        ),
        ValidationFailure::ArchiveNotFound { .. } => {
            anyhow!("Archive not found: {}", archive.display())
        }
        ValidationFailure::ArchiveCorrupted { reason } => anyhow!(
            "Invalid archive '{}': {}\n\
             HINT: The archive may be corrupted or not a zip file.",
            archive.display(),
            reason
        ),
        ValidationFailure::ListingUnavailable { reason } => anyhow!(
            "Cannot list archive '{}': {}\n\
             HINT: Install unzip or point --list-tool at another listing command.",
            archive.display(),
            reason
        ),
    }
}

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::Rejected(failure) => convert_validation_failure(failure, archive),
        ExtractionError::ExtractionFailed {
            exit_code,
            timed_out: true,
            ..
        } => anyhow!(
            "Extraction of '{}' timed out (exit code {exit_code:?})\n\
             HINT: Use --extraction-timeout to allow more time for large packs.",
            archive.display()
        ),
        ExtractionError::ExtractionFailed {
            exit_code, output, ..
        } => anyhow!(
            "Extraction tool failed for '{}' (exit code {exit_code:?})\n{output}",
            archive.display()
        ),
        ExtractionError::AuditFailed { reason } => anyhow!(
            "Security violation: Extracted contents of '{}' failed audit: {}\n\
             HINT: Nothing was kept. The archive may contain escaping symlinks.",
            archive.display(),
            reason
        ),
        ExtractionError::Execution(exec) => convert_execution_error(exec, Path::new("extraction tool"))
            .context(format!("Error extracting archive '{}'", archive.display())),
        ExtractionError::Io(io_err) => anyhow!(
            "I/O error while processing '{}': {}\n\
             HINT: Check that --workspace points to a writable directory.",
            archive.display(),
            io_err
        ),
    }
}

/// Converts `ExecutionError` to user-friendly anyhow error with context
pub fn convert_execution_error(err: ExecutionError, program: &Path) -> anyhow::Error {
    match err {
        ExecutionError::UnsafeArgument { index, argument } => anyhow!(
            "Refusing to run '{}': argument {index} is unsafe: {argument:?}\n\
             HINT: Arguments may not contain '..' segments, control characters or '$(' / '`' sequences.",
            program.display()
        ),
        ExecutionError::UnsafeExecutablePath { path } => anyhow!(
            "Refusing to run unsafe executable path '{}'",
            path.display()
        ),
        ExecutionError::ExecutableNotFound { path } => anyhow!(
            "Executable not found or not executable: {}\n\
             HINT: Pass an absolute path or make sure the program is on PATH.",
            path.display()
        ),
        ExecutionError::UnsafeWorkingDirectory { path } => anyhow!(
            "Working directory is unsafe or missing: {}",
            path.display()
        ),
        err @ (ExecutionError::ProcessLaunchFailed { .. } | ExecutionError::Io(_)) => {
            anyhow::Error::from(err).context(format!("Error running '{}'", program.display()))
        }
    }
}
