//! Output formatter trait for CLI results.

use anyhow::Result;
use packsafe_core::ArchiveValidationResult;
use packsafe_core::extraction::AuditSummary;
use packsafe_core::process::ProcessResult;
use serde::Serialize;
use std::path::Path;

/// Verdict of `check-path`.
#[derive(Debug, Serialize)]
pub struct PathCheck {
    pub path: String,
    pub safe: bool,
    pub valid_filename: bool,
    pub shell_escaped: String,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the verdict of `validate`, accepted or not
    fn format_validation_result(
        &self,
        archive: &Path,
        result: &ArchiveValidationResult,
    ) -> Result<()>;

    /// Format a successful extraction
    fn format_extraction_result(
        &self,
        archive: &Path,
        extracted_dir: &Path,
        summary: &AuditSummary,
    ) -> Result<()>;

    /// Format the outcome of `run`
    fn format_process_result(&self, program: &Path, result: &ProcessResult) -> Result<()>;

    /// Format the verdict of `check-path`
    fn format_path_check(&self, check: &PathCheck) -> Result<()>;

    /// Format error message
    #[allow(dead_code)]
    fn format_error(&self, error: &anyhow::Error);

    /// Format success message
    #[allow(dead_code)]
    fn format_success(&self, message: &str);

    /// Format warning message
    #[allow(dead_code)]
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// A failed operation that still has data to report, such as a
    /// rejected archive's scan totals.
    pub fn failure(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: Some(data),
            error: Some(error.into()),
        }
    }

    #[allow(dead_code)]
    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
