//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::PathCheck;
use anyhow::Result;
use packsafe_core::ArchiveValidationResult;
use packsafe_core::extraction::AuditSummary;
use packsafe_core::process::ProcessResult;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ValidationOutput<'a> {
    archive: String,
    #[serde(flatten)]
    result: &'a ArchiveValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_violation: Option<bool>,
}

#[derive(Serialize)]
struct ExtractionOutput {
    archive: String,
    extracted_dir: String,
    files: usize,
    directories: usize,
    symlinks: usize,
    total_size: u64,
}

#[derive(Serialize)]
struct ProcessOutput<'a> {
    program: String,
    exit_code: Option<i32>,
    signal: Option<i32>,
    timed_out: bool,
    duration_ms: u128,
    output: &'a str,
    output_truncated: bool,
}

impl OutputFormatter for JsonFormatter {
    fn format_validation_result(
        &self,
        archive: &Path,
        result: &ArchiveValidationResult,
    ) -> Result<()> {
        let data = ValidationOutput {
            archive: archive.display().to_string(),
            result,
            security_violation: result
                .error
                .as_ref()
                .map(packsafe_core::ValidationFailure::is_security_violation),
        };

        match &result.error {
            Some(failure) => Self::output(&JsonOutput::failure(
                "validate",
                data,
                failure.to_string(),
            )),
            None => Self::output(&JsonOutput::success("validate", data)),
        }
    }

    fn format_extraction_result(
        &self,
        archive: &Path,
        extracted_dir: &Path,
        summary: &AuditSummary,
    ) -> Result<()> {
        let data = ExtractionOutput {
            archive: archive.display().to_string(),
            extracted_dir: extracted_dir.display().to_string(),
            files: summary.files,
            directories: summary.directories,
            symlinks: summary.symlinks,
            total_size: summary.total_size,
        };

        Self::output(&JsonOutput::success("extract", data))
    }

    fn format_process_result(&self, program: &Path, result: &ProcessResult) -> Result<()> {
        let data = ProcessOutput {
            program: program.display().to_string(),
            exit_code: result.exit_code,
            signal: result.signal,
            timed_out: result.timed_out,
            duration_ms: result.duration.as_millis(),
            output: &result.output,
            output_truncated: result.output_truncated,
        };

        if result.success() {
            Self::output(&JsonOutput::success("run", data))
        } else {
            Self::output(&JsonOutput::failure("run", data, result.summary()))
        }
    }

    fn format_path_check(&self, check: &PathCheck) -> Result<()> {
        if check.safe {
            Self::output(&JsonOutput::success("check-path", check))
        } else {
            Self::output(&JsonOutput::failure("check-path", check, "unsafe path"))
        }
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("unknown", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_success(&self, message: &str) {
        #[derive(Serialize)]
        struct SuccessData {
            message: String,
        }

        let output = JsonOutput::success(
            "unknown",
            SuccessData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
