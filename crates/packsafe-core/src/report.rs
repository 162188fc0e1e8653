//! Archive validation reporting.

use serde::Serialize;
use serde::Serializer;

use crate::ValidationFailure;
use crate::security::ManifestSummary;

/// Outcome of [`ArchiveValidator::validate`](crate::ArchiveValidator::validate).
///
/// `valid == false` if and only if `error` is set. Counts reflect what was
/// scanned before a rejection, so a `TooManyEntries` result reports
/// `max_entries + 1` members.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ArchiveValidationResult {
    /// Whether extraction may proceed.
    pub valid: bool,

    /// Reason for rejection.
    #[serde(serialize_with = "serialize_failure")]
    pub error: Option<ValidationFailure>,

    /// Members scanned.
    pub file_count: usize,

    /// Sum of uncompressed member sizes scanned.
    pub total_uncompressed_size: u64,

    /// On-disk size of the archive.
    pub compressed_size: u64,

    /// Non-fatal findings, such as unexpected file types.
    pub warnings: Vec<String>,
}

impl ArchiveValidationResult {
    /// A passing result built from a manifest summary.
    #[must_use]
    pub fn accepted(summary: ManifestSummary, compressed_size: u64) -> Self {
        Self {
            valid: true,
            error: None,
            file_count: summary.file_count,
            total_uncompressed_size: summary.total_uncompressed_size,
            compressed_size,
            warnings: summary.warnings,
        }
    }

    /// A failing result with no scan totals.
    #[must_use]
    pub fn rejected(error: ValidationFailure) -> Self {
        Self {
            valid: false,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Returns whether any warnings were recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Uncompressed/compressed ratio, or `None` for an empty archive file.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compression_ratio(&self) -> Option<f64> {
        (self.compressed_size > 0)
            .then(|| self.total_uncompressed_size as f64 / self.compressed_size as f64)
    }
}

#[allow(clippy::ref_option)]
fn serialize_failure<S: Serializer>(
    error: &Option<ValidationFailure>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(failure) => serializer.serialize_some(&failure.to_string()),
        None => serializer.serialize_none(),
    }
}
