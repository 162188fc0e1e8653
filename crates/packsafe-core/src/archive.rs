//! Pre-extraction archive validation.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::ArchiveValidationResult;
use crate::ExecutionError;
use crate::ValidationFailure;
use crate::ValidationLimits;
use crate::events::EventKind;
use crate::events::SecurityEvent;
use crate::events::SecurityEventLog;
use crate::host::HostTools;
use crate::inspection::parse_listing;
use crate::process::OutputSink;
use crate::process::ProcessResult;
use crate::process::SecureProcessRunner;
use crate::security::MemberValidator;
use crate::security::is_path_safe;

/// Lines of tool output quoted in corruption reports.
const OUTPUT_TAIL_LINES: usize = 5;

/// Listing lines that are not member rows: headers, rules and totals.
const LISTING_OVERHEAD_LINES: usize = 8;

/// Stops the listing tool once it has printed more complete lines than the
/// entry-count limit can account for.
#[derive(Debug)]
struct ListingWatch {
    lines: usize,
    max_lines: usize,
}

impl ListingWatch {
    fn new(max_entries: usize) -> Self {
        Self {
            lines: 0,
            max_lines: max_entries.saturating_add(LISTING_OVERHEAD_LINES),
        }
    }
}

impl OutputSink for ListingWatch {
    fn on_output(&mut self, chunk: &[u8]) {
        self.lines += chunk.iter().filter(|byte| **byte == b'\n').count();
    }

    fn wants_stop(&self) -> bool {
        self.lines > self.max_lines
    }
}

/// Inspects an archive's metadata and decides whether it may be extracted.
///
/// Nothing is written to disk. The member list comes from the host listing
/// tool, run through the [`SecureProcessRunner`] with
/// [`ValidationLimits::listing_timeout`].
///
/// # Examples
///
/// ```no_run
/// use packsafe_core::ArchiveValidator;
/// use packsafe_core::ValidationLimits;
/// use packsafe_core::process::SecureProcessRunner;
///
/// let validator = ArchiveValidator::new(SecureProcessRunner::new()).with_limits(ValidationLimits {
///     max_entries: 2_000,
///     ..Default::default()
/// });
///
/// let result = validator.validate("Arcade Pack.zip");
/// if let Some(err) = &result.error {
///     eprintln!("rejected: {err}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveValidator {
    runner: SecureProcessRunner,
    limits: ValidationLimits,
    tools: HostTools,
}

impl ArchiveValidator {
    /// Creates a validator with default limits and host tools.
    #[must_use]
    pub fn new(runner: SecureProcessRunner) -> Self {
        Self {
            runner,
            limits: ValidationLimits::default(),
            tools: HostTools::default(),
        }
    }

    /// Replaces the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replaces the host tools.
    #[must_use]
    pub fn with_tools(mut self, tools: HostTools) -> Self {
        self.tools = tools;
        self
    }

    /// Configured limits.
    #[must_use]
    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Configured host tools.
    #[must_use]
    pub fn tools(&self) -> &HostTools {
        &self.tools
    }

    /// The runner used for the listing tool.
    #[must_use]
    pub fn runner(&self) -> &SecureProcessRunner {
        &self.runner
    }

    fn events(&self) -> &Arc<dyn SecurityEventLog> {
        self.runner.events()
    }

    /// Validates the archive at `archive_path`.
    ///
    /// Checks, in order:
    /// 1. the file exists and its on-disk size is within `max_total_size`
    /// 2. the listing tool succeeds and its output parses
    /// 3. per member: entry count, entry size, name safety, extension
    ///    (advisory only)
    /// 4. aggregate uncompressed size
    /// 5. compression ratio
    ///
    /// The scan stops at the first failure. The listing tool itself is
    /// stopped once its output holds more lines than the entry-count limit
    /// allows, so an endless or huge listing is cut short.
    pub fn validate(&self, archive_path: impl AsRef<Path>) -> ArchiveValidationResult {
        let archive_path = archive_path.as_ref();
        let result = self.validate_inner(archive_path);

        match &result.error {
            None => {
                debug!(
                    archive = %archive_path.display(),
                    entries = result.file_count,
                    bytes = result.total_uncompressed_size,
                    warnings = result.warnings.len(),
                    "archive validated"
                );
                self.events().log(SecurityEvent::info(
                    EventKind::ArchiveExtraction,
                    format!(
                        "validated {}: {} entries, {} bytes",
                        archive_path.display(),
                        result.file_count,
                        result.total_uncompressed_size
                    ),
                ));
            }
            Some(failure) => {
                warn!(archive = %archive_path.display(), error = %failure, "archive rejected");
                let kind = match failure {
                    ValidationFailure::PathTraversal { .. }
                    | ValidationFailure::AbsolutePath { .. }
                    | ValidationFailure::UnsafeArchivePath { .. } => EventKind::PathValidation,
                    _ => EventKind::ArchiveExtraction,
                };
                self.events().log(SecurityEvent::error(
                    kind,
                    format!("rejected {}: {failure}", archive_path.display()),
                ));
            }
        }

        result
    }

    fn validate_inner(&self, archive_path: &Path) -> ArchiveValidationResult {
        let Some(archive) = archive_path.to_str().filter(|p| is_path_safe(p)) else {
            return ArchiveValidationResult::rejected(ValidationFailure::UnsafeArchivePath {
                path: archive_path.to_path_buf(),
            });
        };

        let compressed_size = match fs::metadata(archive_path) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return ArchiveValidationResult::rejected(ValidationFailure::ArchiveNotFound {
                    path: archive_path.to_path_buf(),
                });
            }
        };

        if compressed_size > self.limits.max_total_size {
            return ArchiveValidationResult::rejected(ValidationFailure::ArchiveTooLarge {
                size: compressed_size,
                max: self.limits.max_total_size,
            });
        }

        let listing = match self.run_listing(archive) {
            Ok(listing) => listing,
            Err(failure) => {
                let mut result = ArchiveValidationResult::rejected(failure);
                result.compressed_size = compressed_size;
                return result;
            }
        };

        let mut validator = MemberValidator::new(&self.limits);
        let mut scan_error = None;
        for item in parse_listing(&listing.output, self.tools.list_format) {
            let checked = match item {
                Ok(member) => validator.check(&member),
                Err(parse) => Err(ValidationFailure::ArchiveCorrupted {
                    reason: format!("unparsable listing, {parse}"),
                }),
            };
            if let Err(failure) = checked {
                scan_error = Some(failure);
                break;
            }
        }

        if scan_error.is_none() && listing.stopped {
            scan_error = Some(ValidationFailure::ArchiveCorrupted {
                reason: "listing stopped early with fewer members than lines".to_string(),
            });
        }

        if scan_error.is_none() && listing.output_truncated {
            scan_error = Some(ValidationFailure::ArchiveCorrupted {
                reason: "listing output exceeded the capture limit".to_string(),
            });
        }

        if let Some(failure) = scan_error {
            return ArchiveValidationResult {
                valid: false,
                error: Some(failure),
                file_count: validator.entries(),
                total_uncompressed_size: validator.total_size(),
                compressed_size,
                warnings: Vec::new(),
            };
        }

        let entries = validator.entries();
        let total = validator.total_size();
        match validator.finish(compressed_size) {
            Ok(summary) => ArchiveValidationResult::accepted(summary, compressed_size),
            Err(failure) => ArchiveValidationResult {
                valid: false,
                error: Some(failure),
                file_count: entries,
                total_uncompressed_size: total,
                compressed_size,
                warnings: Vec::new(),
            },
        }
    }

    fn run_listing(&self, archive: &str) -> Result<ProcessResult, ValidationFailure> {
        let request = self
            .tools
            .list
            .request(archive, None, self.limits.listing_timeout);

        let mut watch = ListingWatch::new(self.limits.max_entries);
        let result = self
            .runner
            .run(&request, &mut watch)
            .map_err(|err| listing_unavailable(&err))?;

        // The captured prefix already holds more rows than allowed; the
        // member scan reports the entry-count failure from it.
        if result.stopped {
            debug!(archive, lines = watch.lines, "listing stopped at the entry limit");
            return Ok(result);
        }

        if result.timed_out {
            return Err(ValidationFailure::ArchiveCorrupted {
                reason: format!(
                    "listing timed out after {:?}",
                    self.limits.listing_timeout
                ),
            });
        }
        if !result.success() {
            return Err(ValidationFailure::ArchiveCorrupted {
                reason: format!(
                    "listing tool failed ({}): {}",
                    result.summary(),
                    result.output_tail(OUTPUT_TAIL_LINES)
                ),
            });
        }

        Ok(result)
    }
}

fn listing_unavailable(err: &ExecutionError) -> ValidationFailure {
    ValidationFailure::ListingUnavailable {
        reason: err.to_string(),
    }
}
