//! Manifest validation orchestrator.
//!
//! [`MemberValidator`] runs every per-member check over a stream of
//! [`ArchiveMember`]s and the archive-wide checks once the stream ends.
//! It does no I/O, so it works the same for listing-tool output, an
//! in-memory manifest or a property test.

use crate::ValidationFailure;
use crate::ValidationLimits;
use crate::inspection::ArchiveMember;
use crate::security::check_member_name;
use crate::security::quota::ManifestQuota;
use crate::security::zipbomb::validate_compression_ratio;

/// Totals of a manifest that passed every check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestSummary {
    /// Member count, directories included.
    pub file_count: usize,
    /// Sum of uncompressed member sizes.
    pub total_uncompressed_size: u64,
    /// Advisory messages (unexpected extensions).
    pub warnings: Vec<String>,
}

/// Stateful validator for one manifest scan.
///
/// # Lifecycle
///
/// 1. Create with `MemberValidator::new(&limits)`
/// 2. Call [`check`](Self::check) for each member, stopping at the first
///    error
/// 3. Call [`finish`](Self::finish) with the archive's on-disk size
///
/// # Examples
///
/// ```
/// use packsafe_core::ValidationLimits;
/// use packsafe_core::inspection::ArchiveMember;
/// use packsafe_core::security::MemberValidator;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let limits = ValidationLimits::default();
/// let mut validator = MemberValidator::new(&limits);
///
/// validator.check(&ArchiveMember::new("MyPack/model.obj", 4096))?;
/// validator.check(&ArchiveMember::new("MyPack/setup.exe", 1024))?;
///
/// let summary = validator.finish(2048)?;
/// assert_eq!(summary.file_count, 2);
/// assert_eq!(summary.warnings.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemberValidator<'a> {
    limits: &'a ValidationLimits,
    quota: ManifestQuota,
    warnings: Vec<String>,
}

impl<'a> MemberValidator<'a> {
    /// Creates a validator for `limits`.
    #[must_use]
    pub fn new(limits: &'a ValidationLimits) -> Self {
        Self {
            limits,
            quota: ManifestQuota::new(),
            warnings: Vec::new(),
        }
    }

    /// Checks one member.
    ///
    /// Order: entry count, per-entry size, name safety, extension. Only the
    /// extension check is advisory.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationFailure`] the member triggers.
    pub fn check(&mut self, member: &ArchiveMember) -> Result<(), ValidationFailure> {
        self.quota.record(&member.name, member.size, self.limits)?;
        check_member_name(&member.name)?;

        if !member.is_directory() {
            let allowed = member
                .extension()
                .is_some_and(|ext| self.limits.is_extension_allowed(ext))
                || self.limits.allowed_extensions.is_empty();
            if !allowed {
                self.warnings
                    .push(format!("unexpected file type: {}", member.name));
            }
        }

        Ok(())
    }

    /// Members checked so far.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.quota.entries()
    }

    /// Uncompressed bytes accumulated so far.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.quota.total_size()
    }

    /// Runs the archive-wide checks and returns the totals.
    ///
    /// # Errors
    ///
    /// [`ValidationFailure::TotalSizeExceeded`] or
    /// [`ValidationFailure::CompressionRatio`].
    pub fn finish(self, compressed_size: u64) -> Result<ManifestSummary, ValidationFailure> {
        self.quota.check_total(self.limits)?;
        validate_compression_ratio(
            compressed_size,
            self.quota.total_size(),
            self.limits.max_compression_ratio,
        )?;

        Ok(ManifestSummary {
            file_count: self.quota.entries(),
            total_uncompressed_size: self.quota.total_size(),
            warnings: self.warnings,
        })
    }
}

/// Validates a complete manifest in one call.
///
/// # Errors
///
/// Returns the first [`ValidationFailure`] in scan order.
pub fn validate_manifest<'m, I>(
    members: I,
    compressed_size: u64,
    limits: &ValidationLimits,
) -> Result<ManifestSummary, ValidationFailure>
where
    I: IntoIterator<Item = &'m ArchiveMember>,
{
    let mut validator = MemberValidator::new(limits);
    for member in members {
        validator.check(member)?;
    }
    validator.finish(compressed_size)
}
