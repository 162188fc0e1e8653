//! Entry-count and size accounting over an archive manifest.

use crate::ValidationFailure;
use crate::ValidationLimits;

/// Running totals for one manifest scan.
#[derive(Debug, Default)]
pub struct ManifestQuota {
    entries: usize,
    total_size: u64,
}

impl ManifestQuota {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one member of `size` bytes named `name`.
    ///
    /// # Errors
    ///
    /// [`ValidationFailure::TooManyEntries`] as soon as the count passes
    /// `max_entries`, or [`ValidationFailure::EntryTooLarge`] for a member
    /// above `max_entry_size`.
    pub fn record(&mut self, name: &str, size: u64, limits: &ValidationLimits) -> Result<(), ValidationFailure> {
        self.entries += 1;
        if self.entries > limits.max_entries {
            return Err(ValidationFailure::TooManyEntries {
                count: self.entries,
                max: limits.max_entries,
            });
        }

        self.total_size = self.total_size.saturating_add(size);

        if size > limits.max_entry_size {
            return Err(ValidationFailure::EntryTooLarge {
                name: name.to_string(),
                size,
                max: limits.max_entry_size,
            });
        }

        Ok(())
    }

    /// Checks the aggregate size once the scan is complete.
    ///
    /// # Errors
    ///
    /// [`ValidationFailure::TotalSizeExceeded`].
    pub fn check_total(&self, limits: &ValidationLimits) -> Result<(), ValidationFailure> {
        if self.total_size > limits.max_total_size {
            return Err(ValidationFailure::TotalSizeExceeded {
                total: self.total_size,
                max: limits.max_total_size,
            });
        }
        Ok(())
    }

    /// Members recorded so far.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Accumulated uncompressed size.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use super::*;

    #[test]
    fn test_records_totals() {
        let mut quota = ManifestQuota::new();
        let limits = ValidationLimits::default();
        assert!(quota.record("a", 1000, &limits).is_ok());
        assert!(quota.record("b", 24, &limits).is_ok());
        assert_eq!(quota.entries(), 2);
        assert_eq!(quota.total_size(), 1024);
        assert!(quota.check_total(&limits).is_ok());
    }

    #[test]
    fn test_entry_count_exceeded_at_limit_plus_one() {
        let mut quota = ManifestQuota::new();
        let mut limits = ValidationLimits::default();
        limits.max_entries = 2;

        assert!(quota.record("a", 1, &limits).is_ok());
        assert!(quota.record("b", 1, &limits).is_ok());
        assert_eq!(
            quota.record("c", 1, &limits),
            Err(ValidationFailure::TooManyEntries { count: 3, max: 2 })
        );
    }

    #[test]
    fn test_entry_too_large() {
        let mut quota = ManifestQuota::new();
        let mut limits = ValidationLimits::default();
        limits.max_entry_size = 1000;

        assert!(quota.record("ok", 1000, &limits).is_ok());
        let result = quota.record("big.mov", 1001, &limits);
        assert!(matches!(result, Err(ValidationFailure::EntryTooLarge { size: 1001, .. })));
    }

    #[test]
    fn test_total_exceeded() {
        let mut quota = ManifestQuota::new();
        let mut limits = ValidationLimits::default();
        limits.max_total_size = 1000;

        assert!(quota.record("a", 600, &limits).is_ok());
        assert!(quota.record("b", 500, &limits).is_ok());
        assert_eq!(
            quota.check_total(&limits),
            Err(ValidationFailure::TotalSizeExceeded { total: 1100, max: 1000 })
        );
    }

    #[test]
    fn test_total_saturates() {
        let mut quota = ManifestQuota::new();
        let mut limits = ValidationLimits::default();
        limits.max_entry_size = u64::MAX;
        assert!(quota.record("a", u64::MAX, &limits).is_ok());
        assert!(quota.record("b", u64::MAX, &limits).is_ok());
        assert_eq!(quota.total_size(), u64::MAX);
    }
}
