//! Decompression bomb detection tests.

use packsafe_core::ArchiveValidator;
use packsafe_core::ValidationFailure;
use packsafe_core::ValidationLimits;
use packsafe_core::inspection::ArchiveMember;
use packsafe_core::process::SecureProcessRunner;
use packsafe_core::security::validate_manifest;
use packsafe_core::test_utils::FakeTools;
use packsafe_core::test_utils::write_archive_file;
use tempfile::TempDir;

#[test]
fn test_42_zip_style_bomb() {
    // 42 KB compressed, 4.5 PB claimed: the per-entry limit fires first.
    let members = vec![ArchiveMember::new("42.zip", 4_500_000_000_000_000)];
    let err = validate_manifest(&members, 42_000, &ValidationLimits::default()).unwrap_err();
    assert!(matches!(err, ValidationFailure::EntryTooLarge { .. }));
}

#[test]
fn test_many_small_entries_exceed_ratio() {
    let members: Vec<_> = (0..1000)
        .map(|i| ArchiveMember::new(format!("zeros/{i}.txt"), 100 * 1024))
        .collect();
    let err = validate_manifest(&members, 100 * 1024, &ValidationLimits::default()).unwrap_err();
    assert!(matches!(err, ValidationFailure::CompressionRatio { .. }));
}

#[test]
fn test_aggregate_size_limit() {
    let mut limits = ValidationLimits::default();
    limits.max_total_size = 1024 * 1024;
    limits.max_compression_ratio = f64::INFINITY;
    let members: Vec<_> = (0..20)
        .map(|i| ArchiveMember::new(format!("{i}.png"), 100 * 1024))
        .collect();
    let err = validate_manifest(&members, 1024, &limits).unwrap_err();
    assert!(matches!(err, ValidationFailure::TotalSizeExceeded { .. }));
    assert_eq!(err.limit_name(), Some("max_total_size"));
}

#[test]
fn test_ratio_at_limit_is_allowed() {
    let members = vec![ArchiveMember::new("a.txt", 100 * 1024)];
    assert!(validate_manifest(&members, 1024, &ValidationLimits::default()).is_ok());
}

#[test]
fn test_bomb_detected_through_listing_tool() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive_file(temp.path(), "bomb.zip", 1024);
    let tools = FakeTools::new(temp.path()).member("zeros.txt", 200 * 1024);
    let validator = ArchiveValidator::new(SecureProcessRunner::new()).with_tools(tools.host_tools());

    let result = validator.validate(&archive);

    assert!(!result.valid);
    let failure = result.error.unwrap();
    assert!(failure.is_security_violation());
    assert_eq!(failure.limit_name(), Some("max_compression_ratio"));
}
