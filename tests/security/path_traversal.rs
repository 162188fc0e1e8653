//! Path traversal attack tests.

use packsafe_core::ArchiveValidator;
use packsafe_core::ValidationFailure;
use packsafe_core::extraction::ArchiveExtractionCache;
use packsafe_core::process::SecureProcessRunner;
use packsafe_core::security::check_member_name;
use packsafe_core::test_utils::FakeTools;
use packsafe_core::test_utils::write_archive_file;
use tempfile::TempDir;

#[test]
fn test_classic_traversal_names() {
    for name in [
        "../../../etc/passwd",
        "assets/../../../../root/.ssh/authorized_keys",
        r"..\..\Windows\System32\drivers\etc\hosts",
        "textures/..",
    ] {
        assert!(
            matches!(
                check_member_name(name),
                Err(ValidationFailure::PathTraversal { .. })
            ),
            "{name} should be a traversal"
        );
    }
}

#[test]
fn test_absolute_member_names() {
    for name in ["/etc/passwd", r"\\server\share\x", "C:\\autoexec.bat", "d:/x"] {
        assert!(
            matches!(
                check_member_name(name),
                Err(ValidationFailure::AbsolutePath { .. })
            ),
            "{name} should be absolute"
        );
    }
}

#[test]
fn test_lookalike_names_allowed() {
    for name in ["...", "..foo", "foo..", "a/..b/c", "v1..2/model.obj"] {
        assert!(check_member_name(name).is_ok(), "{name} should pass");
    }
}

#[test]
fn test_traversal_anywhere_in_listing_blocks_extraction() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive_file(temp.path(), "pack.zip", 100_000);
    let mut tools = FakeTools::new(temp.path());
    for i in 0..50 {
        tools = tools.member(&format!("assets/model{i}.obj"), 100);
    }
    tools = tools.member("assets/../../escape.txt", 100);

    let validator = ArchiveValidator::new(SecureProcessRunner::new()).with_tools(tools.host_tools());
    let cache = ArchiveExtractionCache::new(validator, temp.path().join("workspace"));

    let err = cache.extract_for_processing(&archive).unwrap_err();

    assert!(err.is_security_violation());
    assert_eq!(tools.extract_invocations(), 0);
    assert!(!temp.path().join("escape.txt").exists());
}

#[test]
fn test_archive_path_with_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let validator = ArchiveValidator::new(SecureProcessRunner::new())
        .with_tools(FakeTools::new(temp.path()).host_tools());
    let path = format!("{}/sub/../pack.zip", temp.path().display());

    let result = validator.validate(&path);

    assert!(matches!(
        result.error,
        Some(ValidationFailure::UnsafeArchivePath { .. })
    ));
}
