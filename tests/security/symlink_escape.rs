//! Symlink escape tests for extracted trees.

use packsafe_core::ArchiveValidator;
use packsafe_core::ExtractionError;
use packsafe_core::ValidationLimits;
use packsafe_core::extraction::ArchiveExtractionCache;
use packsafe_core::extraction::audit_tree;
use packsafe_core::process::SecureProcessRunner;
use packsafe_core::test_utils::FakeTools;
use packsafe_core::test_utils::write_archive_file;
use std::fs;
use std::os::unix::fs::symlink;
use tempfile::TempDir;

#[test]
fn test_symlink_to_parent_rejected() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("extracted");
    fs::create_dir(&root).unwrap();
    symlink("..", root.join("up")).unwrap();

    let err = audit_tree(&root, &ValidationLimits::default()).unwrap_err();
    assert!(matches!(err, ExtractionError::AuditFailed { .. }));
}

#[test]
fn test_chained_symlinks_resolved() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("extracted");
    fs::create_dir(&root).unwrap();
    symlink("second", root.join("first")).unwrap();
    symlink("/tmp", root.join("second")).unwrap();

    assert!(audit_tree(&root, &ValidationLimits::default()).is_err());
}

#[test]
fn test_escaping_symlink_from_tool_cleans_up() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive_file(temp.path(), "pack.zip", 10_000);
    let tools = FakeTools::new(temp.path())
        .member("MyPack/", 0)
        .member("MyPack/model.obj", 100)
        .extract_shell("    ln -s / \"$dest/MyPack/root\"");
    let validator = ArchiveValidator::new(SecureProcessRunner::new()).with_tools(tools.host_tools());
    let cache = ArchiveExtractionCache::new(validator, temp.path().join("workspace"));

    let err = cache.extract_for_processing(&archive).unwrap_err();

    assert!(err.is_security_violation());
    let leftovers: Vec<_> = fs::read_dir(temp.path().join("workspace"))
        .unwrap()
        .collect();
    assert!(leftovers.is_empty());
}
