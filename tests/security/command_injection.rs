//! Command injection tests for the process runner.

use packsafe_core::ExecutionError;
use packsafe_core::process::ExecutionRequest;
use packsafe_core::process::NoopOutput;
use packsafe_core::process::SecureProcessRunner;
use tempfile::TempDir;

#[test]
fn test_substitution_arguments_never_spawn() {
    let runner = SecureProcessRunner::new();
    for argument in ["$(touch /tmp/pwned)", "`id`", "a\nb", "x\0y", "../../bin/sh"] {
        let err = runner
            .run(&ExecutionRequest::new("echo").arg(argument), &mut NoopOutput)
            .unwrap_err();
        assert!(
            matches!(err, ExecutionError::UnsafeArgument { index: 0, .. }),
            "{argument:?} should be rejected"
        );
        assert!(err.is_precondition());
    }
}

#[test]
fn test_shell_metacharacters_are_literal() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("pwned");
    let argument = format!("; touch {}", marker.display());

    let result = SecureProcessRunner::new()
        .run(&ExecutionRequest::new("echo").arg(&argument), &mut NoopOutput)
        .unwrap();

    assert_eq!(result.output.trim_end(), argument);
    assert!(!marker.exists());
}

#[test]
fn test_executable_with_substitution_rejected() {
    let err = SecureProcessRunner::new()
        .run(&ExecutionRequest::new("/bin/$(id)"), &mut NoopOutput)
        .unwrap_err();
    assert!(matches!(err, ExecutionError::UnsafeExecutablePath { .. }));
}
