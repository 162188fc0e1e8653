//! Runaway process containment tests.

use packsafe_core::RunnerConfig;
use packsafe_core::events::TracingEventLog;
use packsafe_core::process::ExecutionRequest;
use packsafe_core::process::NoopOutput;
use packsafe_core::process::SecureProcessRunner;
use packsafe_core::test_utils::write_script;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use tempfile::TempDir;

#[test]
fn test_grandchildren_are_terminated() {
    let temp = TempDir::new().unwrap();
    let pid_file = temp.path().join("grandchild.pid");
    let script = write_script(
        temp.path(),
        "forker.sh",
        &format!("sleep 30 &\necho $! > '{}'\nwait\n", pid_file.display()),
    );

    let result = SecureProcessRunner::new()
        .run(
            &ExecutionRequest::new(&script).timeout(Duration::from_millis(500)),
            &mut NoopOutput,
        )
        .unwrap();
    assert!(result.timed_out);

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let pid = pid.trim();
    // Give the kernel a moment to reap the orphaned sleep.
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut alive = true;
    while Instant::now() < deadline {
        alive = std::path::Path::new(&format!("/proc/{pid}")).exists()
            && !std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .unwrap_or_default()
                .contains(") Z ");
        if !alive {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    if cfg!(target_os = "linux") {
        assert!(!alive, "grandchild {pid} survived the timeout");
    }
}

#[test]
fn test_term_ignoring_process_killed_after_grace() {
    let temp = TempDir::new().unwrap();
    let script = write_script(
        temp.path(),
        "stubborn.sh",
        "trap '' TERM\nwhile true; do sleep 0.1; done\n",
    );
    let runner = SecureProcessRunner::with_config(
        RunnerConfig {
            grace_period: Duration::from_millis(200),
            ..RunnerConfig::default()
        },
        Arc::new(TracingEventLog),
    );

    let started = Instant::now();
    let result = runner
        .run(
            &ExecutionRequest::new(&script).timeout(Duration::from_millis(300)),
            &mut NoopOutput,
        )
        .unwrap();

    assert!(result.timed_out);
    assert!(result.exit_code.is_none());
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_fast_process_not_marked_timed_out() {
    let result = SecureProcessRunner::new()
        .run(
            &ExecutionRequest::new("true").timeout(Duration::from_secs(5)),
            &mut NoopOutput,
        )
        .unwrap();
    assert!(!result.timed_out);
    assert!(result.success());
}
