//! Timeout escalation: polite stop, then forced kill.
//!
//! On Unix the child is started as the leader of its own process group, so
//! both signals reach every descendant (interpreters that fork helpers,
//! shell wrappers). Elsewhere `Child::kill` is the only primitive and both
//! steps use it.

use std::process::Child;
use std::process::Command;

/// Places the command in a fresh process group led by the child.
pub(crate) fn isolate(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// Asks the process group to exit (SIGTERM).
pub(crate) fn request_stop(child: &mut Child) {
    #[cfg(unix)]
    {
        signal_group(child.id(), libc::SIGTERM);
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
}

/// Kills the process group unconditionally (SIGKILL).
pub(crate) fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        signal_group(child.id(), libc::SIGKILL);
    }
    // Covers platforms without groups and a leader that left its group.
    let _ = child.kill();
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // SAFETY: kill() takes plain integers and has no memory-safety
    // preconditions. A negative pid addresses the process group created by
    // `isolate`; ESRCH for an already-empty group is ignored.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(-pgid, signal) };

    if rc != 0 {
        tracing::debug!(
            pgid,
            signal,
            error = %std::io::Error::last_os_error(),
            "signal delivery failed"
        );
    }
}
