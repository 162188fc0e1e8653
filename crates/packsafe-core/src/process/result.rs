//! Outcome of a supervised process run.

use std::time::Duration;

/// Result of one [`SecureProcessRunner::run`](super::SecureProcessRunner::run).
///
/// When `timed_out` is `true` the process has already been reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code, or `None` if the process was ended by a signal.
    pub exit_code: Option<i32>,

    /// Terminating signal number on Unix, if any.
    pub signal: Option<i32>,

    /// Combined stdout and stderr, lossily decoded as UTF-8.
    pub output: String,

    /// Whether `output` was cut at the configured capture limit.
    pub output_truncated: bool,

    /// Whether the timeout fired and the process was terminated.
    pub timed_out: bool,

    /// Whether the output sink asked to stop and the process was terminated.
    pub stopped: bool,

    /// Wall-clock time from spawn to reap.
    pub duration: Duration,
}

impl ProcessResult {
    /// Exit code 0 and neither timed out nor stopped.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && !self.stopped
    }

    /// The last `max_lines` lines of output, for error messages.
    #[must_use]
    pub fn output_tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.output.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.timed_out {
            format!("timed out after {}ms", self.duration.as_millis())
        } else if self.stopped {
            format!("stopped early after {}ms", self.duration.as_millis())
        } else if let Some(code) = self.exit_code {
            format!(
                "exit code {code} after {}ms ({} bytes output)",
                self.duration.as_millis(),
                self.output.len()
            )
        } else {
            format!(
                "terminated by signal {:?} after {}ms",
                self.signal,
                self.duration.as_millis()
            )
        }
    }
}
