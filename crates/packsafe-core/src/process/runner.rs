//! Supervised execution of external programs.

use std::fs;
use std::io::PipeReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ExecutionRequest;
use super::OutputSink;
use super::ProcessResult;
use super::output::CapturedOutput;
use super::terminate;
use crate::config::RunnerConfig;
use crate::error::ExecutionError;
use crate::events::EventKind;
use crate::events::SecurityEvent;
use crate::events::SecurityEventLog;
use crate::events::TracingEventLog;
use crate::security::is_path_safe;

/// Interval at which the waiter thread polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read buffer size for the output pipe.
const READ_CHUNK: usize = 8 * 1024;

/// Runs external programs with validated inputs and a hard timeout.
///
/// # Security
///
/// - Arguments go to the OS as an argv vector, never through a shell
/// - The executable path and every argument must pass
///   [`is_path_safe`]
/// - The executable must exist and carry the executable bit
/// - On timeout the whole process group gets SIGTERM, then SIGKILL after the
///   grace period, and `run` returns only once the child has been reaped
///
/// # Examples
///
/// ```no_run
/// use packsafe_core::process::ExecutionRequest;
/// use packsafe_core::process::NoopOutput;
/// use packsafe_core::process::SecureProcessRunner;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let runner = SecureProcessRunner::new();
/// let request = ExecutionRequest::new("sleep")
///     .arg("5")
///     .timeout(Duration::from_secs(1));
///
/// let result = runner.run(&request, &mut NoopOutput)?;
/// assert!(result.timed_out);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SecureProcessRunner {
    config: RunnerConfig,
    events: Arc<dyn SecurityEventLog>,
}

impl Default for SecureProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecureProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureProcessRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Messages from the reader and waiter threads to the supervising thread.
enum Event {
    Output(Vec<u8>),
    OutputClosed,
    Exited {
        status: std::io::Result<ExitStatus>,
        natural: bool,
    },
}

/// The shared "has finished" flag. Whoever claims it first decides whether
/// the run completed naturally or timed out.
#[derive(Debug, Default)]
struct Completion(AtomicBool);

impl Completion {
    fn claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// How the exit was observed.
struct Exit {
    status: std::io::Result<ExitStatus>,
    natural: bool,
}

impl SecureProcessRunner {
    /// Creates a runner with default configuration that audits to `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default(), Arc::new(TracingEventLog))
    }

    /// Creates a runner with explicit configuration and audit sink.
    #[must_use]
    pub fn with_config(config: RunnerConfig, events: Arc<dyn SecurityEventLog>) -> Self {
        Self { config, events }
    }

    /// Returns the runner configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn events(&self) -> &Arc<dyn SecurityEventLog> {
        &self.events
    }

    /// Runs `request` to completion or timeout, streaming output to `sink`.
    ///
    /// # Errors
    ///
    /// Precondition failures are reported before anything is spawned:
    /// - `ExecutionError::UnsafeExecutablePath`
    /// - `ExecutionError::ExecutableNotFound`
    /// - `ExecutionError::UnsafeArgument`
    /// - `ExecutionError::UnsafeWorkingDirectory`
    ///
    /// After that, `ExecutionError::ProcessLaunchFailed` if the OS refuses to
    /// start the process and `ExecutionError::Io` if waiting on it fails.
    /// A non-zero exit or a timeout is a normal [`ProcessResult`].
    pub fn run(
        &self,
        request: &ExecutionRequest,
        sink: &mut dyn OutputSink,
    ) -> Result<ProcessResult, ExecutionError> {
        let executable = self.check_preconditions(request)?;
        debug!(program = %executable.display(), args = request.arguments().len(), "spawning process");

        let start = Instant::now();
        let (child, reader) = spawn(&executable, request)?;
        let child = Arc::new(Mutex::new(child));
        let completion = Arc::new(Completion::default());
        let (tx, rx) = mpsc::channel();

        let reader_handle = {
            let tx = tx.clone();
            thread::spawn(move || pump_output(reader, &tx))
        };
        let waiter_handle = {
            let child = Arc::clone(&child);
            let completion = Arc::clone(&completion);
            thread::spawn(move || wait_for_child(&child, &completion, &tx))
        };

        let mut captured = CapturedOutput::new(self.config.max_captured_output);
        let mut output_closed = false;
        // A timeout past the end of the clock means no deadline at all.
        let deadline = start.checked_add(request.timeout_duration());

        let mut exit = receive_until(&rx, deadline, true, sink, &mut captured, &mut output_closed);
        let stop_requested = exit.is_none() && sink.wants_stop();

        if exit.is_none() {
            // Timer fired or the sink asked to stop. Signal while holding the
            // child lock so the waiter cannot reap between the claim and the
            // signal.
            let claimed = {
                let mut guard = lock(&child);
                let claimed = completion.claim();
                if claimed {
                    terminate::request_stop(&mut guard);
                }
                claimed
            };

            if claimed && stop_requested {
                debug!(program = %executable.display(), "output sink requested stop, terminating");
            } else if claimed {
                warn!(
                    program = %executable.display(),
                    timeout_ms = request.timeout_duration().as_millis(),
                    "process timed out, terminating"
                );
                self.events.log(SecurityEvent::warning(
                    EventKind::Timeout,
                    format!(
                        "{} exceeded timeout of {:?}",
                        executable.display(),
                        request.timeout_duration()
                    ),
                ));
            }

            if claimed {
                let grace_deadline = Instant::now().checked_add(self.config.grace_period);
                exit = receive_until(
                    &rx,
                    grace_deadline,
                    false,
                    sink,
                    &mut captured,
                    &mut output_closed,
                );
                if exit.is_none() {
                    warn!(program = %executable.display(), "grace period elapsed, killing");
                    terminate::force_kill(&mut lock(&child));
                }
            }

            if exit.is_none() {
                exit = receive_until(&rx, None, false, sink, &mut captured, &mut output_closed);
            }
        }

        let _ = waiter_handle.join();

        let Some(exit) = exit else {
            return Err(ExecutionError::Io(std::io::Error::other(
                "process supervisor stopped without an exit status",
            )));
        };
        let status = exit.status?;

        if !output_closed {
            let drain_deadline = Instant::now().checked_add(self.config.drain_timeout);
            drain(&rx, drain_deadline, sink, &mut captured, &mut output_closed);
        }
        if output_closed {
            let _ = reader_handle.join();
        } else {
            debug!(program = %executable.display(), "output pipe still open after exit, detaching reader");
        }

        let (output, output_truncated) = captured.finish();
        let result = ProcessResult {
            exit_code: status.code(),
            signal: exit_signal(status),
            output,
            output_truncated,
            timed_out: !exit.natural && !stop_requested,
            stopped: !exit.natural && stop_requested,
            duration: start.elapsed(),
        };

        info!(program = %executable.display(), "{}", result.summary());
        self.events.log(SecurityEvent::info(
            EventKind::ProcessExecution,
            format!("{}: {}", executable.display(), result.summary()),
        ));

        Ok(result)
    }

    fn check_preconditions(&self, request: &ExecutionRequest) -> Result<PathBuf, ExecutionError> {
        let executable = match resolve_executable(request.program()) {
            Ok(path) => path,
            Err(err) => {
                self.reject(EventKind::PathValidation, &err);
                return Err(err);
            }
        };

        for (index, argument) in request.arguments().iter().enumerate() {
            if !is_path_safe(argument) {
                let err = ExecutionError::UnsafeArgument {
                    index,
                    argument: argument.clone(),
                };
                self.reject(EventKind::PathValidation, &err);
                return Err(err);
            }
        }

        if let Some(dir) = request.working_dir() {
            let safe = dir.to_str().is_some_and(is_path_safe) && dir.is_dir();
            if !safe {
                let err = ExecutionError::UnsafeWorkingDirectory {
                    path: dir.to_path_buf(),
                };
                self.reject(EventKind::PathValidation, &err);
                return Err(err);
            }
        }

        Ok(executable)
    }

    fn reject(&self, kind: EventKind, err: &ExecutionError) {
        warn!(error = %err, "refusing to run process");
        self.events.log(SecurityEvent::error(kind, err.to_string()));
    }
}

/// Validates the program path and resolves bare names through `PATH`.
fn resolve_executable(program: &Path) -> Result<PathBuf, ExecutionError> {
    let unsafe_path = || ExecutionError::UnsafeExecutablePath {
        path: program.to_path_buf(),
    };
    let not_found = || ExecutionError::ExecutableNotFound {
        path: program.to_path_buf(),
    };

    let text = program.to_str().ok_or_else(unsafe_path)?;
    if text.is_empty() || !is_path_safe(text) {
        return Err(unsafe_path());
    }

    let is_bare_name = !program.is_absolute() && program.components().count() == 1;
    let candidate = if is_bare_name {
        which::which(program).map_err(|_| not_found())?
    } else {
        program.to_path_buf()
    };

    let metadata = fs::metadata(&candidate).map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(not_found());
        }
    }

    Ok(candidate)
}

/// Spawns the child with stdout and stderr sharing one pipe.
fn spawn(executable: &Path, request: &ExecutionRequest) -> Result<(Child, PipeReader), ExecutionError> {
    let launch_failed = |source| ExecutionError::ProcessLaunchFailed {
        program: executable.to_path_buf(),
        source,
    };

    let (reader, writer) = std::io::pipe().map_err(launch_failed)?;
    let writer_for_stderr = writer.try_clone().map_err(launch_failed)?;

    // `command` holds the parent's copies of the write end; it is dropped at
    // the end of this function so the reader sees EOF once the child exits.
    let mut command = Command::new(executable);
    command
        .args(request.arguments())
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_for_stderr);
    for (key, value) in request.env_overrides() {
        command.env(key, value);
    }
    if let Some(dir) = request.working_dir() {
        command.current_dir(dir);
    }
    terminate::isolate(&mut command);

    let child = command.spawn().map_err(launch_failed)?;
    Ok((child, reader))
}

fn pump_output(mut reader: PipeReader, tx: &mpsc::Sender<Event>) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Event::Output(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(error = %e, "output pipe read failed");
                break;
            }
        }
    }
    let _ = tx.send(Event::OutputClosed);
}

fn wait_for_child(child: &Mutex<Child>, completion: &Completion, tx: &mpsc::Sender<Event>) {
    loop {
        let polled = {
            let mut guard = lock(child);
            match guard.try_wait() {
                Ok(Some(status)) => Some((Ok(status), completion.claim())),
                Ok(None) => None,
                Err(e) => Some((Err(e), completion.claim())),
            }
        };
        if let Some((status, natural)) = polled {
            let _ = tx.send(Event::Exited { status, natural });
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Forwards output until the exit event arrives or `deadline` passes.
/// `None` waits without limit. With `stoppable`, also returns early once
/// the sink wants to stop.
fn receive_until(
    rx: &Receiver<Event>,
    deadline: Option<Instant>,
    stoppable: bool,
    sink: &mut dyn OutputSink,
    captured: &mut CapturedOutput,
    output_closed: &mut bool,
) -> Option<Exit> {
    loop {
        let event = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return None;
                }
                match rx.recv_timeout(remaining) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                        return None;
                    }
                }
            }
            None => rx.recv().ok()?,
        };

        match event {
            Event::Output(chunk) => {
                sink.on_output(&chunk);
                captured.push(&chunk);
                if stoppable && sink.wants_stop() {
                    return None;
                }
            }
            Event::OutputClosed => *output_closed = true,
            Event::Exited { status, natural } => return Some(Exit { status, natural }),
        }
    }
}

/// Collects output still buffered after exit.
fn drain(
    rx: &Receiver<Event>,
    deadline: Option<Instant>,
    sink: &mut dyn OutputSink,
    captured: &mut CapturedOutput,
    output_closed: &mut bool,
) {
    while !*output_closed {
        let next = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return;
                }
                rx.recv_timeout(remaining)
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(Event::Output(chunk)) => {
                sink.on_output(&chunk);
                captured.push(&chunk);
            }
            Ok(Event::OutputClosed) => *output_closed = true,
            Ok(Event::Exited { .. }) => {}
            Err(_) => return,
        }
    }
}

fn lock(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
