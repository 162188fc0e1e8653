//! Execution request type.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Timeout used when a request does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A fully described external program invocation.
///
/// Built with consuming `with_*`-style methods, then handed to
/// [`SecureProcessRunner::run`](super::SecureProcessRunner::run) by
/// reference. Arguments are passed as a discrete vector and never
/// interpreted by a shell.
///
/// # Examples
///
/// ```
/// use packsafe_core::process::ExecutionRequest;
/// use std::time::Duration;
///
/// let request = ExecutionRequest::new("blender")
///     .arg("--background")
///     .args(["--python", "build_cabinet.py"])
///     .env("BLENDER_USER_CONFIG", "/tmp/blender")
///     .timeout(Duration::from_secs(600));
///
/// assert_eq!(request.arguments().len(), 3);
/// assert_eq!(request.timeout_duration(), Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ExecutionRequest {
    /// Creates a request for `program` with no arguments and
    /// [`DEFAULT_TIMEOUT`].
    ///
    /// A bare program name (single component, not absolute) is resolved
    /// through `PATH` at run time.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides one environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the child's working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the wall-clock timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the program as requested (before `PATH` resolution).
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the argument vector.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Returns the environment overrides in insertion order.
    #[must_use]
    pub fn env_overrides(&self) -> &[(String, String)] {
        &self.env
    }

    /// Returns the working directory, if set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Returns the wall-clock timeout.
    #[must_use]
    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Short description for logs: program plus argument count.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} ({} args)", self.program.display(), self.args.len())
    }
}
