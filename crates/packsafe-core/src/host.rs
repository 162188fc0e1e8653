//! Host capabilities for listing and extracting archives.
//!
//! The core never decompresses anything in process. Both capabilities are
//! external programs described by a [`ToolCommand`] template and run through
//! [`SecureProcessRunner`](crate::process::SecureProcessRunner).

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::inspection::ListingFormat;
use crate::process::ExecutionRequest;

/// Placeholder replaced by the archive path.
pub const ARCHIVE_PLACEHOLDER: &str = "{archive}";

/// Placeholder replaced by the destination directory.
pub const DEST_PLACEHOLDER: &str = "{dest}";

/// A tool template could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolTemplateError {
    /// The template has no program.
    #[error("tool command is empty")]
    Empty,

    /// A required placeholder is absent.
    #[error("tool command must contain {0}")]
    MissingPlaceholder(&'static str),
}

/// Program plus argument template.
///
/// Arguments may contain [`ARCHIVE_PLACEHOLDER`] and [`DEST_PLACEHOLDER`],
/// substituted verbatim at run time. Substituted values become single argv
/// elements; nothing is word-split or shell-interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program path or bare name resolved through `PATH`.
    pub program: PathBuf,
    /// Argument templates.
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Creates a command from a program and argument templates.
    #[must_use]
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a whitespace-separated template such as
    /// `"unzip -l {archive}"`, requiring each of `required` to appear.
    ///
    /// # Errors
    ///
    /// Returns [`ToolTemplateError`] for an empty template or a missing
    /// placeholder.
    ///
    /// # Examples
    ///
    /// ```
    /// use packsafe_core::host::ARCHIVE_PLACEHOLDER;
    /// use packsafe_core::host::ToolCommand;
    ///
    /// let tool = ToolCommand::parse("bsdtar -tvf {archive}", &[ARCHIVE_PLACEHOLDER]).unwrap();
    /// assert_eq!(tool.args, ["-tvf", "{archive}"]);
    /// ```
    pub fn parse(template: &str, required: &[&'static str]) -> Result<Self, ToolTemplateError> {
        let mut words = template.split_whitespace();
        let program = words.next().ok_or(ToolTemplateError::Empty)?;
        let tool = Self::new(program, words);
        for placeholder in required {
            if !tool.args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(ToolTemplateError::MissingPlaceholder(placeholder));
            }
        }
        Ok(tool)
    }

    /// Builds an execution request with placeholders substituted.
    ///
    /// Paths starting with `-` are passed as `./-...` so the tool cannot
    /// read them as options.
    #[must_use]
    pub fn request(&self, archive: &str, dest: Option<&str>, timeout: Duration) -> ExecutionRequest {
        let archive = operand(archive);
        let dest = dest.map(operand);
        let args = self.args.iter().map(|arg| {
            let arg = arg.replace(ARCHIVE_PLACEHOLDER, &archive);
            match &dest {
                Some(dest) => arg.replace(DEST_PLACEHOLDER, dest),
                None => arg,
            }
        });
        ExecutionRequest::new(&self.program)
            .args(args)
            .timeout(timeout)
    }
}

fn operand(path: &str) -> Cow<'_, str> {
    if path.starts_with('-') {
        Cow::Owned(format!("./{path}"))
    } else {
        Cow::Borrowed(path)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The listing and extraction capabilities of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTools {
    /// Lists members without extracting; must contain `{archive}`.
    pub list: ToolCommand,
    /// Layout of the listing tool's output.
    pub list_format: ListingFormat,
    /// Extracts into a directory; must contain `{archive}` and `{dest}`.
    pub extract: ToolCommand,
}

impl Default for HostTools {
    /// `unzip -l {archive}` and `unzip -qq -o {archive} -d {dest}`.
    fn default() -> Self {
        Self {
            list: ToolCommand::new("unzip", ["-l", ARCHIVE_PLACEHOLDER]),
            list_format: ListingFormat::UnzipTable,
            extract: ToolCommand::new(
                "unzip",
                ["-qq", "-o", ARCHIVE_PLACEHOLDER, "-d", DEST_PLACEHOLDER],
            ),
        }
    }
}

impl HostTools {
    /// Replaces the listing tool.
    #[must_use]
    pub fn with_list(mut self, list: ToolCommand, format: ListingFormat) -> Self {
        self.list = list;
        self.list_format = format;
        self
    }

    /// Replaces the extraction tool.
    #[must_use]
    pub fn with_extract(mut self, extract: ToolCommand) -> Self {
        self.extract = extract;
        self
    }
}
