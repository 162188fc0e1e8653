//! Test utilities: fake host tools and placeholder archives.
//!
//! The fake tools are `/bin/sh` scripts that print a scripted member list
//! and materialize that list on extraction, so validation and extraction
//! can be exercised without real archives or an `unzip` binary. Every
//! invocation is appended to a counter file for single-flight assertions.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fmt::Write as _;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::host::ARCHIVE_PLACEHOLDER;
use crate::host::DEST_PLACEHOLDER;
use crate::host::HostTools;
use crate::host::ToolCommand;
use crate::inspection::ListingFormat;
use crate::security::check_member_name;

/// Writes an executable `/bin/sh` script and returns its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Creates a placeholder archive of exactly `size` bytes.
pub fn write_archive_file(dir: &Path, name: &str, size: u64) -> PathBuf {
    let path = dir.join(name);
    let file = fs::File::create(&path).unwrap();
    file.set_len(size).unwrap();
    path
}

/// Scripted listing and extraction tools.
///
/// # Examples
///
/// ```
/// use packsafe_core::test_utils::FakeTools;
///
/// let temp = tempfile::tempdir().unwrap();
/// let tools = FakeTools::new(temp.path())
///     .member("MyPack/", 0)
///     .member("MyPack/model.obj", 4096)
///     .host_tools();
/// assert!(tools.list.program.exists());
/// ```
#[derive(Debug, Clone)]
pub struct FakeTools {
    dir: PathBuf,
    members: Vec<(String, u64)>,
    nested: Vec<(String, Vec<(String, u64)>)>,
    extract_delay: Option<Duration>,
    fail_list: bool,
    fail_extract: bool,
    extra_extract: String,
}

impl FakeTools {
    /// Tools whose scripts live in `<dir>/fake-tools`.
    pub fn new(dir: &Path) -> Self {
        let dir = dir.join("fake-tools");
        fs::create_dir_all(&dir).unwrap();
        Self {
            dir,
            members: Vec::new(),
            nested: Vec::new(),
            extract_delay: None,
            fail_list: false,
            fail_extract: false,
            extra_extract: String::new(),
        }
    }

    /// Adds a member to the outer archive. Names ending in `/` are
    /// directories.
    #[must_use]
    pub fn member(mut self, name: &str, size: u64) -> Self {
        self.members.push((name.to_string(), size));
        self
    }

    /// Scripts the contents of a nested archive, matched by file name.
    #[must_use]
    pub fn nested(mut self, archive_name: &str, members: &[(&str, u64)]) -> Self {
        self.nested.push((
            archive_name.to_string(),
            members
                .iter()
                .map(|(name, size)| ((*name).to_string(), *size))
                .collect(),
        ));
        self
    }

    /// Makes every extraction sleep before writing files.
    #[must_use]
    pub fn extract_delay(mut self, delay: Duration) -> Self {
        self.extract_delay = Some(delay);
        self
    }

    /// Makes the listing tool exit with status 9.
    #[must_use]
    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Makes the extraction tool exit with status 2 after writing files.
    #[must_use]
    pub fn failing_extract(mut self) -> Self {
        self.fail_extract = true;
        self
    }

    /// Appends raw shell to the outer extraction, run with `$dest` set.
    #[must_use]
    pub fn extract_shell(mut self, body: &str) -> Self {
        self.extra_extract.push_str(body);
        self.extra_extract.push('\n');
        self
    }

    /// Writes the scripts and returns host tools that use them.
    pub fn host_tools(&self) -> HostTools {
        let list = write_script(&self.dir, "list.sh", &self.list_script());
        let extract = write_script(&self.dir, "extract.sh", &self.extract_script());
        HostTools::default()
            .with_list(
                ToolCommand::new(list, [ARCHIVE_PLACEHOLDER]),
                ListingFormat::SizeName,
            )
            .with_extract(ToolCommand::new(
                extract,
                [ARCHIVE_PLACEHOLDER, DEST_PLACEHOLDER],
            ))
    }

    /// Number of times the listing tool ran.
    pub fn list_invocations(&self) -> usize {
        count_lines(&self.dir.join("list.count"))
    }

    /// Number of times the extraction tool ran.
    pub fn extract_invocations(&self) -> usize {
        count_lines(&self.dir.join("extract.count"))
    }

    fn list_script(&self) -> String {
        let mut script = format!("echo \"$1\" >> {}\n", quote(&self.dir.join("list.count")));
        if self.fail_list {
            script.push_str("echo 'error: invalid zip file' >&2\nexit 9\n");
            return script;
        }
        script.push_str("case \"$(basename \"$1\")\" in\n");
        for (name, members) in &self.nested {
            let _ = writeln!(script, "  {})", quote_str(name));
            script.push_str(&listing_heredoc(members));
            script.push_str("    ;;\n");
        }
        script.push_str("  *)\n");
        script.push_str(&listing_heredoc(&self.members));
        script.push_str("    ;;\nesac\n");
        script
    }

    fn extract_script(&self) -> String {
        let mut script = format!("echo \"$1\" >> {}\n", quote(&self.dir.join("extract.count")));
        script.push_str("dest=\"$2\"\nmkdir -p \"$dest\"\n");
        if let Some(delay) = self.extract_delay {
            let _ = writeln!(script, "sleep {:.3}", delay.as_secs_f64());
        }
        script.push_str("case \"$(basename \"$1\")\" in\n");
        for (name, members) in &self.nested {
            let _ = writeln!(script, "  {})", quote_str(name));
            script.push_str(&materialize(members));
            script.push_str("    ;;\n");
        }
        script.push_str("  *)\n");
        script.push_str(&materialize(&self.members));
        script.push_str(&self.extra_extract);
        script.push_str("    ;;\nesac\n");
        if self.fail_extract {
            script.push_str("echo 'error: disk full' >&2\nexit 2\n");
        }
        script
    }
}

fn listing_heredoc(members: &[(String, u64)]) -> String {
    let mut out = String::from("    cat <<'PACKSAFE_EOF'\n");
    for (name, size) in members {
        let _ = writeln!(out, "{size} {name}");
    }
    out.push_str("PACKSAFE_EOF\n");
    out
}

/// Shell lines creating each member under `$dest`. Unsafe names are never
/// written.
fn materialize(members: &[(String, u64)]) -> String {
    let mut out = String::new();
    for (name, size) in members {
        if check_member_name(name).is_err() {
            continue;
        }
        let target = format!("\"$dest\"/{}", quote_str(name.trim_end_matches('/')));
        if name.ends_with('/') {
            let _ = writeln!(out, "    mkdir -p {target}");
        } else {
            let _ = writeln!(out, "    mkdir -p \"$(dirname {target})\"");
            let _ = writeln!(out, "    head -c {size} /dev/zero > {target}");
        }
    }
    out
}

fn quote(path: &Path) -> String {
    quote_str(&path.to_string_lossy())
}

fn quote_str(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn count_lines(path: &Path) -> usize {
    fs::read_to_string(path).map_or(0, |contents| contents.lines().count())
}
