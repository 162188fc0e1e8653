//! Post-extraction audit of the extracted tree.
//!
//! The listing the validator saw is only a claim about the archive. After the
//! host tool has written files, the tree on disk is walked once more: symlinks
//! must stay inside the extraction directory and the real totals must respect
//! the same limits.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::ExtractionError;
use crate::Result;
use crate::ValidationLimits;

/// What the audit found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditSummary {
    /// Regular files.
    pub files: usize,
    /// Directories below the root.
    pub directories: usize,
    /// Symlinks that resolve inside the root.
    pub symlinks: usize,
    /// Sum of regular file sizes.
    pub total_size: u64,
}

impl AuditSummary {
    /// Every entry below the root: files, directories and symlinks.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.files + self.directories + self.symlinks
    }
}

/// Walks `root` without following links and enforces `limits`.
///
/// # Errors
///
/// Returns [`ExtractionError::AuditFailed`] for a symlink that points outside
/// `root` or for on-disk counts above the limits, and
/// [`ExtractionError::Io`] if the tree cannot be read.
pub fn audit_tree(root: &Path, limits: &ValidationLimits) -> Result<AuditSummary> {
    let root = root.canonicalize()?;
    let mut summary = AuditSummary::default();

    for entry in WalkDir::new(&root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .map_or_else(|| audit_failed("filesystem loop in extracted tree"), ExtractionError::Io)
        })?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            check_symlink(&root, entry.path())?;
            summary.symlinks += 1;
            continue;
        }

        if file_type.is_dir() {
            summary.directories += 1;
            continue;
        }

        let size = entry.metadata().map_err(|e| {
            e.into_io_error()
                .map_or_else(|| audit_failed("unreadable entry"), ExtractionError::Io)
        })?.len();

        summary.files += 1;
        summary.total_size = summary.total_size.saturating_add(size);

        if size > limits.max_entry_size {
            return Err(audit_failed(format!(
                "{} is {size} bytes on disk (limit {})",
                entry.path().display(),
                limits.max_entry_size
            )));
        }
    }

    if summary.entries() > limits.max_entries {
        return Err(audit_failed(format!(
            "{} entries on disk (limit {})",
            summary.entries(),
            limits.max_entries
        )));
    }
    if summary.total_size > limits.max_total_size {
        return Err(audit_failed(format!(
            "{} bytes on disk (limit {})",
            summary.total_size, limits.max_total_size
        )));
    }

    Ok(summary)
}

fn check_symlink(root: &Path, link: &Path) -> Result<()> {
    let target = std::fs::read_link(link)?;
    let parent = link.parent().unwrap_or(root);
    let resolved = if target.is_absolute() {
        target.clone()
    } else {
        parent.join(&target)
    };

    let inside = match resolved.canonicalize() {
        Ok(real) => real.starts_with(root),
        // Dangling: judge the literal path.
        Err(_) => normalize(&resolved).is_some_and(|p| p.starts_with(root)),
    };

    if inside {
        Ok(())
    } else {
        Err(audit_failed(format!(
            "symlink {} points outside the extraction directory ({})",
            link.display(),
            target.display()
        )))
    }
}

/// Lexically resolves `.` and `..`; `None` if `..` climbs past the root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    Some(out)
}

fn audit_failed(reason: impl Into<String>) -> ExtractionError {
    ExtractionError::AuditFailed {
        reason: reason.into(),
    }
}
