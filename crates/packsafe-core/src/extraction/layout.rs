//! Post-extraction layout handling.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionConfig;

/// Top-level entries of `dir` that are not hidden or metadata artifacts,
/// sorted by name.
fn visible_entries(dir: &Path, config: &ExtractionConfig) -> io::Result<Vec<(PathBuf, fs::FileType)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            entries.push((entry.path(), entry.file_type()?));
            continue;
        };
        if config.is_ignored_entry(name) {
            continue;
        }
        entries.push((entry.path(), entry.file_type()?));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Returns the directory callers should treat as the archive's content.
///
/// When the only visible top-level entry is a real directory (not a
/// symlink), that wrapper folder is returned; otherwise `dir` itself.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn effective_root(dir: &Path, config: &ExtractionConfig) -> io::Result<PathBuf> {
    let entries = visible_entries(dir, config)?;
    match entries.as_slice() {
        [(path, file_type)] if file_type.is_dir() => Ok(path.clone()),
        _ => Ok(dir.to_path_buf()),
    }
}

/// Regular files at the top level of `dir` that name nested archives.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn nested_archives(dir: &Path, config: &ExtractionConfig) -> io::Result<Vec<PathBuf>> {
    Ok(visible_entries(dir, config)?
        .into_iter()
        .filter(|(path, file_type)| {
            file_type.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| config.is_nested_archive(name))
        })
        .map(|(path, _)| path)
        .collect())
}

/// Directory a nested archive is expanded into: a sibling named after the
/// archive's stem, or `<stem>-contents` when that name is taken.
#[must_use]
pub fn nested_target(archive: &Path) -> Option<PathBuf> {
    let parent = archive.parent()?;
    let stem = archive.file_stem()?.to_str()?;
    let preferred = parent.join(stem);
    if fs::symlink_metadata(&preferred).is_err() {
        return Some(preferred);
    }
    let alternate = parent.join(format!("{stem}-contents"));
    fs::symlink_metadata(&alternate).is_err().then_some(alternate)
}
