//! Scratch directory management for extractions.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::Hash;
use std::hash::Hasher;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::security::is_valid_filename;

/// Fallback scratch name for archives whose stem is unusable.
const FALLBACK_STEM: &str = "archive";

/// The directory all extractions of one cache live under.
///
/// Nothing is created until the first extraction, so a workspace that was
/// never used leaves no trace and [`remove`](Self::remove) is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionWorkspace {
    root: PathBuf,
}

impl ExtractionWorkspace {
    /// Creates a workspace rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A per-process workspace under the system temporary directory.
    #[must_use]
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(format!("packsafe-{}", std::process::id())))
    }

    /// Workspace root as configured.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the scratch directory name used for `archive`.
    ///
    /// `<stem>-<8 hex digits>`, where the digits hash the full archive path
    /// so two archives with the same file name never share a directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use packsafe_core::extraction::ExtractionWorkspace;
    /// use std::path::Path;
    ///
    /// let a = ExtractionWorkspace::scratch_name(Path::new("/downloads/Pack.zip"));
    /// let b = ExtractionWorkspace::scratch_name(Path::new("/desktop/Pack.zip"));
    /// assert!(a.starts_with("Pack-"));
    /// assert_ne!(a, b);
    /// ```
    #[must_use]
    pub fn scratch_name(archive: &Path) -> String {
        let stem = archive
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.trim_start_matches('.'))
            .filter(|stem| is_valid_filename(stem))
            .unwrap_or(FALLBACK_STEM);

        let mut hasher = DefaultHasher::new();
        archive.hash(&mut hasher);
        let digest = hasher.finish();

        format!("{stem}-{:08x}", digest & 0xffff_ffff)
    }

    /// Creates a fresh, empty scratch directory for `archive`.
    ///
    /// A leftover directory from a previous run is removed first, so an
    /// extraction never merges with stale content.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be created, is not writable,
    /// or the stale directory cannot be removed.
    pub fn prepare_scratch(&self, archive: &Path) -> io::Result<PathBuf> {
        let root = self.ensure_root()?;
        let scratch = root.join(Self::scratch_name(archive));
        remove_if_present(&scratch)?;
        fs::create_dir(&scratch)?;
        Ok(scratch)
    }

    /// Removes the workspace and everything in it.
    ///
    /// Returns `false` when there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn remove(&self) -> io::Result<bool> {
        remove_if_present(&self.root)
    }

    /// Creates the root if needed and checks that it is a writable directory.
    fn ensure_root(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let canonical = self.root.canonicalize()?;

        if !canonical.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("workspace is not a directory: {}", canonical.display()),
            ));
        }

        #[cfg(unix)]
        check_writable(&canonical)?;

        Ok(canonical)
    }
}

/// Removes a file or directory tree; symlinks are unlinked, never followed.
pub(crate) fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|()| true),
        Ok(_) => fs::remove_file(path).map(|()| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn check_writable(dir: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"))?;

    // SAFETY: access() only reads the NUL-terminated string, which outlives
    // the call.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::access(c_path.as_ptr(), libc::W_OK) };

    if rc != 0 {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("workspace is not writable: {}", dir.display()),
        ));
    }
    Ok(())
}
