//! Limits and tunables for validation, execution and extraction.

use std::time::Duration;

/// Member extensions accepted without a warning.
///
/// Covers 3D model, image, video, audio and plain-text/config formats plus
/// `zip` for nested packs.
#[rustfmt::skip]
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    // 3D models
    "3ds", "blend", "dae", "fbx", "glb", "gltf", "mtl", "obj", "ply", "stl",
    "usd", "usda", "usdc", "usdz",
    // images
    "bmp", "dds", "exr", "gif", "hdr", "jpeg", "jpg", "png", "psd", "svg",
    "tga", "tif", "tiff", "webp",
    // video
    "avi", "m4v", "mkv", "mov", "mp4", "webm",
    // audio
    "aac", "flac", "m4a", "mp3", "ogg", "wav",
    // text and config
    "cfg", "csv", "ini", "json", "md", "plist", "txt", "xml", "yaml", "yml",
    // nested packs
    "zip",
];

/// Resource and safety limits applied by
/// [`ArchiveValidator`](crate::ArchiveValidator) before any extraction.
///
/// # Examples
///
/// ```
/// use packsafe_core::ValidationLimits;
///
/// let limits = ValidationLimits {
///     max_entries: 500,
///     ..Default::default()
/// };
/// assert_eq!(limits.max_compression_ratio, 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    /// Maximum number of archive members.
    pub max_entries: usize,

    /// Maximum aggregate uncompressed size in bytes. Also bounds the
    /// on-disk archive size.
    pub max_total_size: u64,

    /// Maximum uncompressed size of a single member in bytes.
    pub max_entry_size: u64,

    /// Maximum uncompressed/compressed ratio.
    pub max_compression_ratio: f64,

    /// Expected member extensions, lowercase without the dot. Members outside
    /// the list produce warnings, never rejections. Empty means no warnings.
    pub allowed_extensions: Vec<String>,

    /// Timeout for one invocation of the listing tool.
    pub listing_timeout: Duration,
}

impl Default for ValidationLimits {
    /// Default values:
    /// - `max_entries`: 10,000
    /// - `max_total_size`: 10 GiB
    /// - `max_entry_size`: 2 GiB
    /// - `max_compression_ratio`: 100.0
    /// - `allowed_extensions`: [`DEFAULT_ALLOWED_EXTENSIONS`]
    /// - `listing_timeout`: 30 s
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_total_size: 10 * 1024 * 1024 * 1024,
            max_entry_size: 2 * 1024 * 1024 * 1024,
            max_compression_ratio: 100.0,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            listing_timeout: Duration::from_secs(30),
        }
    }
}

impl ValidationLimits {
    /// Returns whether a member extension is expected.
    ///
    /// Comparison is case-insensitive so `Texture.PNG` is not flagged.
    #[must_use]
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        self.allowed_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Tunables for [`SecureProcessRunner`](crate::process::SecureProcessRunner).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Time between the polite termination signal and the forced kill.
    pub grace_period: Duration,

    /// Upper bound on output kept in [`ProcessResult::output`]. The output
    /// sink still receives every chunk.
    ///
    /// [`ProcessResult::output`]: crate::process::ProcessResult::output
    pub max_captured_output: usize,

    /// How long to keep draining output after the process exits, for pipes
    /// held open by stray descendants.
    pub drain_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(1),
            max_captured_output: 16 * 1024 * 1024,
            drain_timeout: Duration::from_millis(500),
        }
    }
}

/// Settings for [`ArchiveExtractionCache`](crate::extraction::ArchiveExtractionCache).
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Timeout for one invocation of the extraction tool.
    pub extraction_timeout: Duration,

    /// Extensions treated as nested archives after extraction.
    pub nested_archive_extensions: Vec<String>,

    /// How many levels of archives-within-archives are expanded.
    /// `0` disables nested extraction.
    pub max_nesting_depth: usize,

    /// Top-level names ignored when detecting a single wrapper folder.
    pub ignored_entries: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: Duration::from_secs(300),
            nested_archive_extensions: vec!["zip".to_string()],
            max_nesting_depth: 2,
            ignored_entries: vec![
                "__MACOSX".to_string(),
                "Thumbs.db".to_string(),
                "desktop.ini".to_string(),
            ],
        }
    }
}

impl ExtractionConfig {
    /// Returns whether `file_name` names a nested archive.
    #[must_use]
    pub fn is_nested_archive(&self, file_name: &str) -> bool {
        file_name.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && self
                    .nested_archive_extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
    }

    /// Returns whether a top-level entry is a hidden or metadata-only
    /// artifact.
    #[must_use]
    pub fn is_ignored_entry(&self, file_name: &str) -> bool {
        file_name.starts_with('.')
            || self
                .ignored_entries
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(file_name))
    }
}
