//! Validated, cached extraction of archives into a scratch workspace.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::audit::AuditSummary;
use super::audit::audit_tree;
use super::layout::effective_root;
use super::layout::nested_archives;
use super::layout::nested_target;
use super::workspace::ExtractionWorkspace;
use super::workspace::remove_if_present;
use crate::ArchiveValidator;
use crate::ExtractionConfig;
use crate::ExtractionError;
use crate::Result;
use crate::ValidationFailure;
use crate::ValidationLimits;
use crate::events::EventKind;
use crate::events::SecurityEvent;
use crate::events::SecurityEventLog;
use crate::process::NoopOutput;
use crate::process::OutputSink;

/// Lines of tool output kept in [`ExtractionError::ExtractionFailed`].
const OUTPUT_TAIL_LINES: usize = 10;

/// What the outer archive's limits still allow once its own contents are
/// on disk. Shared by every nested archive at every depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NestedBudget {
    entries: usize,
    bytes: u64,
}

impl NestedBudget {
    fn remaining(limits: &ValidationLimits, used: &AuditSummary) -> Self {
        Self {
            entries: limits.max_entries.saturating_sub(used.entries()),
            bytes: limits.max_total_size.saturating_sub(used.total_size),
        }
    }

    /// The target directory takes one entry, so at least two are needed.
    fn is_exhausted(&self) -> bool {
        self.entries < 2 || self.bytes == 0
    }

    /// Limits for one nested archive: the base limits capped to what is left.
    fn limits(&self, base: &ValidationLimits) -> ValidationLimits {
        ValidationLimits {
            max_entries: self.entries.saturating_sub(1).min(base.max_entries),
            max_total_size: self.bytes.min(base.max_total_size),
            ..base.clone()
        }
    }

    /// Charges the target directory plus what was written below it.
    fn charge(&mut self, written: &AuditSummary) {
        self.entries = self.entries.saturating_sub(written.entries() + 1);
        self.bytes = self.bytes.saturating_sub(written.total_size);
    }
}

/// A completed extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCacheEntry {
    /// Archive path as passed to the cache.
    pub source: PathBuf,
    /// Scratch directory the archive was extracted into.
    pub scratch_dir: PathBuf,
    /// Directory handed to callers: the scratch directory or its single
    /// wrapper folder.
    pub extracted_dir: PathBuf,
}

/// Extracts validated archives once and hands out the resulting directory.
///
/// Entries are keyed by the archive path exactly as given. A repeated call
/// for the same path returns the cached directory as long as it still
/// exists; concurrent calls for the same path run the extraction tool once
/// and all observe the same result.
///
/// # Examples
///
/// ```no_run
/// use packsafe_core::ArchiveValidator;
/// use packsafe_core::extraction::ArchiveExtractionCache;
/// use packsafe_core::process::SecureProcessRunner;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let validator = ArchiveValidator::new(SecureProcessRunner::new());
/// let cache = ArchiveExtractionCache::new(validator, "/tmp/packsafe-work");
///
/// let dir = cache.extract_for_processing("Arcade Pack.zip")?;
/// println!("assets in {}", dir.display());
///
/// cache.cleanup()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArchiveExtractionCache {
    validator: ArchiveValidator,
    config: ExtractionConfig,
    workspace: ExtractionWorkspace,
    entries: Mutex<HashMap<PathBuf, ExtractionCacheEntry>>,
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ArchiveExtractionCache {
    /// Creates a cache that extracts under `workspace_root`.
    #[must_use]
    pub fn new(validator: ArchiveValidator, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            validator,
            config: ExtractionConfig::default(),
            workspace: ExtractionWorkspace::new(workspace_root),
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the extraction settings.
    #[must_use]
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// The workspace extractions are written to.
    #[must_use]
    pub fn workspace(&self) -> &ExtractionWorkspace {
        &self.workspace
    }

    /// The validator run before every extraction.
    #[must_use]
    pub fn validator(&self) -> &ArchiveValidator {
        &self.validator
    }

    /// Extraction settings.
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn events(&self) -> &Arc<dyn SecurityEventLog> {
        self.validator.runner().events()
    }

    /// Validates and extracts `archive_path`, returning the content
    /// directory.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::Rejected`] if validation fails; nothing is
    ///   written to the workspace
    /// - [`ExtractionError::Execution`] or
    ///   [`ExtractionError::ExtractionFailed`] if the extraction tool cannot
    ///   run or fails
    /// - [`ExtractionError::AuditFailed`] if the extracted tree breaks the
    ///   limits or contains escaping symlinks
    /// - [`ExtractionError::Io`] for workspace I/O failures
    ///
    /// On every error the scratch directory is removed and nothing is cached.
    pub fn extract_for_processing(&self, archive_path: impl AsRef<Path>) -> Result<PathBuf> {
        self.extract_with_output(archive_path, &mut NoopOutput)
    }

    /// Like [`extract_for_processing`](Self::extract_for_processing), but
    /// streams the extraction tool's output to `sink`.
    ///
    /// # Errors
    ///
    /// See [`extract_for_processing`](Self::extract_for_processing).
    pub fn extract_with_output(
        &self,
        archive_path: impl AsRef<Path>,
        sink: &mut dyn OutputSink,
    ) -> Result<PathBuf> {
        let archive_path = archive_path.as_ref();

        if let Some(dir) = self.cached(archive_path) {
            debug!(archive = %archive_path.display(), dir = %dir.display(), "extraction cache hit");
            return Ok(dir);
        }

        let key_lock = self.key_lock(archive_path);
        let result = {
            let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.extract_locked(archive_path, sink)
        };
        self.release_key(archive_path, &key_lock);
        result
    }

    fn extract_locked(&self, archive_path: &Path, sink: &mut dyn OutputSink) -> Result<PathBuf> {
        // The previous holder may have finished the same extraction.
        if let Some(dir) = self.cached(archive_path) {
            debug!(archive = %archive_path.display(), "extraction completed by concurrent caller");
            return Ok(dir);
        }

        let entry = self.extract_uncached(archive_path, sink)?;
        let dir = entry.extracted_dir.clone();
        self.lock_entries()
            .insert(archive_path.to_path_buf(), entry);
        Ok(dir)
    }

    /// Returns the cached directory for `archive_path` if it still exists.
    #[must_use]
    pub fn cached(&self, archive_path: &Path) -> Option<PathBuf> {
        self.lock_entries()
            .get(archive_path)
            .filter(|entry| entry.extracted_dir.is_dir())
            .map(|entry| entry.extracted_dir.clone())
    }

    /// Number of cached extractions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Drops the entry for `archive_path` and deletes its scratch directory.
    ///
    /// Returns `false` if there was no entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the scratch directory cannot be removed.
    pub fn invalidate(&self, archive_path: &Path) -> Result<bool> {
        let Some(entry) = self.lock_entries().remove(archive_path) else {
            return Ok(false);
        };
        remove_if_present(&entry.scratch_dir)?;
        self.events().log(SecurityEvent::info(
            EventKind::FileAccess,
            format!("removed extraction of {}", archive_path.display()),
        ));
        Ok(true)
    }

    /// Removes the whole workspace and forgets every entry.
    ///
    /// Safe to call when nothing was extracted. Per-archive locks of
    /// extractions still running are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace exists but cannot be removed.
    pub fn cleanup(&self) -> Result<()> {
        self.lock_entries().clear();

        if self.workspace.remove()? {
            info!(workspace = %self.workspace.root().display(), "extraction workspace removed");
            self.events().log(SecurityEvent::info(
                EventKind::FileAccess,
                format!(
                    "removed extraction workspace {}",
                    self.workspace.root().display()
                ),
            ));
        }
        Ok(())
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<PathBuf, ExtractionCacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Mutex<()>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key_lock(&self, archive_path: &Path) -> Arc<Mutex<()>> {
        Arc::clone(
            self.lock_in_flight()
                .entry(archive_path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drops the per-archive lock once no other caller holds or awaits it.
    /// Clones are only taken under the map lock, so the count is stable here.
    fn release_key(&self, archive_path: &Path, key_lock: &Arc<Mutex<()>>) {
        let mut in_flight = self.lock_in_flight();
        let idle = Arc::strong_count(key_lock) == 2
            && in_flight
                .get(archive_path)
                .is_some_and(|held| Arc::ptr_eq(held, key_lock));
        if idle {
            in_flight.remove(archive_path);
        }
    }

    fn extract_uncached(
        &self,
        archive_path: &Path,
        sink: &mut dyn OutputSink,
    ) -> Result<ExtractionCacheEntry> {
        let validation = self.validator.validate(archive_path);
        if let Some(failure) = validation.error {
            self.events().log(SecurityEvent::error(
                EventKind::ArchiveExtraction,
                format!("extraction refused for {}: {failure}", archive_path.display()),
            ));
            return Err(ExtractionError::Rejected(failure));
        }
        for warning in &validation.warnings {
            self.events().log(SecurityEvent::warning(
                EventKind::ArchiveExtraction,
                format!("{}: {warning}", archive_path.display()),
            ));
        }

        let scratch = self.workspace.prepare_scratch(archive_path)?;
        debug!(archive = %archive_path.display(), scratch = %scratch.display(), "extracting");

        match self.populate(archive_path, &scratch, sink) {
            Ok(extracted_dir) => {
                info!(
                    archive = %archive_path.display(),
                    dir = %extracted_dir.display(),
                    entries = validation.file_count,
                    "archive extracted"
                );
                self.events().log(SecurityEvent::info(
                    EventKind::ArchiveExtraction,
                    format!(
                        "extracted {} to {}",
                        archive_path.display(),
                        extracted_dir.display()
                    ),
                ));
                Ok(ExtractionCacheEntry {
                    source: archive_path.to_path_buf(),
                    scratch_dir: scratch,
                    extracted_dir,
                })
            }
            Err(err) => {
                if let Err(cleanup) = remove_if_present(&scratch) {
                    warn!(scratch = %scratch.display(), error = %cleanup, "failed to remove scratch directory");
                }
                self.events().log(SecurityEvent::error(
                    EventKind::ArchiveExtraction,
                    format!("extraction of {} failed: {err}", archive_path.display()),
                ));
                Err(err)
            }
        }
    }

    /// Runs the extraction tool, audits, normalizes and expands nested
    /// archives. Returns the effective content directory.
    fn populate(&self, archive: &Path, scratch: &Path, sink: &mut dyn OutputSink) -> Result<PathBuf> {
        let limits = self.validator.limits();
        self.run_extract_tool(archive, scratch, sink)?;
        let outer = audit_tree(scratch, limits)?;

        let content = effective_root(scratch, &self.config)?;
        if self.config.max_nesting_depth > 0 {
            let mut budget = NestedBudget::remaining(limits, &outer);
            self.expand_nested(&content, 1, &mut budget)?;
            audit_tree(scratch, limits)?;
        }
        Ok(content)
    }

    fn run_extract_tool(&self, archive: &Path, dest: &Path, sink: &mut dyn OutputSink) -> Result<()> {
        let archive_str = archive.to_str().ok_or_else(|| ValidationFailure::UnsafeArchivePath {
            path: archive.to_path_buf(),
        })?;
        let dest_str = dest.to_str().ok_or_else(|| ValidationFailure::UnsafeArchivePath {
            path: dest.to_path_buf(),
        })?;

        let request = self.validator.tools().extract.request(
            archive_str,
            Some(dest_str),
            self.config.extraction_timeout,
        );
        let result = self.validator.runner().run(&request, sink)?;

        if result.success() {
            Ok(())
        } else {
            Err(ExtractionError::ExtractionFailed {
                exit_code: result.exit_code,
                timed_out: result.timed_out,
                output: result.output_tail(OUTPUT_TAIL_LINES),
            })
        }
    }

    /// Expands archives found at the top level of `dir`. Each one is
    /// validated like an outer archive against what is left of `budget`;
    /// rejected or failing ones are logged and left in place.
    ///
    /// The extracted tree is audited before the next archive is considered,
    /// so the disk written never exceeds the outer limits.
    fn expand_nested(&self, dir: &Path, depth: usize, budget: &mut NestedBudget) -> Result<()> {
        for nested in nested_archives(dir, &self.config)? {
            if budget.is_exhausted() {
                warn!(archive = %nested.display(), "size budget exhausted, nested archive not expanded");
                self.events().log(SecurityEvent::warning(
                    EventKind::ArchiveExtraction,
                    format!(
                        "skipped nested archive {}: extraction size budget exhausted",
                        nested.display()
                    ),
                ));
                continue;
            }

            let limits = budget.limits(self.validator.limits());
            let validation = self.validator.clone().with_limits(limits.clone()).validate(&nested);
            if let Some(failure) = validation.error {
                warn!(archive = %nested.display(), error = %failure, "nested archive rejected");
                self.events().log(SecurityEvent::warning(
                    EventKind::ArchiveExtraction,
                    format!("skipped nested archive {}: {failure}", nested.display()),
                ));
                continue;
            }

            let Some(target) = nested_target(&nested) else {
                warn!(archive = %nested.display(), "no free directory name for nested archive");
                continue;
            };
            std::fs::create_dir(&target)?;

            if let Err(err) = self.run_extract_tool(&nested, &target, &mut NoopOutput) {
                warn!(archive = %nested.display(), error = %err, "nested extraction failed");
                self.events().log(SecurityEvent::warning(
                    EventKind::ArchiveExtraction,
                    format!("nested extraction of {} failed: {err}", nested.display()),
                ));
                remove_if_present(&target)?;
                continue;
            }

            let written = audit_tree(&target, &limits)?;
            budget.charge(&written);
            debug!(
                archive = %nested.display(),
                target = %target.display(),
                depth,
                bytes_left = budget.bytes,
                "nested archive extracted"
            );
            if depth < self.config.max_nesting_depth {
                let inner = effective_root(&target, &self.config)?;
                self.expand_nested(&inner, depth + 1, budget)?;
            }
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::field_reassign_with_default)]
mod tests {
    use super::*;
    use crate::ValidationLimits;
    use crate::events::MemoryEventLog;
    use crate::events::Severity;
    use crate::process::SecureProcessRunner;
    use crate::test_utils::FakeTools;
    use crate::test_utils::write_archive_file;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        log: Arc<MemoryEventLog>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
                log: Arc::new(MemoryEventLog::new()),
            }
        }

        fn cache(&self, tools: &FakeTools) -> ArchiveExtractionCache {
            let runner = SecureProcessRunner::with_config(Default::default(), self.log.clone());
            let validator = ArchiveValidator::new(runner).with_tools(tools.host_tools());
            ArchiveExtractionCache::new(validator, self.temp.path().join("workspace"))
        }

        fn archive(&self, name: &str, size: u64) -> PathBuf {
            write_archive_file(self.temp.path(), name, size)
        }
    }

    #[test]
    fn test_wrapper_folder_is_unwrapped() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 10_000);
        let tools = FakeTools::new(fx.temp.path())
            .member("MyPack/", 0)
            .member("MyPack/model.obj", 1000)
            .member("MyPack/texture.png", 1000)
            .member("__MACOSX/", 0)
            .member("__MACOSX/._model.obj", 10);
        let cache = fx.cache(&tools);

        let dir = cache.extract_for_processing(&archive).unwrap();

        assert_eq!(dir.file_name().unwrap(), "MyPack");
        assert!(dir.join("model.obj").is_file());
        assert!(dir.starts_with(cache.workspace().root().canonicalize().unwrap()));
    }

    #[test]
    fn test_second_call_is_cache_hit() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path()).member("model.obj", 1000);
        let cache = fx.cache(&tools);

        let first = cache.extract_for_processing(&archive).unwrap();
        let second = cache.extract_for_processing(&archive).unwrap();

        assert_eq!(first, second);
        assert_eq!(tools.list_invocations(), 1);
        assert_eq!(tools.extract_invocations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_directory_forces_reextraction() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path()).member("model.obj", 1000);
        let cache = fx.cache(&tools);

        let first = cache.extract_for_processing(&archive).unwrap();
        fs::remove_dir_all(&first).unwrap();
        let second = cache.extract_for_processing(&archive).unwrap();

        assert_eq!(first, second);
        assert!(second.join("model.obj").is_file());
        assert_eq!(tools.extract_invocations(), 2);
    }

    #[test]
    fn test_rejected_archive_creates_nothing() {
        let fx = Fixture::new();
        let archive = fx.archive("evil.zip", 1000);
        let tools = FakeTools::new(fx.temp.path()).member("../../etc/passwd", 10);
        let cache = fx.cache(&tools);

        let err = cache.extract_for_processing(&archive).unwrap_err();

        assert!(matches!(
            err.validation_failure(),
            Some(ValidationFailure::PathTraversal { .. })
        ));
        assert!(!cache.workspace().root().exists());
        assert_eq!(tools.extract_invocations(), 0);
        assert!(cache.is_empty());
        let errors: Vec<_> = fx
            .log
            .events_of(EventKind::ArchiveExtraction)
            .into_iter()
            .filter(|e| e.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_validation_warnings_are_logged() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path())
            .member("model.obj", 100)
            .member("setup.exe", 100);
        let cache = fx.cache(&tools);

        cache.extract_for_processing(&archive).unwrap();

        let warnings: Vec<_> = fx
            .log
            .events()
            .into_iter()
            .filter(|e| e.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("setup.exe"));
    }

    #[test]
    fn test_failed_tool_removes_scratch() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path())
            .member("model.obj", 100)
            .failing_extract();
        let cache = fx.cache(&tools);

        let err = cache.extract_for_processing(&archive).unwrap_err();

        match err {
            ExtractionError::ExtractionFailed {
                exit_code, output, ..
            } => {
                assert_eq!(exit_code, Some(2));
                assert!(output.contains("disk full"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let scratch = cache
            .workspace()
            .root()
            .join(ExtractionWorkspace::scratch_name(&archive));
        assert!(!scratch.exists());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_escaping_symlink_fails_audit() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path())
            .member("model.obj", 100)
            .extract_shell("    ln -s /etc \"$dest/etc-link\"");
        let cache = fx.cache(&tools);

        let err = cache.extract_for_processing(&archive).unwrap_err();

        assert!(matches!(err, ExtractionError::AuditFailed { .. }));
        assert!(err.is_security_violation());
        assert!(cache.cached(&archive).is_none());
    }

    #[test]
    fn test_understated_listing_fails_audit() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path())
            .member("small.txt", 10)
            .extract_shell("    head -c 5000 /dev/zero > \"$dest/hidden.bin\"");
        let mut limits = ValidationLimits::default();
        limits.max_total_size = 4096;
        let cache = fx.cache(&tools);
        let validator = cache.validator().clone().with_limits(limits);
        let cache = ArchiveExtractionCache::new(validator, fx.temp.path().join("ws2"));

        let err = cache.extract_for_processing(&archive).unwrap_err();
        assert!(matches!(err, ExtractionError::AuditFailed { .. }));
    }

    #[test]
    fn test_nested_archive_expanded() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 10_000);
        let tools = FakeTools::new(fx.temp.path())
            .member("model.obj", 1000)
            .member("textures.zip", 1000)
            .nested("textures.zip", &[("wood.png", 2000), ("metal.png", 2000)]);
        let cache = fx.cache(&tools);

        let dir = cache.extract_for_processing(&archive).unwrap();

        assert!(dir.join("textures.zip").is_file());
        assert!(dir.join("textures/wood.png").is_file());
        assert!(dir.join("textures/metal.png").is_file());
        assert_eq!(tools.list_invocations(), 2);
        assert_eq!(tools.extract_invocations(), 2);
    }

    #[test]
    fn test_rejected_nested_archive_is_skipped() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 10_000);
        let tools = FakeTools::new(fx.temp.path())
            .member("model.obj", 1000)
            .member("bomb.zip", 10)
            .nested("bomb.zip", &[("zeros.bin", 1_000_000)]);
        let cache = fx.cache(&tools);

        let dir = cache.extract_for_processing(&archive).unwrap();

        assert!(dir.join("bomb.zip").is_file());
        assert!(!dir.join("bomb").exists());
        assert_eq!(tools.extract_invocations(), 1);
        assert!(
            fx.log
                .events()
                .iter()
                .any(|e| e.severity == Severity::Warning && e.message.contains("bomb.zip"))
        );
    }

    #[test]
    fn test_nested_archives_share_outer_size_budget() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path())
            .member("a.zip", 100)
            .member("b.zip", 100)
            .member("c.zip", 100)
            .nested("a.zip", &[("a.bin", 9000)])
            .nested("b.zip", &[("b.bin", 9000)])
            .nested("c.zip", &[("c.bin", 9000)]);
        let mut limits = ValidationLimits::default();
        limits.max_total_size = 10_000;
        let cache = fx.cache(&tools);
        let validator = cache.validator().clone().with_limits(limits);
        let cache = ArchiveExtractionCache::new(validator, fx.temp.path().join("ws2"));

        let dir = cache.extract_for_processing(&archive).unwrap();

        // Outer plus the first nested archive; the others no longer fit.
        assert_eq!(tools.extract_invocations(), 2);
        let expanded = ["a", "b", "c"]
            .iter()
            .filter(|name| dir.join(name).is_dir())
            .count();
        assert_eq!(expanded, 1);
        let summary = audit_tree(&dir, cache.validator().limits()).unwrap();
        assert!(summary.total_size <= 10_000);
        let skipped = fx
            .log
            .events()
            .iter()
            .filter(|e| e.severity == Severity::Warning && e.message.contains("skipped nested"))
            .count();
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_nested_budget_counts_entries() {
        let limits = ValidationLimits {
            max_entries: 5,
            max_total_size: 1000,
            ..ValidationLimits::default()
        };
        let used = AuditSummary {
            files: 2,
            directories: 1,
            symlinks: 0,
            total_size: 400,
        };
        let mut budget = NestedBudget::remaining(&limits, &used);
        assert_eq!(budget, NestedBudget { entries: 2, bytes: 600 });
        assert_eq!(budget.limits(&limits).max_entries, 1);
        assert_eq!(budget.limits(&limits).max_total_size, 600);
        assert!(!budget.is_exhausted());

        budget.charge(&AuditSummary {
            files: 1,
            total_size: 100,
            ..AuditSummary::default()
        });
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_nesting_disabled() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 10_000);
        let tools = FakeTools::new(fx.temp.path())
            .member("model.obj", 1000)
            .member("textures.zip", 1000)
            .nested("textures.zip", &[("wood.png", 2000)]);
        let cache = fx.cache(&tools).with_config(ExtractionConfig {
            max_nesting_depth: 0,
            ..ExtractionConfig::default()
        });

        let dir = cache.extract_for_processing(&archive).unwrap();

        assert!(!dir.join("textures").exists());
        assert_eq!(tools.extract_invocations(), 1);
    }

    #[test]
    fn test_key_locks_released_after_extraction() {
        let fx = Fixture::new();
        let good = fx.archive("pack.zip", 1000);
        let missing = fx.temp.path().join("missing.zip");
        let tools = FakeTools::new(fx.temp.path()).member("model.obj", 100);
        let cache = fx.cache(&tools);

        cache.extract_for_processing(&good).unwrap();
        cache.extract_for_processing(&missing).unwrap_err();

        assert!(cache.lock_in_flight().is_empty());
    }

    #[test]
    fn test_cleanup_keeps_held_key_lock() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path()).member("model.obj", 100);
        let cache = fx.cache(&tools);

        let held = cache.key_lock(&archive);
        let _guard = held.lock().unwrap();
        cache.cleanup().unwrap();

        assert!(Arc::ptr_eq(&cache.key_lock(&archive), &held));
    }

    #[test]
    fn test_cleanup() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path()).member("model.obj", 100);
        let cache = fx.cache(&tools);

        cache.cleanup().unwrap();

        let dir = cache.extract_for_processing(&archive).unwrap();
        assert!(dir.exists());

        cache.cleanup().unwrap();
        assert!(!cache.workspace().root().exists());
        assert!(cache.is_empty());
        cache.cleanup().unwrap();
    }

    #[test]
    fn test_invalidate() {
        let fx = Fixture::new();
        let archive = fx.archive("pack.zip", 1000);
        let tools = FakeTools::new(fx.temp.path()).member("model.obj", 100);
        let cache = fx.cache(&tools);

        let dir = cache.extract_for_processing(&archive).unwrap();
        assert!(cache.invalidate(&archive).unwrap());
        assert!(!dir.exists());
        assert!(!cache.invalidate(&archive).unwrap());
    }
}
