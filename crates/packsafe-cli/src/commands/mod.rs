//! Subcommand implementations.

pub mod check_path;
pub mod completion;
pub mod extract;
pub mod run;
pub mod validate;

use crate::cli::LimitArgs;
use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use packsafe_core::ArchiveValidator;
use packsafe_core::HostTools;
use packsafe_core::RunnerConfig;
use packsafe_core::ToolCommand;
use packsafe_core::ValidationLimits;
use packsafe_core::events::FileEventLog;
use packsafe_core::events::SecurityEventLog;
use packsafe_core::events::TracingEventLog;
use packsafe_core::host::ARCHIVE_PLACEHOLDER;
use packsafe_core::host::DEST_PLACEHOLDER;
use packsafe_core::process::SecureProcessRunner;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Opens the audit sink: a JSON-lines file if requested, tracing otherwise.
pub fn event_log(audit_log: Option<&Path>) -> Result<Arc<dyn SecurityEventLog>> {
    match audit_log {
        Some(path) => {
            let log = FileEventLog::open(path)
                .with_context(|| format!("failed to open audit log '{}'", path.display()))?;
            Ok(Arc::new(log))
        }
        None => Ok(Arc::new(TracingEventLog)),
    }
}

/// Runner shared by every command that spawns host tools.
pub fn runner(events: Arc<dyn SecurityEventLog>) -> SecureProcessRunner {
    SecureProcessRunner::with_config(RunnerConfig::default(), events)
}

impl LimitArgs {
    /// Default limits overridden by whichever flags were given.
    pub fn validation_limits(&self) -> ValidationLimits {
        let mut limits = ValidationLimits::default();
        if let Some(max_files) = self.max_files {
            limits.max_entries = max_files;
        }
        if let Some(max_total_size) = self.max_total_size {
            limits.max_total_size = max_total_size;
        }
        if let Some(max_file_size) = self.max_file_size {
            limits.max_entry_size = max_file_size;
        }
        if let Some(ratio) = self.max_compression_ratio {
            limits.max_compression_ratio = f64::from(ratio);
        }
        if let Some(secs) = self.listing_timeout {
            limits.listing_timeout = Duration::from_secs(secs);
        }
        limits
    }

    /// Host tools with the listing command replaced if requested.
    pub fn host_tools(&self, extract_tool: Option<&str>) -> Result<HostTools> {
        let mut tools = HostTools::default();
        if let Some(template) = &self.list_tool {
            let list = ToolCommand::parse(template, &[ARCHIVE_PLACEHOLDER]).map_err(|e| {
                anyhow!(
                    "Invalid --list-tool '{template}': {e}\n\
                     HINT: Example: --list-tool \"unzip -l {{archive}}\""
                )
            })?;
            tools = tools.with_list(list, self.list_format.unwrap_or_default());
        }
        if let Some(template) = extract_tool {
            let extract = ToolCommand::parse(template, &[ARCHIVE_PLACEHOLDER, DEST_PLACEHOLDER])
                .map_err(|e| {
                    anyhow!(
                        "Invalid --extract-tool '{template}': {e}\n\
                         HINT: Example: --extract-tool \"unzip -qq -o {{archive}} -d {{dest}}\""
                    )
                })?;
            tools = tools.with_extract(extract);
        }
        Ok(tools)
    }

    pub fn validator(
        &self,
        extract_tool: Option<&str>,
        events: Arc<dyn SecurityEventLog>,
    ) -> Result<ArchiveValidator> {
        Ok(ArchiveValidator::new(runner(events))
            .with_limits(self.validation_limits())
            .with_tools(self.host_tools(extract_tool)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use packsafe_core::inspection::ListingFormat;

    fn limit_args() -> LimitArgs {
        LimitArgs {
            max_files: None,
            max_total_size: None,
            max_file_size: None,
            max_compression_ratio: None,
            list_tool: None,
            list_format: None,
            listing_timeout: None,
        }
    }

    #[test]
    fn test_unset_flags_keep_defaults() {
        let limits = limit_args().validation_limits();
        let defaults = ValidationLimits::default();
        assert_eq!(limits.max_entries, defaults.max_entries);
        assert_eq!(limits.max_total_size, defaults.max_total_size);
        assert_eq!(limits.listing_timeout, defaults.listing_timeout);
    }

    #[test]
    fn test_flags_override_limits() {
        let args = LimitArgs {
            max_files: Some(5),
            max_compression_ratio: Some(20),
            listing_timeout: Some(3),
            ..limit_args()
        };
        let limits = args.validation_limits();
        assert_eq!(limits.max_entries, 5);
        assert!((limits.max_compression_ratio - 20.0).abs() < f64::EPSILON);
        assert_eq!(limits.listing_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_list_tool_template() {
        let args = LimitArgs {
            list_tool: Some("bsdtar -tvf {archive}".to_string()),
            list_format: Some(ListingFormat::SizeName),
            ..limit_args()
        };
        let tools = args.host_tools(None).unwrap();
        assert_eq!(tools.list.args, ["-tvf", "{archive}"]);
        assert_eq!(tools.list_format, ListingFormat::SizeName);
        assert_eq!(tools.extract, HostTools::default().extract);
    }

    #[test]
    fn test_extract_tool_requires_dest() {
        let err = limit_args()
            .host_tools(Some("unzip {archive}"))
            .unwrap_err();
        assert!(format!("{err}").contains("{dest}"));
    }

    #[test]
    fn test_audit_log_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("logs").join("audit.jsonl");
        event_log(Some(&path)).unwrap();
        assert!(path.exists());
    }
}
