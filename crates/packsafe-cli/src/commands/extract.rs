//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::convert_extraction_error;
use crate::output::OutputFormatter;
use crate::progress::CliSpinner;
use anyhow::Result;
use packsafe_core::ExtractionConfig;
use packsafe_core::events::SecurityEventLog;
use packsafe_core::extraction::ArchiveExtractionCache;
use packsafe_core::extraction::audit_tree;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Workspace directory name under the system temp dir.
const DEFAULT_WORKSPACE: &str = "packsafe";

pub fn execute(
    args: &ExtractArgs,
    events: Arc<dyn SecurityEventLog>,
    formatter: &dyn OutputFormatter,
    interactive: bool,
) -> Result<()> {
    let validator = args
        .limits
        .validator(args.extract_tool.as_deref(), events)?;
    let limits = validator.limits().clone();

    let mut config = ExtractionConfig::default();
    if let Some(secs) = args.extraction_timeout {
        config.extraction_timeout = Duration::from_secs(secs);
    }
    if let Some(depth) = args.max_nesting_depth {
        config.max_nesting_depth = depth;
    }

    let workspace = args
        .workspace
        .clone()
        .unwrap_or_else(|| env::temp_dir().join(DEFAULT_WORKSPACE));
    debug!(workspace = %workspace.display(), "using extraction workspace");
    let cache = ArchiveExtractionCache::new(validator, workspace).with_config(config);

    // Spinner only on an interactive terminal (not quiet, not JSON)
    let extracted = if interactive && CliSpinner::should_show() {
        let mut spinner = CliSpinner::new("Extracting");
        cache.extract_with_output(&args.archive, &mut spinner)
    } else {
        cache.extract_for_processing(&args.archive)
    }
    .map_err(|e| convert_extraction_error(e, &args.archive))?;

    let summary =
        audit_tree(&extracted, &limits).map_err(|e| convert_extraction_error(e, &args.archive))?;
    formatter.format_extraction_result(&args.archive, &extracted, &summary)?;

    Ok(())
}
