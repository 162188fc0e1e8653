//! Check-path command implementation.

use crate::output::OutputFormatter;
use crate::output::PathCheck;
use anyhow::Result;
use anyhow::bail;
use packsafe_core::events::EventKind;
use packsafe_core::events::SecurityEvent;
use packsafe_core::events::SecurityEventLog;
use packsafe_core::security::is_path_safe;
use packsafe_core::security::is_valid_filename;
use packsafe_core::security::sanitize_for_shell;
use std::path::Path;
use std::sync::Arc;

pub fn check(path: &str) -> PathCheck {
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    PathCheck {
        path: path.to_string(),
        safe: is_path_safe(path),
        valid_filename: is_valid_filename(&file_name),
        shell_escaped: sanitize_for_shell(path),
    }
}

pub fn execute(
    path: &str,
    events: Arc<dyn SecurityEventLog>,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let verdict = check(path);
    formatter.format_path_check(&verdict)?;

    if !verdict.safe {
        events.log(SecurityEvent::warning(
            EventKind::PathValidation,
            format!("unsafe path rejected: {path:?}"),
        ));
        bail!(
            "Path is unsafe: {path:?}\n\
             HINT: Paths may not contain '..' segments, control characters or '$(' / '`' sequences."
        );
    }
    Ok(())
}
