//! Run command implementation.

use crate::cli::RunArgs;
use crate::error::convert_execution_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use anyhow::bail;
use packsafe_core::events::SecurityEventLog;
use packsafe_core::process::ExecutionRequest;
use packsafe_core::process::NoopOutput;
use packsafe_core::process::WriterOutput;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Runs the program. Its output streams to stdout unless `stream` is false,
/// in which case it is only captured for the formatter.
pub fn execute(
    args: &RunArgs,
    events: Arc<dyn SecurityEventLog>,
    formatter: &dyn OutputFormatter,
    stream: bool,
) -> Result<()> {
    let runner = super::runner(events);

    let mut request = ExecutionRequest::new(&args.program)
        .args(&args.args)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(cwd) = &args.cwd {
        request = request.current_dir(cwd);
    }
    for (key, value) in &args.env {
        request = request.env(key, value);
    }

    debug!(request = %request.describe(), stream, "running program");

    let result = if stream {
        runner.run(&request, &mut WriterOutput(io::stdout()))
    } else {
        runner.run(&request, &mut NoopOutput)
    }
    .map_err(|e| convert_execution_error(e, &args.program))?;

    formatter.format_process_result(&args.program, &result)?;

    if result.timed_out {
        bail!(
            "'{}' timed out after {}s and was terminated\n\
             HINT: Use --timeout to allow more time.",
            args.program.display(),
            args.timeout
        );
    }
    if !result.success() {
        bail!("'{}' failed: {}", args.program.display(), result.summary());
    }
    Ok(())
}
