//! Validate command implementation.

use crate::cli::ValidateArgs;
use crate::error::convert_validation_failure;
use crate::output::OutputFormatter;
use anyhow::Result;
use packsafe_core::events::SecurityEventLog;
use std::sync::Arc;

pub fn execute(
    args: &ValidateArgs,
    events: Arc<dyn SecurityEventLog>,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let validator = args.limits.validator(None, events)?;
    let result = validator.validate(&args.archive);

    formatter.format_validation_result(&args.archive, &result)?;

    match result.error {
        Some(failure) => Err(convert_validation_failure(failure, &args.archive)),
        None => Ok(()),
    }
}
