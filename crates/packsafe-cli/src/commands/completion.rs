//! Shell completion generation command.

use crate::cli::Cli;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io;
use std::io::Write;

/// Binary name used in generated scripts.
const BIN_NAME: &str = "packsafe";

/// Writes completions for `shell` to `out`.
pub fn generate(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
}

/// Generates shell completions for the specified shell on stdout.
pub fn execute(shell: Shell) {
    generate(shell, &mut io::stdout());
}
