//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use packsafe_core::inspection::ListingFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "packsafe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Append security events as JSON lines to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub audit_log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate an archive without extracting it
    Validate(ValidateArgs),
    /// Validate and extract an archive into a workspace
    Extract(ExtractArgs),
    /// Run a program with validated arguments and a timeout
    Run(RunArgs),
    /// Check whether a path is safe to pass to external tools
    CheckPath(CheckPathArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Limits and listing tool shared by `validate` and `extract`.
#[derive(clap::Args)]
pub struct LimitArgs {
    /// Maximum number of archive members
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Maximum total uncompressed size (suffixes K, M, G, T)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_total_size: Option<u64>,

    /// Maximum uncompressed size of a single member (suffixes K, M, G, T)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_file_size: Option<u64>,

    /// Maximum compression ratio
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_compression_ratio: Option<u32>,

    /// Listing command template, must contain {archive}
    #[arg(long, value_name = "TEMPLATE")]
    pub list_tool: Option<String>,

    /// Output layout of the listing command (unzip-table, size-name)
    #[arg(long, value_name = "FORMAT", requires = "list_tool")]
    pub list_format: Option<ListingFormat>,

    /// Listing timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub listing_timeout: Option<u64>,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Workspace directory for extracted packs (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[command(flatten)]
    pub limits: LimitArgs,

    /// Extraction command template, must contain {archive} and {dest}
    #[arg(long, value_name = "TEMPLATE")]
    pub extract_tool: Option<String>,

    /// Extraction timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub extraction_timeout: Option<u64>,

    /// Levels of nested archives to expand (0 disables)
    #[arg(long, value_name = "DEPTH")]
    pub max_nesting_depth: Option<usize>,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Timeout in seconds
    #[arg(long, default_value = "60", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Working directory for the program
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment override (repeatable)
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Program path or name resolved through PATH
    #[arg(value_name = "PROGRAM")]
    pub program: PathBuf,

    /// Arguments passed to the program
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(clap::Args)]
pub struct CheckPathArgs {
    /// Path to check
    #[arg(value_name = "PATH")]
    pub path: String,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

/// Parse `KEY=VALUE`
fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
