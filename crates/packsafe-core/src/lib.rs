//! Secure ingestion of untrusted asset packs.
//!
//! `packsafe-core` makes two risky operations safe to perform:
//!
//! - running external programs with validated inputs and a hard timeout
//!   ([`process::SecureProcessRunner`])
//! - accepting compressed archives from the internet without exposing the
//!   host filesystem to path traversal, unbounded disk use or decompression
//!   bombs ([`ArchiveValidator`], [`extraction::ArchiveExtractionCache`])
//!
//! Archives are never decompressed in process. Listing and extraction are
//! host tools ([`HostTools`], `unzip` by default) invoked through the runner.
//! Security-relevant activity is recorded through
//! [`events::SecurityEventLog`].
//!
//! # Examples
//!
//! ```no_run
//! use packsafe_core::ArchiveValidator;
//! use packsafe_core::extraction::ArchiveExtractionCache;
//! use packsafe_core::process::SecureProcessRunner;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = ArchiveValidator::new(SecureProcessRunner::new());
//! let cache = ArchiveExtractionCache::new(validator, "/tmp/packsafe");
//!
//! let assets = cache.extract_for_processing("Downloads/Arcade Pack.zip")?;
//! println!("extracted to {}", assets.display());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod host;
pub mod inspection;
pub mod process;
pub mod report;
pub mod security;

#[cfg(unix)]
#[doc(hidden)]
pub mod test_utils;

pub use archive::ArchiveValidator;
pub use config::ExtractionConfig;
pub use config::RunnerConfig;
pub use config::ValidationLimits;
pub use error::ExecutionError;
pub use error::ExtractionError;
pub use error::Result;
pub use error::ValidationFailure;
pub use host::HostTools;
pub use host::ToolCommand;
pub use report::ArchiveValidationResult;
