//! Secure execution of external programs.
//!
//! All host tools (archive listing and extraction, conversion scripts) run
//! through [`SecureProcessRunner`]. Requests are validated before anything is
//! spawned, arguments never pass through a shell, and every run is bounded by
//! a timeout that terminates the whole process group.
//!
//! # Examples
//!
//! ```no_run
//! use packsafe_core::process::ExecutionRequest;
//! use packsafe_core::process::SecureProcessRunner;
//! use std::sync::mpsc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = SecureProcessRunner::new();
//! let (tx, rx) = mpsc::channel::<Vec<u8>>();
//! let mut sink = tx;
//!
//! let result = runner.run(&ExecutionRequest::new("unzip").arg("-v"), &mut sink)?;
//! drop(sink);
//!
//! for chunk in rx {
//!     print!("{}", String::from_utf8_lossy(&chunk));
//! }
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

mod output;
mod request;
mod result;
mod runner;
mod terminate;

pub use output::NoopOutput;
pub use output::OutputSink;
pub use output::WriterOutput;
pub use request::DEFAULT_TIMEOUT;
pub use request::ExecutionRequest;
pub use result::ProcessResult;
pub use runner::SecureProcessRunner;
