//! Archive extraction into a managed scratch workspace.
//!
//! [`ArchiveExtractionCache`] is the entry point: validate, extract with the
//! host tool, audit the result, unwrap a single wrapper folder, expand nested
//! archives and remember the outcome.

mod audit;
mod cache;
mod layout;
mod workspace;

pub use audit::AuditSummary;
pub use audit::audit_tree;
pub use cache::ArchiveExtractionCache;
pub use cache::ExtractionCacheEntry;
pub use layout::effective_root;
pub use layout::nested_archives;
pub use workspace::ExtractionWorkspace;
