//! Archive inspection without extraction.
//!
//! Listing is delegated to a host tool (see [`HostTools`](crate::HostTools));
//! this module turns its text output into [`ArchiveMember`]s.

pub mod list;
pub mod manifest;

pub use list::ListingFormat;
pub use list::ListingParseError;
pub use list::ListingParser;
pub use list::parse_listing;
pub use manifest::ArchiveMember;
