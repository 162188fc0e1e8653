//! Security validation modules.

pub mod member;
pub mod path;
pub mod quota;
pub mod validator;
pub mod zipbomb;

pub use member::check_member_name;
pub use path::is_path_safe;
pub use path::is_valid_filename;
pub use path::sanitize_and_validate;
pub use path::sanitize_for_shell;
pub use quota::ManifestQuota;
pub use validator::ManifestSummary;
pub use validator::MemberValidator;
pub use validator::validate_manifest;
pub use zipbomb::validate_compression_ratio;
