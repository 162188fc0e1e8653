//! Member-name checks.

use crate::ValidationFailure;

/// Rejects member names that would land outside the extraction directory.
///
/// A name is rejected when it begins with a root marker (`/`, `\`, or a
/// drive prefix like `C:`) or when any `/`- or `\`-separated segment is
/// `..`. Absolute names are reported first.
///
/// # Errors
///
/// [`ValidationFailure::AbsolutePath`] or [`ValidationFailure::PathTraversal`].
///
/// # Examples
///
/// ```
/// use packsafe_core::security::check_member_name;
///
/// assert!(check_member_name("MyPack/model.obj").is_ok());
/// assert!(check_member_name("../../etc/passwd").is_err());
/// assert!(check_member_name("/etc/passwd").is_err());
/// ```
pub fn check_member_name(name: &str) -> Result<(), ValidationFailure> {
    if is_absolute(name) {
        return Err(ValidationFailure::AbsolutePath {
            name: name.to_string(),
        });
    }

    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(ValidationFailure::PathTraversal {
            name: name.to_string(),
        });
    }

    Ok(())
}

fn is_absolute(name: &str) -> bool {
    if name.starts_with(['/', '\\']) {
        return true;
    }
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
