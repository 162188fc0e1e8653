//! Stateless path and filename validation.
//!
//! Every other component funnels user- or archive-supplied paths through
//! these checks before they reach the filesystem or a process argument
//! vector.

/// Maximum accepted path length, in characters.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Maximum accepted filename length, in characters.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Characters escaped by [`sanitize_for_shell`].
pub const SHELL_SPECIAL_CHARS: &[char] = &[
    ' ', '\t', '\'', '"', '\\', '$', '`', '!', '&', ';', '|', '<', '>', '(', ')', '{', '}', '[',
    ']', '*', '?', '#', '~', '=', '%', '^',
];

/// Returns `true` if `path` is free of traversal and injection hazards.
///
/// Rejects:
/// - `..` as a path segment (either separator)
/// - NUL, carriage return or newline
/// - `$(` and backtick command substitution
/// - more than [`MAX_PATH_LENGTH`] characters
///
/// # Examples
///
/// ```
/// use packsafe_core::security::is_path_safe;
///
/// assert!(is_path_safe("/tmp/packs/arcade.zip"));
/// assert!(is_path_safe("textures/wood..final.png"));
/// assert!(!is_path_safe("../../etc/passwd"));
/// assert!(!is_path_safe("pack$(reboot).zip"));
/// ```
#[must_use]
pub fn is_path_safe(path: &str) -> bool {
    if path.chars().count() > MAX_PATH_LENGTH {
        return false;
    }

    if path.contains(['\0', '\r', '\n', '`']) || path.contains("$(") {
        return false;
    }

    !path.split(['/', '\\']).any(|segment| segment == "..")
}

/// Escapes every character of [`SHELL_SPECIAL_CHARS`] with a backslash.
///
/// Only for paths that must be embedded in a shell-interpreted command line.
/// Arguments passed to [`SecureProcessRunner`](crate::process::SecureProcessRunner)
/// never need this.
///
/// # Examples
///
/// ```
/// use packsafe_core::security::sanitize_for_shell;
///
/// assert_eq!(sanitize_for_shell("My Pack (v2).zip"), r"My\ Pack\ \(v2\).zip");
/// ```
#[must_use]
pub fn sanitize_for_shell(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + path.len() / 4);
    for c in path.chars() {
        if SHELL_SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Returns `true` if `name` is usable as a single path component.
///
/// Rejects separators, a leading dot, more than [`MAX_FILENAME_LENGTH`]
/// characters, empty or whitespace-only names, and anything
/// [`is_path_safe`] rejects.
#[must_use]
pub fn is_valid_filename(name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name.starts_with('.') || name.contains(['/', '\\']) {
        return false;
    }
    is_path_safe(name)
}

/// Returns the shell-escaped form of `path`, or `None` if it is unsafe.
#[must_use]
pub fn sanitize_and_validate(path: &str) -> Option<String> {
    is_path_safe(path).then(|| sanitize_for_shell(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_paths() {
        assert!(is_path_safe("model.obj"));
        assert!(is_path_safe("/Users/me/Downloads/Arcade Pack.zip"));
        assert!(is_path_safe("./relative/dir"));
        assert!(is_path_safe("..hidden"));
        assert!(is_path_safe("name.."));
    }

    #[test]
    fn test_parent_segments_rejected() {
        assert!(!is_path_safe(".."));
        assert!(!is_path_safe("../etc/passwd"));
        assert!(!is_path_safe("a/b/../../c"));
        assert!(!is_path_safe(r"a\..\b"));
        assert!(!is_path_safe("trailing/.."));
    }

    #[test]
    fn test_control_and_substitution_rejected() {
        assert!(!is_path_safe("file\0.txt"));
        assert!(!is_path_safe("file\r.txt"));
        assert!(!is_path_safe("file\n.txt"));
        assert!(!is_path_safe("$(whoami).zip"));
        assert!(!is_path_safe("`id`.zip"));
        assert!(is_path_safe("$HOME.zip"));
    }

    #[test]
    fn test_length_limit() {
        assert!(is_path_safe(&"a".repeat(MAX_PATH_LENGTH)));
        assert!(!is_path_safe(&"a".repeat(MAX_PATH_LENGTH + 1)));
        // Counted in characters, not bytes
        assert!(is_path_safe(&"é".repeat(MAX_PATH_LENGTH)));
    }

    #[test]
    fn test_sanitize_for_shell() {
        assert_eq!(sanitize_for_shell("plain.txt"), "plain.txt");
        assert_eq!(sanitize_for_shell("a b"), r"a\ b");
        assert_eq!(sanitize_for_shell("it's"), r"it\'s");
        assert_eq!(sanitize_for_shell(r"back\slash"), r"back\\slash");
        assert_eq!(sanitize_for_shell("a;b|c&d"), r"a\;b\|c\&d");
        assert_eq!(sanitize_for_shell("$HOME"), r"\$HOME");
    }

    #[test]
    fn test_valid_filenames() {
        assert!(is_valid_filename("cabinet.glb"));
        assert!(is_valid_filename("Side Art (left).png"));
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename("   "));
        assert!(!is_valid_filename(".hidden"));
        assert!(!is_valid_filename("a/b"));
        assert!(!is_valid_filename(r"a\b"));
        assert!(!is_valid_filename(&"x".repeat(MAX_FILENAME_LENGTH + 1)));
        assert!(is_valid_filename(&"x".repeat(MAX_FILENAME_LENGTH)));
        assert!(!is_valid_filename("$(id)"));
    }

    #[test]
    fn test_sanitize_and_validate() {
        assert_eq!(sanitize_and_validate("a b").as_deref(), Some(r"a\ b"));
        assert_eq!(sanitize_and_validate("../x"), None);
    }
}
