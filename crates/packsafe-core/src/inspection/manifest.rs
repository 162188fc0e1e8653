//! Archive member metadata.

/// One member as reported by the listing tool.
///
/// Only the fields the validator needs: the stored name and the
/// uncompressed size. The name is kept exactly as the archive stores it and
/// has not been checked for safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Member name as stored in the archive (forward slashes for zip).
    pub name: String,

    /// Uncompressed size in bytes.
    pub size: u64,
}

impl ArchiveMember {
    /// Creates a member.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Returns `true` for directory members (trailing separator).
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.name.ends_with(['/', '\\'])
    }

    /// Final path component of the member name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        let trimmed = self.name.trim_end_matches(['/', '\\']);
        trimmed
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(trimmed)
    }

    /// Extension of the final component, without the dot.
    ///
    /// `None` for directories, dotfiles without a further dot, and names
    /// without an extension.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        if self.is_directory() {
            return None;
        }
        let (stem, ext) = self.file_name().rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then_some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_member() {
        let member = ArchiveMember::new("MyPack/textures/", 0);
        assert!(member.is_directory());
        assert_eq!(member.file_name(), "textures");
        assert_eq!(member.extension(), None);
    }

    #[test]
    fn test_extension() {
        assert_eq!(ArchiveMember::new("a/b/model.GLB", 1).extension(), Some("GLB"));
        assert_eq!(ArchiveMember::new("archive.tar.gz", 1).extension(), Some("gz"));
        assert_eq!(ArchiveMember::new("README", 1).extension(), None);
        assert_eq!(ArchiveMember::new(".gitignore", 1).extension(), None);
        assert_eq!(ArchiveMember::new("trailing.", 1).extension(), None);
    }

    #[test]
    fn test_file_name_with_backslashes() {
        let member = ArchiveMember::new(r"pack\art\side.png", 10);
        assert_eq!(member.file_name(), "side.png");
        assert_eq!(member.extension(), Some("png"));
    }
}
