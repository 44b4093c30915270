use std::fmt;
use std::path::Path;

use crate::errors::{Result, TransferError};

/// POSIX-style path of a resource relative to the WebDAV root.
///
/// Always stored normalized: no leading or trailing slash, no empty
/// segments, components joined by `/`. The root collection is the empty
/// string. Keeping remote paths as a distinct type (rather than reusing
/// `std::path::Path`) means local separator conventions can never leak
/// into URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RemotePath(String);

impl RemotePath {
    /// Builds a normalized remote path from any slash-delimited string.
    ///
    /// `RemotePath::new("/a//b/")` and `RemotePath::new("a/b")` are equal.
    pub fn new(path: &str) -> Self {
        let normalized: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        Self(normalized.join("/"))
    }

    /// The WebDAV root collection.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends one or more slash-delimited segments.
    pub fn join(&self, rel: &str) -> Self {
        if self.is_root() {
            Self::new(rel)
        } else {
            Self::new(&format!("{}/{}", self.0, rel))
        }
    }

    /// Splits into (parent collection, final name). The root splits into
    /// (root, "").
    pub fn parent_and_name(&self) -> (RemotePath, &str) {
        match self.0.rfind('/') {
            Some(idx) => (Self(self.0[..idx].to_string()), &self.0[idx + 1..]),
            None => (Self::root(), &self.0),
        }
    }

    /// The final path segment, or the empty string for the root.
    pub fn name(&self) -> &str {
        self.parent_and_name().1
    }

    /// Converts a relative local path into a remote path, mapping the
    /// platform separator to `/`. Fails on non-UTF-8 components.
    pub fn from_local_relative(rel: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in rel.components() {
            let segment = component.as_os_str().to_str().ok_or_else(|| {
                TransferError::filesystem(
                    rel,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "path is not valid UTF-8",
                    ),
                )
            })?;
            segments.push(segment);
        }
        Ok(Self::new(&segments.join("/")))
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemotePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_strips_redundant_slashes() {
        assert_eq!(RemotePath::new("/a/b/"), RemotePath::new("a/b"));
        assert_eq!(RemotePath::new("a//b").as_str(), "a/b");
        assert_eq!(RemotePath::new("///").as_str(), "");
        assert!(RemotePath::new("/").is_root());
    }

    #[test]
    fn test_join_and_split() {
        let path = RemotePath::new("Documents").join("reports/2024");
        assert_eq!(path.as_str(), "Documents/reports/2024");

        let (parent, name) = path.parent_and_name();
        assert_eq!(parent.as_str(), "Documents/reports");
        assert_eq!(name, "2024");

        let top = RemotePath::new("top");
        let (parent, name) = top.parent_and_name();
        assert!(parent.is_root());
        assert_eq!(name, "top");
    }

    #[test]
    fn test_join_on_root() {
        assert_eq!(RemotePath::root().join("a/b").as_str(), "a/b");
    }

    #[test]
    fn test_from_local_relative() {
        let rel = Path::new("sub").join("dir").join("file.txt");
        let remote = RemotePath::from_local_relative(&rel).unwrap();
        assert_eq!(remote.as_str(), "sub/dir/file.txt");
    }
}
