//! Local filesystem locator.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TransferError;

/// Host reinserted into every display form.
const LOCALHOST: &str = "localhost";

/// Absolute, normalized filesystem path. Owns nothing on disk; the file it
/// names may disappear at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalLocator {
    path: String,
    /// Percent-encoded path used in the `file://localhost` form.
    encoded: String,
}

impl LocalLocator {
    /// Accepts a bare path or a `file://` URI whose host is empty or `localhost`.
    ///
    /// Anything else containing `://` is rejected. Query and fragment of a
    /// `file://` URI are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if !raw.contains("://") {
            return Self::from_path(Path::new(raw));
        }

        let url = Url::parse(raw).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        match url.host_str() {
            None | Some("") | Some(LOCALHOST) => {}
            Some(_) => return None,
        }
        let path = url.to_file_path().ok()?;
        Self::from_path(&path)
    }

    /// Resolves `path` against the current directory and folds `.`/`..` lexically.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.as_os_str().is_empty() {
            return None;
        }
        let normalized = normalize(path)?;
        let encoded = match Url::from_file_path(&normalized) {
            Ok(url) => url.path().to_string(),
            Err(()) => return None,
        };
        let path = normalized.into_os_string().into_string().ok()?;
        Some(Self { path, encoded })
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.path)
    }

    /// Canonical form: the bare absolute path.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// `file://localhost/<absolute-path>`.
    pub fn as_display(&self) -> String {
        format!("file://{}{}", LOCALHOST, self.encoded)
    }

    pub(crate) fn url_path(&self) -> &str {
        &self.encoded
    }
}

fn normalize(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

impl fmt::Display for LocalLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display())
    }
}

impl AsRef<str> for LocalLocator {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

impl AsRef<Path> for LocalLocator {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

impl FromStr for LocalLocator {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TransferError::unsupported(s))
    }
}

impl TryFrom<String> for LocalLocator {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LocalLocator> for String {
    fn from(value: LocalLocator) -> Self {
        value.as_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_and_file_uri_agree() {
        let a = LocalLocator::parse("/1.jpg").unwrap();
        let b = LocalLocator::parse("file:///1.jpg").unwrap();
        let c = LocalLocator::parse("file://localhost/1.jpg").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "/1.jpg");
        assert_eq!(a.as_display(), "file://localhost/1.jpg");
    }

    #[test]
    fn dot_segments_fold() {
        let a = LocalLocator::parse("/a/b/../c").unwrap();
        let b = LocalLocator::parse("/a/./c/").unwrap();
        assert_eq!(a.as_str(), "/a/c");
        assert_eq!(a, b);
        assert_eq!(LocalLocator::parse("/..").unwrap().as_str(), "/");
    }

    #[test]
    fn relative_paths_become_absolute() {
        let loc = LocalLocator::parse("some/file.txt").unwrap();
        assert!(loc.path().is_absolute());
        assert!(loc.as_str().ends_with("/some/file.txt"));
    }

    #[test]
    fn rejects_remote_hosts_and_other_schemes() {
        assert!(LocalLocator::parse("file://example.com/a.jpg").is_none());
        assert!(LocalLocator::parse("https://example.com/a.jpg").is_none());
        assert!(LocalLocator::parse("gs://bucket/a.jpg").is_none());
        assert!(LocalLocator::parse("").is_none());
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let loc = LocalLocator::parse("file:///a/b.png?x=1#frag").unwrap();
        assert_eq!(loc.as_str(), "/a/b.png");
    }

    #[test]
    fn display_form_escapes_reserved_characters() {
        let loc = LocalLocator::parse("/data/a b#1%.txt").unwrap();
        assert_eq!(loc.as_str(), "/data/a b#1%.txt");
        let display = loc.as_display();
        assert!(display.starts_with("file://localhost/data/"));
        assert!(!display.contains(' '));
        assert_eq!(LocalLocator::parse(&display).unwrap(), loc);
    }
}
