//! Object-store (GCS-compatible) locator.
//!
//! `gs://bucket/key` and `https://storage.googleapis.com/bucket/key` name the
//! same object. The canonical form is always the `https` one; query, fragment
//! and credentials in the input are dropped.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TransferError;

/// Host serving the public object-store URL convention.
pub const STORAGE_HOST: &str = "storage.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectStoreLocator {
    canonical: String,
    bucket: String,
    /// Object name as it appears in the URL path (percent-encoded).
    key: String,
}

impl ObjectStoreLocator {
    pub fn parse(raw: &str) -> Option<Self> {
        let (bucket, key) = split_bucket_and_rest(raw)?;
        if key.is_empty() {
            return None;
        }
        Some(Self::from_parts(bucket, key))
    }

    /// Builds a locator for a literal object name (no percent-decoding is applied to `key`).
    ///
    /// The name is kept byte for byte: leading slashes and `.`/`..` segments
    /// are part of it.
    pub fn new(bucket: &str, key: &str) -> Option<Self> {
        if !is_bucket_name(bucket) || key.is_empty() {
            return None;
        }
        Some(Self::from_parts(bucket.to_string(), encode_path(&escape_key(key))))
    }

    fn from_parts(bucket: String, key: String) -> Self {
        Self {
            canonical: format!("https://{}/{}/{}", STORAGE_HOST, bucket, key),
            bucket,
            key,
        }
    }

    /// Canonical form, also the source form handed to object-store adapters.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// `gs://<bucket>/<key>`.
    pub fn as_display(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.key)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object name with percent-escapes decoded.
    pub fn key(&self) -> Cow<'_, str> {
        urlencoding::decode(&self.key).unwrap_or(Cow::Borrowed(&self.key))
    }

    /// Object name exactly as it appears in the URL path.
    pub fn encoded_key(&self) -> &str {
        &self.key
    }

    pub(crate) fn url_path(&self) -> String {
        format!("/{}", self.key)
    }
}

/// Splits an object-store URL into `(bucket, rest)`. `rest` may be empty,
/// which is what a destination prefix such as `gs://tmp` looks like.
///
/// `rest` is taken from the input as written: only the `/` after the bucket
/// is removed and dot segments are not resolved, since object names are
/// opaque.
pub(crate) fn split_bucket_and_rest(raw: &str) -> Option<(String, String)> {
    let url = Url::parse(raw).ok()?;
    let bucket_in_path = match url.scheme() {
        "gs" => false,
        "http" | "https" => {
            if url.host_str()? != STORAGE_HOST || url.port().is_some() {
                return None;
            }
            true
        }
        _ => return None,
    };
    let path = raw_path(raw)?;
    let path = path.strip_prefix('/').unwrap_or(path);
    let (bucket, rest) = if bucket_in_path {
        path.split_once('/').unwrap_or((path, ""))
    } else {
        (url.host_str()?, path)
    };
    if !is_bucket_name(bucket) {
        return None;
    }
    Some((bucket.to_string(), encode_path(rest)))
}

/// Path of `raw` exactly as written: after the authority, before `?` or `#`.
fn raw_path(raw: &str) -> Option<&str> {
    let (_, after_scheme) = raw.trim().split_once("://")?;
    let start = after_scheme.find(['/', '?', '#']).unwrap_or(after_scheme.len());
    let path = &after_scheme[start..];
    let end = path.find(['?', '#']).unwrap_or(path.len());
    Some(&path[..end])
}

fn is_bucket_name(bucket: &str) -> bool {
    !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Percent-encodes what may not appear raw in a URL path: controls, space,
/// non-ASCII, quotes, angle brackets, backticks and braces. Existing escapes
/// are left alone.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_graphic() && !matches!(c, '"' | '<' | '>' | '`' | '{' | '}') {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Escapes the characters that would otherwise be read as URL delimiters.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for ObjectStoreLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.key)
    }
}

impl AsRef<str> for ObjectStoreLocator {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl FromStr for ObjectStoreLocator {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TransferError::unsupported(s))
    }
}

impl TryFrom<String> for ObjectStoreLocator {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectStoreLocator> for String {
    fn from(value: ObjectStoreLocator) -> Self {
        value.as_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gs_and_https_forms_are_the_same_object() {
        let a = ObjectStoreLocator::parse("gs://bucket/1.jpg").unwrap();
        let b = ObjectStoreLocator::parse("https://storage.googleapis.com/bucket/1.jpg").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://storage.googleapis.com/bucket/1.jpg");
        assert_eq!(a.as_display(), "gs://bucket/1.jpg");
        assert_eq!(a.bucket(), "bucket");
        assert_eq!(a.key(), "1.jpg");
    }

    #[test]
    fn plain_http_on_storage_host_is_rewritten_to_https() {
        let loc = ObjectStoreLocator::parse("http://storage.googleapis.com/b/dir/k.png").unwrap();
        assert_eq!(loc.as_str(), "https://storage.googleapis.com/b/dir/k.png");
        assert_eq!(loc.key(), "dir/k.png");
    }

    #[test]
    fn query_and_fragment_are_dropped() {
        let a = ObjectStoreLocator::parse("gs://b/k?x=1#f").unwrap();
        let b = ObjectStoreLocator::parse("gs://b/k").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://storage.googleapis.com/b/k");
    }

    #[test]
    fn rejects_other_hosts_and_incomplete_addresses() {
        assert!(ObjectStoreLocator::parse("https://example.com/b/k").is_none());
        assert!(ObjectStoreLocator::parse("https://storage.googleapis.com:8443/b/k").is_none());
        assert!(ObjectStoreLocator::parse("https://storage.googleapis.com/b").is_none());
        assert!(ObjectStoreLocator::parse("gs://bucket").is_none());
        assert!(ObjectStoreLocator::parse("gs:///k").is_none());
        assert!(ObjectStoreLocator::parse("/local/path").is_none());
    }

    #[test]
    fn new_escapes_delimiters_in_object_names() {
        let loc = ObjectStoreLocator::new("b", "frames/100%?#.jpg").unwrap();
        assert_eq!(loc.key(), "frames/100%?#.jpg");
        assert_eq!(loc.as_display(), "gs://b/frames/100%25%3F%23.jpg");
        assert_eq!(ObjectStoreLocator::parse(&loc.as_display()).unwrap(), loc);
        assert!(ObjectStoreLocator::new("a/b", "k").is_none());
    }

    #[test]
    fn split_accepts_bare_prefixes() {
        assert_eq!(
            split_bucket_and_rest("gs://tmp"),
            Some(("tmp".to_string(), String::new()))
        );
        assert_eq!(
            split_bucket_and_rest("https://storage.googleapis.com/tmp/frames/"),
            Some(("tmp".to_string(), "frames/".to_string()))
        );
        assert_eq!(split_bucket_and_rest("https://example.com/tmp"), None);
    }

    #[test]
    fn object_names_are_not_normalized() {
        let leading = ObjectStoreLocator::new("b", "/k").unwrap();
        assert_eq!(leading.key(), "/k");
        assert_eq!(leading.as_display(), "gs://b//k");
        assert_eq!(ObjectStoreLocator::parse("gs://b//k").unwrap(), leading);
        assert_ne!(leading, ObjectStoreLocator::parse("gs://b/k").unwrap());

        let dotted = ObjectStoreLocator::new("b", "a/../c").unwrap();
        assert_eq!(dotted.key(), "a/../c");
        assert_eq!(dotted.as_str(), "https://storage.googleapis.com/b/a/../c");
        assert_eq!(ObjectStoreLocator::parse(&dotted.as_display()).unwrap(), dotted);
    }

    #[test]
    fn storage_url_with_dot_segments_stays_an_object() {
        let loc = ObjectStoreLocator::parse("https://storage.googleapis.com/b/../k").unwrap();
        assert_eq!(loc.bucket(), "b");
        assert_eq!(loc.key(), "../k");
        assert_eq!(loc.as_display(), "gs://b/../k");
    }

    #[test]
    fn spaces_are_encoded_consistently() {
        let built = ObjectStoreLocator::new("b", "run/a b.txt").unwrap();
        let parsed = ObjectStoreLocator::parse("gs://b/run/a b.txt").unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.encoded_key(), "run/a%20b.txt");
        assert_eq!(built.key(), "run/a b.txt");
    }
}
