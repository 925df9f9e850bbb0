//! Resource locators.
//!
//! A [`Locator`] is one of three closed variants (local path, HTTP URL,
//! object-store object). [`Locator::classify`] tries the object store first,
//! then HTTP, then local: an object-store URL is also a valid HTTP URL, so the
//! more specific check has to win.
//!
//! Equality and hashing use the canonical form. Each locator also has a
//! display form (scheme-ful, used for persistence and logs) and a source form
//! (what low-level I/O accepts).

mod extension;
mod http;
mod local;
mod object_store;

pub use extension::{extension_or_default, infer_extension, DEFAULT_EXTENSION};
pub use http::HttpLocator;
pub use local::LocalLocator;
pub use object_store::{ObjectStoreLocator, STORAGE_HOST};

pub(crate) use object_store::split_bucket_and_rest;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TransferError, TransferResult};

/// Which backend a locator addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    Local,
    Http,
    ObjectStore,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LocatorKind::Local => "local",
            LocatorKind::Http => "http",
            LocatorKind::ObjectStore => "object-store",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locator {
    Local(LocalLocator),
    Http(HttpLocator),
    ObjectStore(ObjectStoreLocator),
}

impl Locator {
    /// Maps `raw` to exactly one variant, or fails with `UnsupportedScheme`.
    ///
    /// ```
    /// use ferry_core::locator::{Locator, LocatorKind};
    ///
    /// let loc = Locator::classify("https://storage.googleapis.com/b/k.jpg").unwrap();
    /// assert_eq!(loc.kind(), LocatorKind::ObjectStore);
    /// assert_eq!(loc.as_display(), "gs://b/k.jpg");
    /// ```
    pub fn classify(raw: &str) -> TransferResult<Self> {
        let locator = if let Some(o) = ObjectStoreLocator::parse(raw) {
            Locator::ObjectStore(o)
        } else if let Some(h) = HttpLocator::parse(raw) {
            Locator::Http(h)
        } else if let Some(l) = LocalLocator::parse(raw) {
            Locator::Local(l)
        } else {
            tracing::debug!(input = raw, "no locator variant matched");
            return Err(TransferError::unsupported(raw));
        };
        tracing::trace!(input = raw, kind = %locator.kind(), canonical = locator.as_str(), "classified");
        Ok(locator)
    }

    pub fn from_path(path: &Path) -> TransferResult<Self> {
        LocalLocator::from_path(path)
            .map(Locator::Local)
            .ok_or_else(|| TransferError::unsupported(path.display().to_string()))
    }

    pub fn kind(&self) -> LocatorKind {
        match self {
            Locator::Local(_) => LocatorKind::Local,
            Locator::Http(_) => LocatorKind::Http,
            Locator::ObjectStore(_) => LocatorKind::ObjectStore,
        }
    }

    /// Canonical form; the basis of equality and hashing.
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Local(l) => l.as_str(),
            Locator::Http(h) => h.as_str(),
            Locator::ObjectStore(o) => o.as_str(),
        }
    }

    /// Form accepted by low-level I/O: bare path, full URL, or the
    /// `https://storage.googleapis.com/...` URL (never `gs://`).
    pub fn as_source(&self) -> &str {
        self.as_str()
    }

    /// Scheme-ful form used when persisting or logging.
    pub fn as_display(&self) -> String {
        match self {
            Locator::Local(l) => l.as_display(),
            Locator::Http(h) => h.as_str().to_string(),
            Locator::ObjectStore(o) => o.as_display(),
        }
    }

    /// Scheme of the display form: `file`, `http`, `https` or `gs`.
    pub fn scheme(&self) -> &str {
        match self {
            Locator::Local(_) => "file",
            Locator::Http(h) => h.scheme(),
            Locator::ObjectStore(_) => "gs",
        }
    }

    /// Host of the display form; the bucket for object-store locators.
    pub fn host(&self) -> &str {
        match self {
            Locator::Local(_) => "localhost",
            Locator::Http(h) => h.host().unwrap_or_default(),
            Locator::ObjectStore(o) => o.bucket(),
        }
    }

    /// Path component of the display form (percent-encoded).
    pub fn url_path(&self) -> String {
        match self {
            Locator::Local(l) => l.url_path().to_string(),
            Locator::Http(h) => h.url_path().to_string(),
            Locator::ObjectStore(o) => o.url_path(),
        }
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            Locator::Http(h) => h.query(),
            _ => None,
        }
    }

    pub fn fragment(&self) -> Option<&str> {
        match self {
            Locator::Http(h) => h.fragment(),
            _ => None,
        }
    }

    pub fn as_local(&self) -> Option<&LocalLocator> {
        match self {
            Locator::Local(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_object_store(&self) -> Option<&ObjectStoreLocator> {
        match self {
            Locator::ObjectStore(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Locator {}

impl Hash for Locator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialEq<str> for Locator {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Locator {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local(l) => fmt::Display::fmt(l, f),
            Locator::Http(h) => fmt::Display::fmt(h, f),
            Locator::ObjectStore(o) => fmt::Display::fmt(o, f),
        }
    }
}

impl FromStr for Locator {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::classify(s)
    }
}

impl TryFrom<String> for Locator {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::classify(&value)
    }
}

impl From<Locator> for String {
    fn from(value: Locator) -> Self {
        value.as_display()
    }
}

impl From<LocalLocator> for Locator {
    fn from(value: LocalLocator) -> Self {
        Locator::Local(value)
    }
}

impl From<HttpLocator> for Locator {
    fn from(value: HttpLocator) -> Self {
        Locator::Http(value)
    }
}

impl From<ObjectStoreLocator> for Locator {
    fn from(value: ObjectStoreLocator) -> Self {
        Locator::ObjectStore(value)
    }
}

/// Anything a transfer operation accepts as a source address.
pub trait IntoLocator {
    fn into_locator(self) -> TransferResult<Locator>;
}

impl IntoLocator for &str {
    fn into_locator(self) -> TransferResult<Locator> {
        Locator::classify(self)
    }
}

impl IntoLocator for String {
    fn into_locator(self) -> TransferResult<Locator> {
        Locator::classify(&self)
    }
}

impl IntoLocator for &String {
    fn into_locator(self) -> TransferResult<Locator> {
        Locator::classify(self)
    }
}

impl IntoLocator for &Path {
    fn into_locator(self) -> TransferResult<Locator> {
        Locator::from_path(self)
    }
}

impl IntoLocator for PathBuf {
    fn into_locator(self) -> TransferResult<Locator> {
        Locator::from_path(&self)
    }
}

impl IntoLocator for &PathBuf {
    fn into_locator(self) -> TransferResult<Locator> {
        Locator::from_path(self)
    }
}

impl IntoLocator for Locator {
    fn into_locator(self) -> TransferResult<Locator> {
        Ok(self)
    }
}

impl IntoLocator for &Locator {
    fn into_locator(self) -> TransferResult<Locator> {
        Ok(self.clone())
    }
}

impl IntoLocator for LocalLocator {
    fn into_locator(self) -> TransferResult<Locator> {
        Ok(Locator::Local(self))
    }
}

impl IntoLocator for HttpLocator {
    fn into_locator(self) -> TransferResult<Locator> {
        Ok(Locator::Http(self))
    }
}

impl IntoLocator for ObjectStoreLocator {
    fn into_locator(self) -> TransferResult<Locator> {
        Ok(Locator::ObjectStore(self))
    }
}
