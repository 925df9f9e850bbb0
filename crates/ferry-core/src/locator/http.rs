//! HTTP(S) locator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TransferError;

/// An `http`/`https` URL with `.`/`..` path segments resolved. Query and
/// fragment are kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HttpLocator {
    url: Url,
}

impl HttpLocator {
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        // Special schemes always carry a host; an empty one is still malformed.
        if url.host_str().map_or(true, str::is_empty) {
            return None;
        }
        Some(Self { url })
    }

    /// Canonical, display and source forms all coincide for HTTP.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    pub(crate) fn url_path(&self) -> &str {
        self.url.path()
    }
}

impl fmt::Display for HttpLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for HttpLocator {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for HttpLocator {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TransferError::unsupported(s))
    }
}

impl TryFrom<String> for HttpLocator {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpLocator> for String {
    fn from(value: HttpLocator) -> Self {
        value.url.into()
    }
}
