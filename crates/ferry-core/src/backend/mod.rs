//! Backend adapters: the thin blocking I/O primitives transfers are built on.
//!
//! The transfer engine only depends on the [`Backend`] trait. [`CurlBackend`]
//! talks to HTTP servers and the object store through libcurl.

mod curl_backend;
mod local_copy;

pub use curl_backend::{CurlBackend, CurlOptions, ObjectStoreEndpoints};
pub use local_copy::copy_file;

pub(crate) use curl_backend::configured_easy;

use std::path::Path;

use thiserror::Error;

use crate::credential::CredentialError;
use crate::locator::ObjectStoreLocator;

/// Failure of a single adapter call. The transfer engine wraps it in the
/// matching [`TransferError`](crate::error::TransferError) kind.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),

    #[error("{url} returned HTTP {status}")]
    Http { status: u32, url: String },

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential: {0}")]
    Credential(#[from] CredentialError),
}

/// Blocking I/O primitives. Each call either fully succeeds or returns an
/// error; implementations that fetch into `dest` remove it on failure.
pub trait Backend: Send + Sync {
    /// GET `url` into `dest`.
    fn http_fetch(&self, url: &str, dest: &Path) -> Result<(), AdapterError>;

    /// Authenticated read of `object` into `dest`.
    fn object_get(&self, object: &ObjectStoreLocator, dest: &Path) -> Result<(), AdapterError>;

    /// Authenticated write of `src` to `object`.
    fn object_put(&self, src: &Path, object: &ObjectStoreLocator) -> Result<(), AdapterError>;

    /// Byte copy of `src` to `dest`.
    fn local_copy(&self, src: &Path, dest: &Path) -> Result<(), AdapterError> {
        copy_file(src, dest)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn http_fetch(&self, url: &str, dest: &Path) -> Result<(), AdapterError> {
        (**self).http_fetch(url, dest)
    }

    fn object_get(&self, object: &ObjectStoreLocator, dest: &Path) -> Result<(), AdapterError> {
        (**self).object_get(object, dest)
    }

    fn object_put(&self, src: &Path, object: &ObjectStoreLocator) -> Result<(), AdapterError> {
        (**self).object_put(src, object)
    }

    fn local_copy(&self, src: &Path, dest: &Path) -> Result<(), AdapterError> {
        (**self).local_copy(src, dest)
    }
}
