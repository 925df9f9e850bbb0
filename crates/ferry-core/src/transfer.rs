//! Transfer engine.
//!
//! [`Transfer::local`] materializes any locator as a fresh file in scratch;
//! [`Transfer::remote`] uploads any locator under an object-store prefix.
//! Both always write to a newly generated name, so repeating a call never
//! overwrites an earlier result. Remote sources are downloaded first and then
//! re-uploaded; nothing is streamed between backends.

use std::ffi::OsStr;

use crate::backend::{Backend, CurlBackend};
use crate::config::FerryConfig;
use crate::error::{TransferError, TransferResult};
use crate::locator::{
    extension_or_default, split_bucket_and_rest, IntoLocator, LocalLocator, Locator,
    ObjectStoreLocator,
};
use crate::scratch::{ScratchSpace, WorkerId};

pub struct Transfer<B = CurlBackend> {
    backend: B,
    scratch: ScratchSpace,
    remote_prefix: String,
}

impl Transfer<CurlBackend> {
    /// Engine with a curl backend, scratch root and default prefix taken from `cfg`.
    pub fn from_config(cfg: &FerryConfig) -> Self {
        Transfer::new(CurlBackend::from_config(cfg), ScratchSpace::new(cfg.scratch_root()))
            .with_remote_prefix(cfg.remote_prefix.clone())
    }
}

impl<B: Backend> Transfer<B> {
    pub fn new(backend: B, scratch: ScratchSpace) -> Self {
        Self {
            backend,
            scratch,
            remote_prefix: FerryConfig::default().remote_prefix,
        }
    }

    pub fn with_remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefix = prefix.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    pub fn remote_prefix(&self) -> &str {
        &self.remote_prefix
    }

    /// Copies `source` into a new scratch file named after its extension
    /// (`.unknown` when none can be inferred).
    ///
    /// The file lands in `worker`'s open scope if it has one, otherwise in the
    /// unmanaged scratch root.
    pub fn local(&self, worker: &WorkerId, source: impl IntoLocator) -> TransferResult<LocalLocator> {
        let locator = source.into_locator()?;
        let ext = extension_or_default(&locator);
        let dest = self.scratch.allocate_path(worker, None, Some(&ext))?;
        let dest_locator = LocalLocator::from_path(&dest)
            .ok_or_else(|| TransferError::unsupported(dest.display().to_string()))?;
        tracing::debug!(source = %locator, dest = %dest.display(), "fetching to scratch");

        let result = match &locator {
            Locator::Http(h) => self
                .backend
                .http_fetch(h.as_str(), &dest)
                .map_err(|source| TransferError::Download {
                    uri: locator.as_display(),
                    source,
                }),
            Locator::Local(l) => self
                .backend
                .local_copy(l.path(), &dest)
                .map_err(|source| TransferError::FileCopy {
                    uri: locator.as_display(),
                    source,
                }),
            Locator::ObjectStore(o) => self
                .backend
                .object_get(o, &dest)
                .map_err(|source| TransferError::Download {
                    uri: locator.as_display(),
                    source,
                }),
        };

        if let Err(e) = result {
            if dest.exists() {
                let _ = std::fs::remove_file(&dest);
            }
            tracing::warn!(source = %locator, "fetch failed: {}", error_chain(&e));
            return Err(e);
        }
        tracing::info!(source = %locator, dest = %dest_locator, "fetched");
        Ok(dest_locator)
    }

    /// Uploads `source` to a new, uniquely named object under `destination_prefix`
    /// (`gs://bucket[/path]` or the `https://storage.googleapis.com` form).
    ///
    /// The source and prefix are both validated before any I/O happens.
    pub fn remote(
        &self,
        worker: &WorkerId,
        source: impl IntoLocator,
        destination_prefix: &str,
    ) -> TransferResult<ObjectStoreLocator> {
        let locator = source.into_locator()?;
        let (bucket, base) = split_prefix(destination_prefix)?;
        let local = self.materialize(worker, &locator)?;

        let ext = extension_or_default(&Locator::Local(local.clone()));
        let name_path = self.scratch.allocate_path(worker, None, Some(&ext))?;
        let name = name_path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| TransferError::unsupported(name_path.display().to_string()))?;
        let target_raw = format!("gs://{}/{}{}", bucket, base, name);
        let target = ObjectStoreLocator::parse(&target_raw)
            .ok_or_else(|| TransferError::unsupported(target_raw.clone()))?;

        self.upload(&locator, &local, target)
    }

    /// [`remote`](Self::remote) with the configured default prefix.
    pub fn remote_default(&self, worker: &WorkerId, source: impl IntoLocator) -> TransferResult<ObjectStoreLocator> {
        let prefix = self.remote_prefix.clone();
        self.remote(worker, source, &prefix)
    }

    /// Uploads `source` to exactly `target`, replacing any existing object.
    pub fn put_to(
        &self,
        worker: &WorkerId,
        source: impl IntoLocator,
        target: &ObjectStoreLocator,
    ) -> TransferResult<ObjectStoreLocator> {
        let locator = source.into_locator()?;
        let local = self.materialize(worker, &locator)?;
        self.upload(&locator, &local, target.clone())
    }

    /// Remote sources are downloaded to scratch; local ones are used in place.
    fn materialize(&self, worker: &WorkerId, locator: &Locator) -> TransferResult<LocalLocator> {
        match locator {
            Locator::Local(l) => Ok(l.clone()),
            Locator::Http(_) | Locator::ObjectStore(_) => self.local(worker, locator),
        }
    }

    fn upload(
        &self,
        origin: &Locator,
        local: &LocalLocator,
        target: ObjectStoreLocator,
    ) -> TransferResult<ObjectStoreLocator> {
        tracing::debug!(source = %local, target = %target, "uploading");
        if let Err(source) = self.backend.object_put(local.path(), &target) {
            tracing::warn!(source = %origin, target = %target, "upload failed: {}", source);
            return Err(TransferError::Upload {
                uri: origin.as_display(),
                target: target.as_display(),
                source,
            });
        }
        tracing::info!(source = %origin, target = %target, "uploaded");
        Ok(target)
    }
}

/// Splits a destination prefix into bucket and a key prefix ending in `/` (or empty).
fn split_prefix(prefix: &str) -> TransferResult<(String, String)> {
    let (bucket, mut base) =
        split_bucket_and_rest(prefix).ok_or_else(|| TransferError::unsupported(prefix))?;
    if !base.is_empty() && !base.ends_with('/') {
        base.push('/');
    }
    Ok((bucket, base))
}

/// `error: cause: cause` for log lines.
fn error_chain(err: &TransferError) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
