//! `ferry upload-batch <files...>` – upload in order and build a manifest.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use ferry_core::backend::Backend;
use ferry_core::manifest::Manifest;
use ferry_core::{ObjectStoreLocator, Transfer, WorkerId};

const PUBLISHED_NAME: &str = "metadata.json";

/// `<prefix>/metadata.json`.
fn publish_target(prefix: &str) -> Result<ObjectStoreLocator> {
    let raw = format!("{}/{}", prefix.trim_end_matches('/'), PUBLISHED_NAME);
    ObjectStoreLocator::parse(&raw).ok_or_else(|| anyhow!("not an object-store prefix: {}", prefix))
}

pub fn run_upload_batch<B: Backend>(
    transfer: &Transfer<B>,
    files: &[String],
    prefix: Option<&str>,
    manifest_path: Option<&Path>,
    publish: bool,
) -> Result<()> {
    let prefix = prefix.unwrap_or(transfer.remote_prefix()).to_string();
    let publish_to = if publish { Some(publish_target(&prefix)?) } else { None };

    let worker = WorkerId::current();
    let scope = transfer.scratch().open_scope(worker.clone())?;

    let mut manifest = Manifest::new();
    for (index, file) in files.iter().enumerate() {
        let out = transfer.remote(&worker, file.as_str(), &prefix)?;
        println!("{:<6} {}", index, out);
        manifest.insert(index as u64, out);
    }
    tracing::info!(count = manifest.len(), prefix = %prefix, "batch uploaded");

    let written: Option<PathBuf> = match manifest_path {
        Some(path) => {
            manifest.write_to(path)?;
            println!("manifest written to {}", path.display());
            Some(path.to_path_buf())
        }
        None if publish_to.is_some() => {
            let path = scope.allocate_path(Some("manifest"), Some(".json"))?;
            manifest.write_to(&path)?;
            Some(path)
        }
        None => {
            println!("{}", manifest.to_json()?);
            None
        }
    };

    if let (Some(target), Some(path)) = (publish_to, written) {
        let published = transfer.put_to(&worker, path.as_path(), &target)?;
        println!("manifest published to {}", published);
    }

    scope.close()?;
    Ok(())
}
