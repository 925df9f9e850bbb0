//! `ferry remote <uri> [--prefix gs://...]` – upload under a fresh object name.

use anyhow::Result;
use ferry_core::backend::Backend;
use ferry_core::{Transfer, WorkerId};

pub fn run_remote<B: Backend>(transfer: &Transfer<B>, uri: &str, prefix: Option<&str>) -> Result<()> {
    let worker = WorkerId::current();
    // Intermediate downloads live only as long as this scope.
    let scope = transfer.scratch().open_scope(worker.clone())?;
    let out = match prefix {
        Some(p) => transfer.remote(&worker, uri, p)?,
        None => transfer.remote_default(&worker, uri)?,
    };
    scope.close()?;
    println!("{}", out);
    Ok(())
}
