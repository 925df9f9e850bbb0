//! `ferry local <uri>` – fetch into the unmanaged scratch area.

use anyhow::Result;
use ferry_core::backend::Backend;
use ferry_core::{Transfer, WorkerId};

/// The file is left in place; removing it is up to the caller.
pub fn run_local<B: Backend>(transfer: &Transfer<B>, uri: &str) -> Result<()> {
    let out = transfer.local(&WorkerId::current(), uri)?;
    println!("{}", out.path().display());
    Ok(())
}
