//! Local byte copy.

use std::fs;
use std::path::Path;

use super::AdapterError;

/// Copies the bytes of `src` to `dest`, replacing `dest` if it exists.
/// A partially written `dest` is removed on failure.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), AdapterError> {
    match fs::copy(src, dest) {
        Ok(bytes) => {
            tracing::debug!(src = %src.display(), dest = %dest.display(), bytes, "copied");
            Ok(())
        }
        Err(e) => {
            if dest.exists() {
                let _ = fs::remove_file(dest);
            }
            Err(e.into())
        }
    }
}
