//! Scope guard: a scratch directory bound to one worker.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::{new_dir_in, new_path_in, ScratchSpace, WorkerId};

/// A fresh directory bound to `worker` until the scope is closed or dropped.
///
/// Closing removes the directory recursively and unbinds it, whether the
/// work done inside succeeded or not.
#[must_use = "dropping a scope immediately deletes its directory"]
pub struct Scope<'a> {
    space: &'a ScratchSpace,
    worker: WorkerId,
    dir: Option<TempDir>,
}

impl<'a> Scope<'a> {
    pub(super) fn new(space: &'a ScratchSpace, worker: WorkerId, dir: TempDir) -> Self {
        Self {
            space,
            worker,
            dir: Some(dir),
        }
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }

    /// A not-yet-existing path inside this scope.
    pub fn allocate_path(&self, prefix: Option<&str>, suffix: Option<&str>) -> io::Result<PathBuf> {
        new_path_in(self.path(), prefix, suffix)
    }

    /// A freshly created, empty directory inside this scope.
    pub fn allocate_dir(&self, prefix: Option<&str>, suffix: Option<&str>) -> io::Result<PathBuf> {
        new_dir_in(self.path(), prefix, suffix)
    }

    /// Removes the directory and everything allocated under it.
    pub fn close(mut self) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        self.space.unbind(&self.worker, dir.path());
        let path = dir.path().to_path_buf();
        dir.close()?;
        tracing::debug!(worker = %self.worker, dir = %path.display(), "scratch scope closed");
        Ok(())
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(worker = %self.worker, "failed to remove scratch scope: {}", e);
        }
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("worker", &self.worker)
            .field("path", &self.path())
            .finish()
    }
}
