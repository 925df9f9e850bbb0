//! Scoped scratch allocation.
//!
//! A [`ScratchSpace`] keeps a registry of worker → open scope directories.
//! Paths allocated for a worker with an open [`Scope`] land inside it and are
//! removed when the scope ends; without a scope they land in the unmanaged
//! root and are left for the caller to clean up.
//!
//! Unique names come from `tempfile`'s random name generator.

mod scope;
mod worker;

pub use scope::Scope;
pub use worker::WorkerId;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::locator::DEFAULT_EXTENSION;

const DEFAULT_PREFIX: &str = "tmp";
const SCOPE_PREFIX: &str = "ferry-scope-";

pub struct ScratchSpace {
    /// Open scopes per worker, innermost last.
    bindings: RwLock<HashMap<WorkerId, Vec<PathBuf>>>,
    unmanaged_root: PathBuf,
}

impl ScratchSpace {
    /// Scratch space whose unmanaged area (and scope parent) is `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            unmanaged_root: root.into(),
        }
    }

    /// Scratch space rooted at the OS temp directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn unmanaged_root(&self) -> &Path {
        &self.unmanaged_root
    }

    /// Creates a fresh, empty directory and binds it to `worker`.
    ///
    /// Scopes nest: while an inner scope is open it is the active one.
    pub fn open_scope(&self, worker: WorkerId) -> io::Result<Scope<'_>> {
        fs::create_dir_all(&self.unmanaged_root)?;
        let dir = tempfile::Builder::new()
            .prefix(SCOPE_PREFIX)
            .tempdir_in(&self.unmanaged_root)?;
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(worker.clone())
            .or_default()
            .push(dir.path().to_path_buf());
        tracing::debug!(worker = %worker, dir = %dir.path().display(), "scratch scope opened");
        Ok(Scope::new(self, worker, dir))
    }

    /// Directory of the innermost open scope for `worker`, if any.
    pub fn active_dir(&self, worker: &WorkerId) -> Option<PathBuf> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(worker)
            .and_then(|dirs| dirs.last().cloned())
    }

    /// A path that does not exist yet, inside the worker's active scope or
    /// else the unmanaged root.
    ///
    /// `suffix` defaults to `.unknown` and gains a leading `.` if missing.
    pub fn allocate_path(
        &self,
        worker: &WorkerId,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> io::Result<PathBuf> {
        let dir = self.target_dir(worker)?;
        new_path_in(&dir, prefix, suffix)
    }

    /// Like [`allocate_path`](Self::allocate_path) but eagerly creates an empty directory.
    pub fn allocate_dir(
        &self,
        worker: &WorkerId,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> io::Result<PathBuf> {
        let dir = self.target_dir(worker)?;
        new_dir_in(&dir, prefix, suffix)
    }

    fn target_dir(&self, worker: &WorkerId) -> io::Result<PathBuf> {
        match self.active_dir(worker) {
            Some(dir) => Ok(dir),
            None => {
                fs::create_dir_all(&self.unmanaged_root)?;
                Ok(self.unmanaged_root.clone())
            }
        }
    }

    pub(crate) fn unbind(&self, worker: &WorkerId, dir: &Path) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(dirs) = bindings.get_mut(worker) {
            dirs.retain(|d| d != dir);
            if dirs.is_empty() {
                bindings.remove(worker);
            }
        }
    }
}

impl Default for ScratchSpace {
    fn default() -> Self {
        Self::system()
    }
}

fn normalize_suffix(suffix: Option<&str>) -> String {
    match suffix {
        None => DEFAULT_EXTENSION.to_string(),
        Some(s) if s.starts_with('.') => s.to_string(),
        Some(s) => format!(".{}", s),
    }
}

pub(crate) fn new_path_in(dir: &Path, prefix: Option<&str>, suffix: Option<&str>) -> io::Result<PathBuf> {
    let suffix = normalize_suffix(suffix);
    let file = tempfile::Builder::new()
        .prefix(prefix.unwrap_or(DEFAULT_PREFIX))
        .suffix(&suffix)
        .tempfile_in(dir)?;
    let path = file.path().to_path_buf();
    file.close()?;
    Ok(path)
}

pub(crate) fn new_dir_in(dir: &Path, prefix: Option<&str>, suffix: Option<&str>) -> io::Result<PathBuf> {
    let created = tempfile::Builder::new()
        .prefix(prefix.unwrap_or(DEFAULT_PREFIX))
        .suffix(suffix.unwrap_or(""))
        .tempdir_in(dir)?;
    Ok(created.keep())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn space() -> (tempfile::TempDir, ScratchSpace) {
        let root = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(root.path());
        (root, space)
    }

    #[test]
    fn suffix_defaults_and_gets_a_dot() {
        assert_eq!(normalize_suffix(None), ".unknown");
        assert_eq!(normalize_suffix(Some("jpg")), ".jpg");
        assert_eq!(normalize_suffix(Some(".png")), ".png");
    }

    #[test]
    fn allocated_path_does_not_exist_and_has_suffix() {
        let (_root, space) = space();
        let w = WorkerId::current();
        let p = space.allocate_path(&w, None, Some("jpg")).unwrap();
        assert!(!p.exists());
        assert!(p.to_string_lossy().ends_with(".jpg"));
        let q = space.allocate_path(&w, None, None).unwrap();
        assert!(q.to_string_lossy().ends_with(".unknown"));
        assert_ne!(p, q);
    }

    #[test]
    fn allocate_dir_creates_it() {
        let (_root, space) = space();
        let d = space
            .allocate_dir(&WorkerId::current(), Some("frames-"), Some("-x"))
            .unwrap();
        assert!(d.is_dir());
        let name = d.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("frames-"));
        assert!(name.ends_with("-x"));
    }

    #[test]
    fn without_scope_falls_back_to_unmanaged_root() {
        let (root, space) = space();
        let p = space.allocate_path(&WorkerId::current(), None, None).unwrap();
        assert_eq!(p.parent().unwrap(), root.path());
    }

    #[test]
    fn scope_close_removes_everything_allocated_in_it() {
        let (_root, space) = space();
        let w = WorkerId::named("req-1");
        let scope = space.open_scope(w.clone()).unwrap();
        let scope_dir = scope.path().to_path_buf();

        let file = space.allocate_path(&w, None, Some(".txt")).unwrap();
        fs::write(&file, b"hello").unwrap();
        let dir = space.allocate_dir(&w, None, None).unwrap();
        fs::write(dir.join("inner.bin"), b"x").unwrap();
        assert!(file.starts_with(&scope_dir));
        assert!(dir.starts_with(&scope_dir));

        scope.close().unwrap();
        assert!(!file.exists());
        assert!(!dir.exists());
        assert!(!scope_dir.exists());
        assert_eq!(space.active_dir(&w), None);
    }

    #[test]
    fn scope_is_removed_on_failure_paths() {
        let (_root, space) = space();
        let w = WorkerId::current();
        let mut leaked = PathBuf::new();
        let result: Result<(), &str> = (|| {
            let _scope = space.open_scope(w.clone()).unwrap();
            leaked = space.allocate_path(&w, None, None).unwrap();
            fs::write(&leaked, b"partial").unwrap();
            Err("work failed")
        })();
        assert!(result.is_err());
        assert!(!leaked.exists());
        assert_eq!(space.active_dir(&w), None);
    }

    #[test]
    fn nested_scopes_restore_outer() {
        let (_root, space) = space();
        let w = WorkerId::current();
        let outer = space.open_scope(w.clone()).unwrap();
        let inner = space.open_scope(w.clone()).unwrap();
        assert_eq!(space.active_dir(&w).as_deref(), Some(inner.path()));
        inner.close().unwrap();
        assert_eq!(space.active_dir(&w).as_deref(), Some(outer.path()));
        drop(outer);
        assert_eq!(space.active_dir(&w), None);
    }

    #[test]
    fn workers_do_not_share_scopes() {
        let (_root, space) = space();
        let space = Arc::new(space);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let space = Arc::clone(&space);
                std::thread::spawn(move || {
                    let w = WorkerId::current();
                    let scope = space.open_scope(w.clone()).unwrap();
                    let p = space.allocate_path(&w, None, Some(&format!("{i}"))).unwrap();
                    assert!(p.starts_with(scope.path()));
                    scope.path().to_path_buf()
                })
            })
            .collect();
        let dirs: HashSet<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(dirs.len(), 4);
        for d in dirs {
            assert!(!d.exists());
        }
    }
}
