//! Frame manifest: index → locator, persisted as JSON.
//!
//! On disk it is a flat object keyed by decimal index, each value the
//! locator's display form: `{"0": "gs://tmp/tmpa1b2c3.jpg", ...}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::locator::Locator;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<u64, Locator>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `locator` at `index`, returning the entry it replaced.
    pub fn insert(&mut self, index: u64, locator: impl Into<Locator>) -> Option<Locator> {
        self.entries.insert(index, locator.into())
    }

    pub fn get(&self, index: u64) -> Option<&Locator> {
        self.entries.get(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Locator)> {
        self.entries.iter().map(|(i, l)| (*i, l))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize manifest")
    }

    /// Writes the manifest to `path`, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("write manifest: {}", path.display()))?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read manifest: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse manifest: {}", path.display()))
    }
}

impl FromIterator<(u64, Locator)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (u64, Locator)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
