//! The element manifest, `.docs/elements.toml`.
//!
//! A TOML table keyed by element name:
//!
//! ```toml
//! [serde]
//! version = "1.0.210"
//! updated_at = "2026-01-05T10:12:44.120331Z"
//! content = "..."
//! ```
//!
//! Writes are full read-merge-write cycles with no locking; two processes
//! writing at once can lose an update.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_HEADER: &str = "# Languages, libraries, frameworks and tools in use\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub version: String,
    pub updated_at: DateTime<Utc>,
    pub content: String,
}

pub type ManifestEntries = BTreeMap<String, ManifestEntry>;

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The manifest of a project rooted at `root`.
    pub fn for_project(root: &Path) -> Self {
        Self::new(root.join(".docs").join("elements.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry. A missing or empty file has no entries.
    pub fn read(&self) -> Result<ManifestEntries> {
        read_entries(&self.path)
    }

    /// Replace the file with `entries`.
    pub fn write(&self, entries: &ManifestEntries) -> Result<()> {
        let body = toml::to_string(entries).context("Failed to serialize manifest")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, format!("{}{}", MANIFEST_HEADER, body))
            .with_context(|| format!("Failed to write manifest: {}", self.path.display()))?;
        Ok(())
    }

    /// Load, overwrite the entry for `name`, write back.
    pub fn merge(&self, name: &str, entry: ManifestEntry) -> Result<()> {
        let mut entries = self.read()?;
        entries.insert(name.to_string(), entry);
        self.write(&entries)
    }
}

pub fn read_entries(path: &Path) -> Result<ManifestEntries> {
    if !path.exists() {
        return Ok(ManifestEntries::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}
