//! Elements: named, versioned documentation snippets.
//!
//! An element is persisted twice: into the manifest file and into the
//! vector collection. [`Element::save`] performs the two writes one after the
//! other with nothing tying them together, so a failed upsert after a
//! successful manifest write leaves the two out of step until the element is
//! saved again.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

use crate::manifest::{self, Manifest, ManifestEntry};
use crate::models::{ElementMetadata, VectorRecord};
use crate::store::VectorStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub version: String,
    pub content: String,
    /// Stamped when the element is constructed, not when it is saved.
    pub updated_at: DateTime<Utc>,
}

impl Element {
    /// Create an element stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if any of `name`, `version`, or `content` is blank.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self> {
        let element = Self {
            name: name.into(),
            version: version.into(),
            content: content.into(),
            updated_at: Utc::now(),
        };
        element.validate()?;
        Ok(element)
    }

    /// Name, version and content must each hold more than whitespace.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Element name must not be empty");
        }
        if self.version.trim().is_empty() {
            bail!("Element '{}' has an empty version", self.name);
        }
        if self.content.trim().is_empty() {
            bail!("Element '{}' has empty content", self.name);
        }
        Ok(())
    }

    pub fn metadata(&self) -> ElementMetadata {
        ElementMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            updated_at: self.updated_at,
        }
    }

    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            version: self.version.clone(),
            updated_at: self.updated_at,
            content: self.content.clone(),
        }
    }

    /// Merge into the manifest, then upsert into `store`.
    ///
    /// Not transactional: if the upsert fails the manifest has already been
    /// rewritten. Either failure is returned.
    pub async fn save(&self, manifest: &Manifest, store: &dyn VectorStore) -> Result<()> {
        manifest
            .merge(&self.name, self.manifest_entry())
            .with_context(|| format!("Failed to write '{}' to the manifest", self.name))?;
        store.upsert(self).await.with_context(|| {
            format!(
                "Manifest updated but vector store upsert failed for '{}'",
                self.name
            )
        })?;
        tracing::debug!("Saved {} ({})", self, self.updated_at);
        Ok(())
    }

    /// Load every element in the manifest at `path`, keeping stored
    /// timestamps. An absent or empty manifest yields no elements. Entries
    /// that fail [`Element::validate`] are skipped with a warning.
    pub fn from_manifest(path: &Path) -> Result<Vec<Element>> {
        let entries = manifest::read_entries(path)?;
        let mut elements = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let element = Element {
                name,
                version: entry.version,
                content: entry.content,
                updated_at: entry.updated_at,
            };
            match element.validate() {
                Ok(()) => elements.push(element),
                Err(e) => tracing::warn!(
                    "Skipping invalid manifest entry in {}: {:#}",
                    path.display(),
                    e
                ),
            }
        }
        Ok(elements)
    }
}

impl From<&VectorRecord> for Element {
    fn from(record: &VectorRecord) -> Self {
        Element {
            name: record.id.clone(),
            version: record.metadata.version.clone(),
            content: record.document.clone(),
            updated_at: record.metadata.updated_at,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchHit;
    use crate::store::memory::InMemoryVectorStore;
    use crate::store::UpsertOutcome;
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Manifest, InMemoryVectorStore) {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::for_project(tmp.path());
        (tmp, manifest, InMemoryVectorStore::new())
    }

    #[test]
    fn new_rejects_empty_fields() {
        assert!(Element::new("", "1.0", "docs").is_err());
        assert!(Element::new("lib", " ", "docs").is_err());
        assert!(Element::new("lib", "1.0", "").is_err());
        assert!(Element::new("lib", "1.0", "  \n\t").is_err());
        let e = Element::new("lib", "1.0", "docs").unwrap();
        assert_eq!(e.to_string(), "lib-1.0");
    }

    #[tokio::test]
    async fn save_writes_manifest_and_store() {
        let (_tmp, manifest, store) = setup();
        let element = Element::new("TestLib", "1.0", "This is a test library.").unwrap();
        element.save(&manifest, &store).await.unwrap();

        let entries = manifest.read().unwrap();
        assert_eq!(entries["TestLib"].version, "1.0");
        assert_eq!(entries["TestLib"].updated_at, element.updated_at);

        let hits = store.search("TestLib", None).await.unwrap();
        let hit = &hits[0].record;
        assert_eq!(hit.id, "TestLib");
        assert_eq!(hit.document, "This is a test library.");
        assert_eq!(hit.metadata, element.metadata());
    }

    #[tokio::test]
    async fn same_name_overwrites_in_both_stores() {
        let (_tmp, manifest, store) = setup();
        Element::new("tool", "1.0", "first")
            .unwrap()
            .save(&manifest, &store)
            .await
            .unwrap();
        Element::new("tool", "2.0", "second")
            .unwrap()
            .save(&manifest, &store)
            .await
            .unwrap();

        let entries = manifest.read().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["tool"].version, "2.0");

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].metadata.version, "2.0");
        assert_eq!(all[0].document, "second");
    }

    #[tokio::test]
    async fn from_manifest_returns_saved_elements() {
        let (_tmp, manifest, store) = setup();
        let saved = vec![
            Element::new("LibA", "1.0", "Content for LibA.").unwrap(),
            Element::new("LibB", "2.0", "Content for LibB.").unwrap(),
            Element::new("LibC", "0.3.1", "Content for LibC.").unwrap(),
        ];
        for e in &saved {
            e.save(&manifest, &store).await.unwrap();
        }

        let loaded = Element::from_manifest(manifest.path()).unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn from_manifest_absent_or_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("elements.toml");
        assert!(Element::from_manifest(&path).unwrap().is_empty());
        std::fs::write(&path, "").unwrap();
        assert!(Element::from_manifest(&path).unwrap().is_empty());
    }

    #[test]
    fn from_manifest_skips_invalid_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("elements.toml");
        std::fs::write(
            &path,
            r#"[blank_version]
version = ""
updated_at = "2026-01-01T00:00:00Z"
content = "docs"

[blank_content]
version = "1.0"
updated_at = "2026-01-01T00:00:00Z"
content = "   "

[good]
version = "2.0"
updated_at = "2026-01-02T03:04:05.250Z"
content = "Real documentation."
"#,
        )
        .unwrap();

        let loaded = Element::from_manifest(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "good");
        assert_eq!(loaded[0].version, "2.0");
        assert_eq!(
            loaded[0].updated_at,
            "2026-01-02T03:04:05.250Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(loaded.iter().all(|e| e.validate().is_ok()));
    }

    struct RejectingStore;

    #[async_trait]
    impl VectorStore for RejectingStore {
        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
        async fn get_all(&self) -> Result<Vec<VectorRecord>> {
            Ok(Vec::new())
        }
        async fn get(&self, _id: &str) -> Result<Option<VectorRecord>> {
            Ok(None)
        }
        async fn search(&self, _query: &str, _count: Option<usize>) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }
        async fn upsert(&self, _element: &Element) -> Result<UpsertOutcome> {
            bail!("disk full")
        }
    }

    #[tokio::test]
    async fn upsert_failure_propagates_after_manifest_write() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::for_project(tmp.path());
        let element = Element::new("tool", "1.0", "docs").unwrap();

        let err = element.save(&manifest, &RejectingStore).await.unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));

        // The manifest write is not rolled back.
        assert_eq!(manifest.read().unwrap()["tool"].version, "1.0");
    }
}
