//! Sync/update engine behind `docs update` (alias `docs pull`).
//!
//! Walks every record in the vector store, decides whether it is stale, and
//! re-acquires and re-saves the stale ones. A failure on one element is
//! logged and counted; the remaining elements are still processed. There is
//! no retry.

use anyhow::Result;

use crate::acquire::TextSource;
use crate::element::Element;
use crate::manifest::Manifest;
use crate::store::VectorStore;

/// Decides staleness from the stored version and the current one. Returns
/// `true` when the element needs updating.
pub type VersionComparator = fn(stored: &str, current: &str) -> bool;

/// The default comparator: any difference means stale.
pub fn versions_differ(stored: &str, current: &str) -> bool {
    stored != current
}

/// Whether `name` needs updating to `current_version`. Missing records
/// always do.
pub async fn needs_update(
    name: &str,
    current_version: &str,
    store: &dyn VectorStore,
) -> Result<bool> {
    needs_update_with(name, current_version, store, versions_differ).await
}

pub async fn needs_update_with(
    name: &str,
    current_version: &str,
    store: &dyn VectorStore,
    comparator: VersionComparator,
) -> Result<bool> {
    Ok(match store.get(name).await? {
        Some(record) => comparator(&record.metadata.version, current_version),
        None => true,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    /// Update every element regardless of version.
    pub force: bool,
    pub comparator: VersionComparator,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            force: false,
            comparator: versions_differ,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    pub up_to_date: Vec<String>,
    /// Element label and error message.
    pub failed: Vec<(String, String)>,
}

/// Update every stored element that is stale (or all of them with `force`).
///
/// Only reading the record list can fail the whole run.
pub async fn run_update(
    options: &UpdateOptions,
    store: &dyn VectorStore,
    manifest: &Manifest,
    source: &dyn TextSource,
) -> Result<UpdateReport> {
    let records = store.get_all().await?;
    let mut report = UpdateReport::default();

    for record in records {
        let name = record.metadata.name.clone();
        let version = record.metadata.version.clone();
        let label = format!("{}-{}", name, version);

        let stale = if options.force {
            true
        } else {
            match needs_update_with(&name, &version, store, options.comparator).await {
                Ok(stale) => stale,
                Err(e) => {
                    tracing::error!("Failed to check '{}': {:#}", label, e);
                    report.failed.push((label, format!("{:#}", e)));
                    continue;
                }
            }
        };

        if !stale {
            tracing::info!("Documentation for '{}' is already up to date.", label);
            report.up_to_date.push(label);
            continue;
        }

        tracing::info!("Updating documentation for '{}'...", label);
        match refresh(&name, &version, store, manifest, source).await {
            Ok(()) => {
                tracing::info!("Successfully updated documentation for '{}'.", label);
                report.updated.push(label);
            }
            Err(e) => {
                tracing::error!("Failed to update documentation for '{}': {:#}", label, e);
                report.failed.push((label, format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

async fn refresh(
    name: &str,
    version: &str,
    store: &dyn VectorStore,
    manifest: &Manifest,
    source: &dyn TextSource,
) -> Result<()> {
    let text = source.acquire(name, version).await?;
    tracing::debug!("Obtained updated documentation for '{}-{}'.", name, version);
    Element::new(name, version, text)?.save(manifest, store).await
}
