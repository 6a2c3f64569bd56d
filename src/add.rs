//! `docs add <tool> [<version>]...`
//!
//! Versions double as the location of the documentation (a URL or a file
//! path) until real version detection exists. A tool without a version is
//! skipped with a warning.

use anyhow::Result;

use crate::acquire::TextSource;
use crate::element::Element;
use crate::manifest::Manifest;
use crate::store::VectorStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub tool: String,
    pub version: Option<String>,
}

/// Pair up alternating `tool version tool version ...` arguments. A trailing
/// tool gets no version.
pub fn pair_arguments(args: &[String]) -> Vec<AddRequest> {
    args.chunks(2)
        .map(|pair| AddRequest {
            tool: pair[0].clone(),
            version: pair.get(1).cloned(),
        })
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    /// Tool name and error message.
    pub failed: Vec<(String, String)>,
}

/// Acquire and save each requested tool. Failures are per tool.
pub async fn run_add(
    requests: &[AddRequest],
    manifest: &Manifest,
    store: &dyn VectorStore,
    source: &dyn TextSource,
) -> Result<AddReport> {
    let mut report = AddReport::default();

    for request in requests {
        let Some(version) = request.version.as_deref() else {
            tracing::warn!("No version specified for tool '{}'. Skipping.", request.tool);
            tracing::debug!("Version detection is not implemented.");
            report.skipped.push(request.tool.clone());
            continue;
        };

        match add_one(&request.tool, version, manifest, store, source).await {
            Ok(()) => {
                tracing::info!(
                    "Successfully added documentation for '{}' from '{}'.",
                    request.tool,
                    version
                );
                report.added.push(request.tool.clone());
            }
            Err(e) => {
                tracing::error!(
                    "Failed to add documentation for '{}' from '{}': {:#}",
                    request.tool,
                    version,
                    e
                );
                report.failed.push((request.tool.clone(), format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

async fn add_one(
    tool: &str,
    version: &str,
    manifest: &Manifest,
    store: &dyn VectorStore,
    source: &dyn TextSource,
) -> Result<()> {
    let text = source.acquire(tool, version).await?;
    tracing::debug!("Obtained documentation for '{}' from '{}'.", tool, version);
    Element::new(tool, version, text)?.save(manifest, store).await
}
