//! `docs init [dir]`: lay out the `.docs` folder of a project.
//!
//! ```text
//! <dir>/
//! ├── .docs/
//! │   ├── config.toml      local config layer
//! │   └── elements.toml    manifest
//! └── <CHROMADB_DIR>/      vector store (default .docs/chromadb)
//! ```
//!
//! Existing files are left untouched, so running init twice is safe.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{Config, Provenance, CHAT_MODEL, CHROMADB_DIR, CONFIG_HEADER, OLLAMA_URL};
use crate::manifest::{Manifest, MANIFEST_HEADER};

pub const DOCS_DIR: &str = ".docs";

/// Resolve the vector store directory of a project.
pub fn store_dir(root: &Path, config: &Config) -> PathBuf {
    let dir = config
        .get_string(CHROMADB_DIR)
        .unwrap_or_else(|| format!("{}/chromadb", DOCS_DIR));
    root.join(dir)
}

/// Paths created (as opposed to found) by [`ensure_directory`].
#[derive(Debug, Default)]
pub struct SetupReport {
    pub created: Vec<PathBuf>,
}

/// Create whatever part of the project layout is missing under `root`.
pub fn ensure_directory(root: &Path, config: &Config) -> Result<SetupReport> {
    let mut report = SetupReport::default();

    let docs_dir = root.join(DOCS_DIR);
    create_dir(&docs_dir, &mut report)?;

    let config_path = docs_dir.join("config.toml");
    create_file(&config_path, CONFIG_HEADER, &mut report)?;

    let manifest = Manifest::for_project(root);
    create_file(manifest.path(), MANIFEST_HEADER, &mut report)?;

    create_dir(&store_dir(root, config), &mut report)?;

    Ok(report)
}

fn create_dir(path: &Path, report: &mut SetupReport) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        report.created.push(path.to_path_buf());
    }
    Ok(())
}

fn create_file(path: &Path, content: &str, report: &mut SetupReport) -> Result<()> {
    if !path.exists() {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        report.created.push(path.to_path_buf());
    }
    Ok(())
}

/// Ask for the settings a new project most often changes. An empty answer
/// keeps the current value. Returns whether anything changed.
pub fn prompt_settings<R: BufRead, W: Write>(
    config: &mut Config,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    let mut changed = false;
    for key in [OLLAMA_URL, CHAT_MODEL] {
        let current = config.get_string(key).unwrap_or_default();
        write!(output, "{} [{}]: ", key, current)?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            break;
        }
        let answer = answer.trim();
        if !answer.is_empty() && answer != current {
            config.set(key, answer, Provenance::Runtime);
            changed = true;
        }
    }
    Ok(changed)
}
