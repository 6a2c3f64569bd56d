//! Layered configuration.
//!
//! Values are resolved in this order, each layer overwriting the keys it
//! defines:
//!
//! 1. the built-in default table
//! 2. the global config file (`<config dir>/docs_agent/config.toml`)
//! 3. the local project file (`.docs/config.toml`)
//! 4. environment variables named after a default key
//!
//! Every entry remembers which layer wrote it last ([`Provenance`]).
//! Unreadable or malformed files are reported with a warning and treated as
//! empty.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const OLLAMA_URL: &str = "OLLAMA_URL";
pub const CHAT_MODEL: &str = "CHAT_MODEL";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const OLLAMA_USERNAME: &str = "OLLAMA_USERNAME";
pub const OLLAMA_PASSWORD: &str = "OLLAMA_PASSWORD";
pub const CHROMADB_DIR: &str = "CHROMADB_DIR";
pub const MAX_TOKENS: &str = "MAX_TOKENS";
pub const SYSTEM_PROMPT: &str = "SYSTEM_PROMPT";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer questions \
about the languages, libraries, frameworks and tools used in this project concisely, and say \
so when you are not sure.";

pub const CONFIG_HEADER: &str = "# Docs agent configuration\n";

/// A scalar configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            ConfigValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Str(_) => None,
        }
    }

    fn to_toml(&self) -> toml::Value {
        match self {
            ConfigValue::Str(s) => toml::Value::String(s.clone()),
            ConfigValue::Int(i) => toml::Value::Integer(*i),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Default,
    GlobalFile,
    LocalFile,
    Environment,
    Runtime,
    Dictionary,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Default => "default",
            Provenance::GlobalFile => "global config file",
            Provenance::LocalFile => "local config file",
            Provenance::Environment => "environment variable",
            Provenance::Runtime => "set at runtime",
            Provenance::Dictionary => "from dictionary",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub value: ConfigValue,
    pub defined_in: Provenance,
}

/// The built-in default table.
pub fn defaults() -> Vec<(&'static str, ConfigValue)> {
    vec![
        (OLLAMA_URL, "http://localhost:11434".into()),
        (CHAT_MODEL, "llama2".into()),
        (EMBEDDING_MODEL, "text-embedding-3-small".into()),
        (OLLAMA_USERNAME, "".into()),
        (OLLAMA_PASSWORD, "".into()),
        (CHROMADB_DIR, ".docs/chromadb".into()),
        (MAX_TOKENS, 4096.into()),
        (SYSTEM_PROMPT, DEFAULT_SYSTEM_PROMPT.into()),
    ]
}

fn default_value(key: &str) -> Option<ConfigValue> {
    defaults()
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// File locations for the global and local layers.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub local: PathBuf,
}

impl ConfigPaths {
    /// Paths for a project rooted at `root`. `global_override` replaces the
    /// platform config location when given.
    pub fn for_project(root: &Path, global_override: Option<PathBuf>) -> Self {
        Self {
            global: global_override.or_else(default_global_path),
            local: root.join(".docs").join("config.toml"),
        }
    }
}

pub fn default_global_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docs_agent").join("config.toml"))
}

/// Resolved configuration: key → (value, provenance).
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: BTreeMap<String, ConfigEntry>,
}

impl Config {
    /// Only the default table.
    pub fn defaults() -> Self {
        let mut config = Config::default();
        for (key, value) in defaults() {
            config.set(key, value, Provenance::Default);
        }
        config
    }

    /// Load all layers, reading overrides from the process environment.
    pub fn load(paths: &ConfigPaths) -> Self {
        Self::load_with_env(paths, std::env::vars())
    }

    /// Load all layers with an explicit environment.
    pub fn load_with_env<I>(paths: &ConfigPaths, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::defaults();
        if let Some(global) = &paths.global {
            config.merge_file(global, Provenance::GlobalFile);
        }
        config.merge_file(&paths.local, Provenance::LocalFile);
        config.merge_env(env);
        config
    }

    /// Build a config from plain key/value pairs, tagged `from dictionary`.
    pub fn from_map<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        let mut config = Config::default();
        for (key, value) in values {
            config.set(key, value, Provenance::Dictionary);
        }
        config
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &str) -> Option<&ConfigEntry> {
        self.entries.get(key)
    }

    /// String form of a value, whatever its type. Empty strings count as unset.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.to_string())
            .filter(|s| !s.is_empty())
    }

    /// Integer value, also accepting strings that parse as integers.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Set a value in memory. Nothing is written until [`Config::save`].
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>, defined_in: Provenance) {
        self.entries.insert(
            key.into(),
            ConfigEntry {
                value: value.into(),
                defined_in,
            },
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigEntry)> {
        self.entries.iter()
    }

    fn merge_file(&mut self, path: &Path, provenance: Provenance) {
        for (key, value) in read_config_file(path) {
            self.set(key, value, provenance);
        }
    }

    fn merge_env<I>(&mut self, env: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, raw) in env {
            if default_value(&key).is_none() {
                continue;
            }
            let value = coerce(&key, raw);
            self.set(key, value, Provenance::Environment);
        }
    }

    /// Write every current value to `path`, not just the local overrides.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut table = toml::Table::new();
        for (key, entry) in &self.entries {
            table.insert(key.clone(), entry.value.to_toml());
        }
        let body = toml::to_string(&table).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, format!("{}{}", CONFIG_HEADER, body))
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

/// Parse a raw string into the type of the key's default. Keys without a
/// default, or integers that do not parse, stay strings.
pub fn coerce(key: &str, raw: String) -> ConfigValue {
    match default_value(key) {
        Some(ConfigValue::Int(_)) => match raw.trim().parse::<i64>() {
            Ok(i) => ConfigValue::Int(i),
            Err(_) => {
                tracing::warn!("{} expects an integer, keeping '{}' as text", key, raw);
                ConfigValue::Str(raw)
            }
        },
        _ => ConfigValue::Str(raw),
    }
}

/// Read a flat TOML table of scalars. A missing file is empty; an unreadable
/// or malformed one is logged and treated as empty.
pub fn read_config_file(path: &Path) -> BTreeMap<String, ConfigValue> {
    let mut values = BTreeMap::new();
    if !path.exists() {
        return values;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Could not read config file {}: {}", path.display(), e);
            return values;
        }
    };

    let table: toml::Table = match toml::from_str(&content) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(
                "Ignoring malformed config file {}: {}",
                path.display(),
                e.message()
            );
            return values;
        }
    };

    for (key, value) in table {
        let value = match value {
            toml::Value::String(s) => ConfigValue::Str(s),
            toml::Value::Integer(i) => ConfigValue::Int(i),
            toml::Value::Boolean(b) => ConfigValue::Str(b.to_string()),
            toml::Value::Float(f) => ConfigValue::Str(f.to_string()),
            toml::Value::Datetime(d) => ConfigValue::Str(d.to_string()),
            toml::Value::Array(_) | toml::Value::Table(_) => {
                tracing::warn!(
                    "Ignoring non-scalar key '{}' in {}",
                    key,
                    path.display()
                );
                continue;
            }
        };
        values.insert(key, value);
    }
    values
}

/// Backs `docs config <option> [<value>]`.
///
/// With a value, sets it at runtime and persists the whole config to the
/// local file. Returns the resulting entry, or `None` when the option is not
/// set.
pub fn get_or_set_option(
    config: &mut Config,
    option: &str,
    value: Option<String>,
    local_path: &Path,
) -> Result<Option<ConfigEntry>> {
    if let Some(raw) = value {
        let value = coerce(option, raw);
        config.set(option, value, Provenance::Runtime);
        config.save(local_path)?;
        tracing::debug!("Saved '{}' to {}", option, local_path.display());
    }
    Ok(config.entry(option).cloned())
}
