//! Store configuration: where data lives and how chatty the logs are.
//!
//! Project-level config: `.chatindex/config.yaml`
//!
//! Resolution: explicit file → project file → defaults, then the
//! `CHATINDEX_DATA_DIR` env var overrides `data_dir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Project-level config file, relative to the working directory.
pub const PROJECT_CONFIG: &str = ".chatindex/config.yaml";

/// Env var overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "CHATINDEX_DATA_DIR";

/// Standard `tracing` filter env var; overrides `log_filter` when set.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Directory holding the store's WAL.
    pub data_dir: PathBuf,
    /// `tracing` filter directives. Replaced wholesale by a non-empty `RUST_LOG`.
    pub log_filter: String,
    /// fsync after every WAL append.
    pub sync_writes: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".chatindex/data"),
            log_filter: "chatindex=info".into(),
            sync_writes: true,
        }
    }
}

impl ChatConfig {
    /// Load config, preferring `explicit` over the project file.
    /// Missing or unparsable files fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit.unwrap_or_else(|| Path::new(PROJECT_CONFIG));
        let mut config = Self::load_file(path);
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Load just one file.
    fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("ignoring unparsable config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(filter) = var(LOG_FILTER_ENV).filter(|f| !f.is_empty()) {
            self.log_filter = filter;
        }
    }

    /// Write this config as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|e| format!("YAML serialize error: {e}"))?;
        std::fs::write(path, yaml).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        Ok(())
    }
}
