//! Application configuration.
//!
//! Reads `agentflow.yaml`, resolving `${VAR}` / `${VAR:-default}` before
//! parsing. Every section is optional; missing sections take their defaults.
//!
//! ```yaml
//! server:
//!   bind: "127.0.0.1:9002"
//!   default_session: default
//!   session_header: x-session-id
//! storage:
//!   backend: sqlite
//!   path: "${AGENTFLOW_DB:-~/.agentflow/datasets.db}"
//! models:
//!   active_model: local
//!   models:
//!     local:
//!       display_name: "Llama 3.1 8B"
//!       runtime: ollama
//!       model_name: "llama3.1:8b"
//!       base_url: "http://localhost:11434/v1"
//!       force_json_response: true
//!   fallback_chain: [local, static_response]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::inference::config::{expand_tilde, interpolate_env_vars};
use crate::inference::ModelsConfig;

/// Configuration file name searched for on disk.
pub const CONFIG_FILE_NAME: &str = "agentflow.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find {CONFIG_FILE_NAME} (searched upward from {})", start.display())]
    NotFound { start: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

// ─── Sections ───────────────────────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Session used when a request names none.
    pub default_session: String,
    /// Header that may carry the session id.
    pub session_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9002".to_string(),
            default_session: "default".to_string(),
            session_header: "x-session-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Dataset store settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file; defaults to `<data_dir>/datasets.db`.
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn sqlite_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(expand_tilde(p)),
            None => crate::data_dir().join("datasets.db"),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub models: ModelsConfig,
}

impl AppConfig {
    /// Locate and load the configuration starting from the working directory.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let path = find_config_path(&cwd)?;
        let config = load_config(&path)?;
        Ok((config, path))
    }
}

// ─── Loading ────────────────────────────────────────────────────────────────

/// Find `agentflow.yaml`.
///
/// Order: `AGENTFLOW_CONFIG` (a file path), then
/// `AGENTFLOW_PROJECT_ROOT/agentflow.yaml`, then each directory from `start`
/// upward.
pub fn find_config_path(start: &Path) -> Result<PathBuf, ConfigError> {
    search_config_path(
        start,
        std::env::var("AGENTFLOW_CONFIG").ok().as_deref(),
        std::env::var("AGENTFLOW_PROJECT_ROOT").ok().as_deref(),
    )
}

fn search_config_path(
    start: &Path,
    explicit: Option<&str>,
    project_root: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        let candidate = PathBuf::from(expand_tilde(path));
        if candidate.is_file() {
            return Ok(candidate);
        }
        tracing::warn!(path = %candidate.display(), "AGENTFLOW_CONFIG does not point to a file");
    }

    if let Some(root) = project_root {
        let candidate = PathBuf::from(expand_tilde(root)).join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(ConfigError::NotFound {
        start: start.to_path_buf(),
    })
}

/// Read, interpolate, and parse a configuration file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_config(raw: &str) -> Result<AppConfig, String> {
    let interpolated = interpolate_env_vars(raw);
    // An empty file is a valid all-defaults config.
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| e.to_string())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
