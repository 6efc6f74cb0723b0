//! Bootstrap configuration and root folder resolution
//!
//! Bootstrap settings live in a small TOML file. Everything that may change
//! at runtime (API keys entered later, lock timeouts) lives in the database
//! `settings` table instead.
//!
//! Root folder priority:
//! 1. Command-line argument
//! 2. `SCHOLAR_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "SCHOLAR_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "scholar.db";

/// Blob directory name inside the root folder
pub const BLOB_DIR: &str = "exam-images";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Data root (database + blobs)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generative/embedding service key (lowest priority source)
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Override for the generative service endpoint (proxies, regional mirrors)
    #[serde(default)]
    pub gemini_base_url: Option<String>,

    /// Base URL under which stored exam images are publicly reachable
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Service-specific pipeline table, decoded by the owning service
    #[serde(default)]
    pub pipeline: Option<toml::Value>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform path of the TOML file for a service, e.g.
/// `~/.config/scholar-lens/scholar-ai.toml`
pub fn config_file_path(service_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scholar-lens").join(format!("{}.toml", service_name)))
}

/// Load TOML bootstrap config
///
/// A missing file is not an error: defaults are returned and a warning is
/// logged. A present but unparsable file is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the data root folder
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("scholar-lens"))
        .unwrap_or_else(|| PathBuf::from("./scholar_data"))
}

/// Create the root folder (and blob directory) if missing
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root.join(BLOB_DIR))?;
    Ok(())
}

/// Database path inside a root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE)
}

/// Blob directory inside a root folder
pub fn blob_root(root: &Path) -> PathBuf {
    root.join(BLOB_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_toml_config(Path::new("/nonexistent/scholar/none.toml")).unwrap();
        assert!(config.root_folder.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &config);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_paths_inside_root() {
        let root = Path::new("/data/scholar");
        assert_eq!(database_path(root), PathBuf::from("/data/scholar/scholar.db"));
        assert_eq!(blob_root(root), PathBuf::from("/data/scholar/exam-images"));
    }
}
