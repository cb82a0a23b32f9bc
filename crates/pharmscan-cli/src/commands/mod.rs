//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::path::{Path, PathBuf};

use pharmscan_core::PharmscanConfig;
use tracing::debug;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pharmscan")
        .join("config.json")
}

/// Resolve the configuration file: the explicit path, else the default one.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration.
///
/// An explicit path must exist. The default path is optional and falls
/// back to built-in defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<PharmscanConfig> {
    if let Some(path) = explicit {
        return PharmscanConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e));
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(PharmscanConfig::from_file(&path)?)
    } else {
        Ok(PharmscanConfig::default())
    }
}
