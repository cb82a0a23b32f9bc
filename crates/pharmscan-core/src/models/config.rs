//! Configuration structures for the extraction pipeline.

use std::path::{Path, PathBuf};

use pharmscan_inference::{DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL, GeminiConfig};
use serde::{Deserialize, Serialize};

use super::policy::ExtractionPolicy;

/// Main configuration for pharmscan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PharmscanConfig {
    /// Inference service configuration.
    pub gateway: GatewayConfig,

    /// Extraction behaviour.
    pub extraction: ExtractionConfig,

    /// Where extracted records are saved.
    pub output: OutputConfig,
}

/// Inference service configuration.
///
/// The API key itself is never stored here, only the name of the
/// environment variable that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Model name.
    pub model: String,

    /// API base URL.
    pub endpoint: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Sampling temperature (service default when unset).
    pub temperature: Option<f32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: None,
        }
    }
}

impl GatewayConfig {
    /// Resolve into connection settings, reading the key from the environment.
    pub fn resolve(&self) -> pharmscan_inference::Result<GeminiConfig> {
        Ok(GeminiConfig::from_env(&self.api_key_env)?
            .with_model(self.model.as_str())
            .with_endpoint(self.endpoint.as_str())
            .with_temperature(self.temperature))
    }
}

/// Extraction configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Policy used when none is given on the command line.
    pub policy: ExtractionPolicy,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV file records are appended to.
    pub csv_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("extracted_invoices.csv"),
        }
    }
}

impl PharmscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
