//! Configuration settings for Svar.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub batch: BatchSettings,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for output files.
    pub result_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            result_dir: "result".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Settings for the local model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of the OpenAI-compatible server.
    pub base_url: String,
    /// API key. Local servers typically accept any value.
    pub api_key: String,
    /// Model name. None = use the first model the server advertises.
    pub model: Option<String>,
    /// Maximum tokens to generate per question.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-invocation timeout in seconds.
    pub request_timeout_seconds: u64,
    /// Maximum simultaneously in-flight model invocations across the run.
    pub max_concurrent: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: "EMPTY".to_string(),
            model: None,
            max_tokens: 2048,
            temperature: 0.6,
            request_timeout_seconds: 400,
            max_concurrent: 80,
        }
    }
}

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Number of questions dispatched per batch.
    pub batch_size: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { batch_size: 32 }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum LLM round trips per question before giving up.
    pub max_iterations: usize,
    /// Enable the cBioPortal genomics tool.
    pub enable_cbioportal: bool,
    /// Enable the bioRxiv preprint search tool.
    pub enable_biorxiv: bool,
    /// Enable the protein expression tool.
    pub enable_protein_expression: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            enable_cbioportal: true,
            enable_biorxiv: false,
            enable_protein_expression: true,
        }
    }
}

/// External data tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Base URL of the cBioPortal REST API.
    pub cbioportal_base_url: String,
    /// Maximum studies aggregated per genomics query.
    pub max_studies: usize,
    /// Timeout for tool HTTP requests in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            cbioportal_base_url: "https://www.cbioportal.org/api".to_string(),
            max_studies: 5,
            request_timeout_seconds: 60,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded result directory path.
    pub fn result_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.result_dir)
    }
}
