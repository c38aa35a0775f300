//! IX Studio configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AiEngine, CreativityLevel};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Durable storage
    pub storage: StorageConfig,

    /// Settings a new session starts with
    pub defaults: DefaultsConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Check that the LLM API key is available
    ///
    /// Only needed for commands that call the model directly.
    pub fn validate_llm(&self) -> Result<()> {
        if !crate::llm::PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(eyre::eyre!(
                "Unknown LLM provider '{}'. Supported: {}",
                self.llm.provider,
                crate::llm::PROVIDERS.join(", ")
            ));
        }
        if self.llm.api_key().is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let read = |path: &Path| -> Option<String> {
            let content = fs::read_to_string(path).ok()?;
            serde_yaml::from_str::<Self>(&content).ok()?.log_level
        };

        if let Some(path) = config_path {
            return read(path);
        }
        Self::candidates()
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| read(&p))
    }

    /// `./.ixstudio.yml`, then `<config_dir>/ixstudio/ixstudio.yml`
    fn candidates() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(".ixstudio.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("ixstudio").join("ixstudio.yml"));
        }
        candidates
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("xai" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// The API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "xai".to_string(),
            model: "grok-beta".to_string(),
            api_key_env: "XAI_API_KEY".to_string(),
            base_url: "https://api.x.ai".to_string(),
            max_tokens: 500,
            timeout_ms: 60_000,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the key-value store
    pub path: PathBuf,

    /// Optional byte quota, mimicking browser storage limits
    #[serde(rename = "quota-bytes")]
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: keystore::config::default_store_path(),
            quota_bytes: None,
        }
    }
}

/// Session defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub level: CreativityLevel,
    pub engine: AiEngine,
}

/// Prompt template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory checked before `.ixstudio/prompts/`
    pub dir: Option<PathBuf>,
}
