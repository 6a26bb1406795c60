//! Application configuration loaded from YAML.
//!
//! Every section is optional and falls back to its defaults, so an empty
//! file (or no file at all) yields a working configuration pointed at a
//! local OpenAI-compatible server.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use docqa_rag::RagConfig;
use docqa_rag::openai::SamplingParams;
use serde::{Deserialize, Serialize};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "docqa.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Chunking and retrieval parameters.
    pub rag: RagConfig,
    /// Embedding backend.
    pub embedding: EmbeddingConfig,
    /// Generation backend.
    pub llm: LlmConfig,
    /// Vector store location.
    pub storage: StorageConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Output width of the model.
    pub dimensions: usize,
    /// Environment variable holding the API key, if the server needs one.
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            api_key_env: None,
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Chat model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Environment variable holding the API key, if the server needs one.
    pub api_key_env: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let sampling = SamplingParams::default();
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "llama-3-8b-instruct".to_string(),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
            api_key_env: None,
        }
    }
}

impl LlmConfig {
    /// The sampling parameters for the chat provider.
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the persisted snapshot.
    pub persist_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { persist_directory: PathBuf::from("./data/vectors") }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `docqa_rag=debug`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read if present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Parse YAML text. Empty text yields the defaults.
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.rag.validate()?;
        if self.embedding.dimensions == 0 {
            bail!("embedding.dimensions must be greater than zero");
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than zero");
        }
        Ok(())
    }
}

/// Read an API key from the named environment variable, or an empty key.
pub fn api_key(env: Option<&str>) -> anyhow::Result<String> {
    match env {
        Some(name) => std::env::var(name)
            .with_context(|| format!("environment variable {name} is not set")),
        None => Ok(String::new()),
    }
}
