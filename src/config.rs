use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CompanionError, Result};

/// Environment variable holding the Gemini API credential.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP front-end listens on.
    /// Can be overridden with the `COMPANION_BIND` env var.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// System instruction sent with every request.  Empty means the built-in
    /// prompt matching `generation.response_format`.
    #[serde(default)]
    pub system_prompt: String,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

// -- Gemini ------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Model identifier (e.g. "gemini-1.5-flash", "gemini-2.5-pro").
    /// Can be overridden with the `GEMINI_MODEL` env var.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL, without the `/models/...` suffix.
    /// Can be overridden with the `GEMINI_BASE_URL` env var.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key.  `GOOGLE_API_KEY` takes precedence when set.
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds (0 = client default of 300s).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// -- Generation --------------------------------------------------------------

/// Shape the final answer is expected to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free text, rendered with line breaks preserved.
    #[default]
    Text,
    /// A JSON object with `code`, `explanation` and `dependencies` fields.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub top_p: Option<f32>,

    #[serde(default)]
    pub top_k: Option<u32>,

    #[serde(default)]
    pub stop_sequences: Vec<String>,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: None,
            top_k: None,
            stop_sequences: Vec::new(),
            max_output_tokens: None,
            response_format: ResponseFormat::default(),
        }
    }
}

// -- Tools -------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Send tool declarations to the model so it can ask for a syntax check.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            system_prompt: String::new(),
            gemini: GeminiConfig::default(),
            generation: GenerationConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the given path, or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let config = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)
                .map_err(|e| CompanionError::Config(format!("parse error: {e}")))?
        } else {
            info!("no config file found, using defaults");
            Config::default()
        };

        Ok(config)
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/code-companion/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("code-companion")
            .join("config.toml")
    }

    /// Apply `GEMINI_MODEL`, `GEMINI_BASE_URL` and `COMPANION_BIND` from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(model) = non_empty("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = non_empty("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(bind) = non_empty("COMPANION_BIND") {
            self.bind = bind;
        }
    }

    /// Resolve the API credential: `GOOGLE_API_KEY` first, then `gemini.api_key`.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_from(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_from(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|k| !k.is_empty())
            .or_else(|| {
                if self.gemini.api_key.is_empty() {
                    None
                } else {
                    Some(self.gemini.api_key.clone())
                }
            })
            .ok_or_else(|| {
                CompanionError::Config(format!(
                    "Gemini API key required: set {API_KEY_ENV} env var or gemini.api_key in config"
                ))
            })
    }

    /// Generate the default config file contents.
    pub fn default_config_contents() -> &'static str {
        include_str!("../config.example.toml")
    }
}
