use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::core::error::{PathquillError, Result};
use crate::{
    DEFAULT_ASSET, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_LLM_MAX_TOKENS,
    DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_REGISTRY_URL,
};

/// Runtime configuration, layered from defaults, an optional TOML file and
/// `PATHQUILL_*` environment variables. Credentials supplied per request
/// (form fields, CLI flags) take precedence over anything configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathquillConfig {
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,
    pub llm_max_tokens: u32,

    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,

    pub registry_url: String,
    pub registry_token: Option<String>,
    pub asset_name: String,
    pub data_dir: Option<PathBuf>,

    pub timeout: u64,
    pub max_retries: u32,

    pub cache_size: usize,
    pub cache_ttl: u64,

    pub server_host: String,
    pub server_port: u16,
}

impl PathquillConfig {
    /// Builds the layered configuration. With no explicit path, a
    /// `pathquill.toml` next to the working directory is picked up if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(p) => builder.add_source(File::from(p)),
            None => builder.add_source(File::with_name("pathquill").required(false)),
        };
        builder = builder.add_source(Environment::with_prefix("PATHQUILL"));

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| PathquillError::Config(e.to_string()))
    }

    /// Environment-only configuration, for surfaces with no config file.
    pub fn from_env() -> Result<Self> {
        Config::builder()
            .add_source(Environment::with_prefix("PATHQUILL"))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| PathquillError::Config(e.to_string()))
    }

    /// Root directory for credentials, downloaded assets and the store.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("pathquill")
        })
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir().join("assets")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir().join("store")
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for PathquillConfig {
    fn default() -> Self {
        Self {
            llm_provider: "openai".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.2,
            llm_max_tokens: DEFAULT_LLM_MAX_TOKENS,

            llm_fallback_enabled: false,
            llm_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: "llama3.2".to_string(),

            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_token: None,
            asset_name: DEFAULT_ASSET.to_string(),
            data_dir: None,

            timeout: 120,
            max_retries: 3,

            cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl: DEFAULT_CACHE_TTL,

            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
        }
    }
}
