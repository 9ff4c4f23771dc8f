/// Configuration module for DevSite.
///
/// Handles loading, validating, and providing default configuration values
/// for the two corpus stores, retrieval depths, and model identifiers.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::router::RouterPolicy;

/// Environment variable overriding the chat model identifier.
pub const MODEL_ENV_VAR: &str = "DEVSITE_MODEL";

// ── Default value functions ──────────────────────────────────────────

fn default_docs_db_path() -> String {
    "./devsite_docs.db".to_string()
}

fn default_code_db_path() -> String {
    "./devsite_code.db".to_string()
}

fn default_docs_top_k() -> usize {
    8
}

fn default_code_top_k() -> usize {
    5
}

fn default_chat_model() -> String {
    "gpt-oss:20b".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_docs_db_path")]
    pub docs_db_path: String,

    #[serde(default = "default_code_db_path")]
    pub code_db_path: String,

    #[serde(default = "default_docs_top_k")]
    pub docs_top_k: usize,

    #[serde(default = "default_code_top_k")]
    pub code_top_k: usize,

    #[serde(default)]
    pub router_policy: RouterPolicy,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_db_path: default_docs_db_path(),
            code_db_path: default_code_db_path(),
            docs_top_k: default_docs_top_k(),
            code_top_k: default_code_top_k(),
            router_policy: RouterPolicy::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            dimensions: default_dimensions(),
            ollama_url: default_ollama_url(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.docs_top_k > 0, "docs_top_k must be positive");
        anyhow::ensure!(self.code_top_k > 0, "code_top_k must be positive");
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        anyhow::ensure!(
            !self.model.chat_model.is_empty(),
            "model.chat_model must not be empty"
        );
        anyhow::ensure!(
            !self.model.embedding_model.is_empty(),
            "model.embedding_model must not be empty"
        );
        Ok(())
    }

    /// Resolve the chat model identifier: the `DEVSITE_MODEL` environment
    /// variable wins over a `--model` flag, which wins over the config value.
    #[must_use]
    pub fn resolve_chat_model(&self, flag: Option<&str>) -> String {
        if let Ok(env_model) = std::env::var(MODEL_ENV_VAR) {
            if !env_model.is_empty() {
                return env_model;
            }
        }
        flag.map(str::to_string)
            .unwrap_or_else(|| self.model.chat_model.clone())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.docs_top_k, 8);
        assert_eq!(config.code_top_k, 5);
        assert_eq!(config.model.dimensions, 768);
        assert_eq!(config.model.chat_model, "gpt-oss:20b");
        assert_eq!(config.model.embedding_model, "nomic-embed-text");
        assert_eq!(config.router_policy, RouterPolicy::DocsDefault);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"code_top_k": 10, "docs_db_path": "./test_docs.db"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.code_top_k, 10);
        assert_eq!(config.docs_db_path, "./test_docs.db");
        // Other fields should have defaults
        assert_eq!(config.docs_top_k, 8);
        assert_eq!(config.model.dimensions, 768);
    }

    #[test]
    fn test_router_policy_from_json() {
        let json = r#"{"router_policy": "both-default"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.router_policy, RouterPolicy::BothDefault);
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_top_k() {
        let mut config = Config::default();
        config.docs_top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = Config::default();
        config.model.chat_model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_chat_model_flag_over_config() {
        let config = Config::default();
        // No env var set in tests that rely on the flag path
        unsafe { std::env::remove_var(MODEL_ENV_VAR) };
        assert_eq!(config.resolve_chat_model(Some("llama3.1:8b")), "llama3.1:8b");
        assert_eq!(config.resolve_chat_model(None), "gpt-oss:20b");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.docs_db_path, config.docs_db_path);
        assert_eq!(parsed.code_top_k, config.code_top_k);
        assert_eq!(parsed.model.chat_model, config.model.chat_model);
    }
}
