use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{RecallError, Result};

/// Main configuration structure for Recall
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Working buffer configuration
    #[serde(default)]
    pub working: WorkingConfig,
    /// Retrieval coordinator configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Completion gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Per-tier memory store endpoints
    #[serde(default)]
    pub tiers: TiersConfig,
    /// Write-back pipeline configuration
    #[serde(default)]
    pub write_back: WriteBackConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecallError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RecallError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate endpoint URLs and bounds that serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("tiers.episodic", &self.tiers.episodic.endpoint),
            ("tiers.semantic", &self.tiers.semantic.endpoint),
            ("tiers.procedural", &self.tiers.procedural.endpoint),
            ("gateway", &self.gateway.api_url),
        ] {
            Url::parse(endpoint).map_err(|e| {
                RecallError::Config(format!("invalid {name} endpoint '{endpoint}': {e}"))
            })?;
        }

        if self.working.capacity == 0 {
            return Err(RecallError::Config(
                "working.capacity must be at least 1".to_string(),
            ));
        }
        if self.retrieval.deadline_ms == 0 {
            return Err(RecallError::Config(
                "retrieval.deadline_ms must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Working buffer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkingConfig {
    /// Maximum turns retained in the working buffer
    #[serde(default = "default_working_capacity")]
    pub capacity: usize,
}

impl Default for WorkingConfig {
    fn default() -> Self {
        Self {
            capacity: default_working_capacity(),
        }
    }
}

fn default_working_capacity() -> usize {
    10
}

/// Retrieval coordinator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum episodic records per bundle
    #[serde(default = "default_episodic_limit")]
    pub episodic_limit: usize,
    /// Maximum semantic records per bundle
    #[serde(default = "default_semantic_limit")]
    pub semantic_limit: usize,
    /// Overall deadline for the retrieval fan-out, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            episodic_limit: default_episodic_limit(),
            semantic_limit: default_semantic_limit(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

fn default_episodic_limit() -> usize {
    3
}

fn default_semantic_limit() -> usize {
    15
}

fn default_deadline_ms() -> u64 {
    2000
}

/// Completion gateway configuration (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the chat-completions API
    #[serde(default = "default_gateway_url")]
    pub api_url: String,
    /// Model identifier sent with each request
    #[serde(default = "default_gateway_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_gateway_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature
    #[serde(default = "default_gateway_temperature")]
    pub temperature: f32,
    /// Maximum tokens in the generated response
    #[serde(default = "default_gateway_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: default_gateway_url(),
            model: default_gateway_model(),
            api_key_env: default_gateway_api_key_env(),
            timeout_secs: default_gateway_timeout_secs(),
            temperature: default_gateway_temperature(),
            max_tokens: default_gateway_max_tokens(),
        }
    }
}

fn default_gateway_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gateway_model() -> String {
    "gpt-4o".to_string()
}

fn default_gateway_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    60
}

fn default_gateway_temperature() -> f32 {
    0.7
}

fn default_gateway_max_tokens() -> u32 {
    1024
}

/// Endpoints for the three long-term memory tiers
#[derive(Debug, Clone, Deserialize)]
pub struct TiersConfig {
    /// Episodic store (conversation summaries)
    #[serde(default = "default_episodic_tier")]
    pub episodic: TierConfig,
    /// Semantic store (knowledge chunks)
    #[serde(default = "default_semantic_tier")]
    pub semantic: TierConfig,
    /// Procedural store (behavior rules)
    #[serde(default = "default_procedural_tier")]
    pub procedural: TierConfig,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            episodic: default_episodic_tier(),
            semantic: default_semantic_tier(),
            procedural: default_procedural_tier(),
        }
    }
}

fn default_episodic_tier() -> TierConfig {
    TierConfig::with_endpoint("http://127.0.0.1:7700/episodic")
}

fn default_semantic_tier() -> TierConfig {
    TierConfig::with_endpoint("http://127.0.0.1:7700/semantic")
}

fn default_procedural_tier() -> TierConfig {
    TierConfig::with_endpoint("http://127.0.0.1:7700/procedural")
}

/// Connection settings for one memory tier
#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    /// Base URL of the tier's store service
    pub endpoint: String,
    /// Optional environment variable holding the tier's API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Per-call timeout in seconds
    #[serde(default = "default_tier_timeout_secs")]
    pub timeout_secs: u64,
}

impl TierConfig {
    /// Tier config with defaults and the given endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key_env: None,
            timeout_secs: default_tier_timeout_secs(),
        }
    }
}

fn default_tier_timeout_secs() -> u64 {
    5
}

/// Write-back pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WriteBackConfig {
    /// When conversation summaries are written to episodic memory
    #[serde(default)]
    pub episodic_policy: EpisodicWritePolicy,
}

impl Default for WriteBackConfig {
    fn default() -> Self {
        Self {
            episodic_policy: EpisodicWritePolicy::default(),
        }
    }
}

/// When the pipeline persists conversation summaries to episodic memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EpisodicWritePolicy {
    /// Store a summary of the latest exchange after every turn
    #[default]
    PerTurn,
    /// Store one record covering the whole conversation at end
    EndOfConversation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.working.capacity, 10);
        assert_eq!(config.retrieval.episodic_limit, 3);
        assert_eq!(config.retrieval.semantic_limit, 15);
        assert_eq!(config.retrieval.deadline_ms, 2000);
        assert_eq!(config.write_back.episodic_policy, EpisodicWritePolicy::PerTurn);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(config.working.capacity, 10);
        assert_eq!(config.gateway.model, "gpt-4o");
        assert_eq!(config.tiers.episodic.timeout_secs, 5);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml_str = r#"
            [working]
            capacity = 25

            [retrieval]
            deadline_ms = 500

            [tiers.semantic]
            endpoint = "http://memories.internal:9200/semantic"
            timeout_secs = 2

            [write_back]
            episodic_policy = "end-of-conversation"
        "#;

        let config: Config = toml::from_str(toml_str).expect("parse config");
        assert_eq!(config.working.capacity, 25);
        assert_eq!(config.retrieval.deadline_ms, 500);
        assert_eq!(
            config.tiers.semantic.endpoint,
            "http://memories.internal:9200/semantic"
        );
        assert_eq!(config.tiers.semantic.timeout_secs, 2);
        // Untouched tiers keep their defaults
        assert_eq!(config.tiers.episodic.endpoint, "http://127.0.0.1:7700/episodic");
        assert_eq!(
            config.write_back.episodic_policy,
            EpisodicWritePolicy::EndOfConversation
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[working]\ncapacity = 7\n").expect("write config");

        let config = Config::load(&path).expect("load config");
        assert_eq!(config.working.capacity, 7);
        assert_eq!(config.retrieval.deadline_ms, 2000);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, RecallError::Config(_)));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[working]\ncapacity = 0\n").expect("write config");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.tiers.procedural.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.working.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let mut config = Config::default();
        config.retrieval.deadline_ms = 0;
        assert!(config.validate().is_err());
    }
}
