//! Configuration loading, validation, and management for StrataChat.
//!
//! Loads configuration from `~/.stratachat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stratachat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key shared by providers that don't set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default temperature for completions
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider entries keyed by name; each is assigned to a routing tier.
    /// Order within a tier follows the order of this table in the TOML file.
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    /// Routing configuration
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Tiered memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Custom per-model pricing overrides (model name → per-1M-token prices)
    #[serde(default)]
    pub custom_pricing: HashMap<String, PricingOverrideConfig>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("routing", &self.routing)
            .field("memory", &self.memory)
            .field("embedding", &self.embedding)
            .field("gateway", &self.gateway)
            .field("custom_pricing", &self.custom_pricing)
            .finish()
    }
}

/// One configured provider and its tier assignment.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider name: "openrouter", "openai", "anthropic", "deepseek",
    /// "groq", "ollama", or any OpenAI-compatible endpoint name.
    pub name: String,

    /// The model this entry targets
    pub model: String,

    /// Routing tier: "fast", "mid", "reasoning"
    pub tier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tier", &self.tier)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Per-attempt provider timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the classification call in seconds
    #[serde(default = "default_classifier_timeout")]
    pub classifier_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}
fn default_classifier_timeout() -> u64 {
    10
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            classifier_timeout_secs: default_classifier_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Token budget for the hot (verbatim) buffer per session
    #[serde(default = "default_hot_budget")]
    pub hot_budget_tokens: usize,

    /// Maximum turns kept verbatim after a summarization fold
    #[serde(default = "default_keep_recent")]
    pub keep_recent_turns: usize,

    /// Top-K cold entries recalled per query
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Minimum similarity for a cold entry to be recalled
    #[serde(default = "default_recall_min_score")]
    pub recall_min_score: f32,

    /// Hot/Warm state is evicted (LRU) beyond this many live sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_hot_budget() -> usize {
    2048
}
fn default_keep_recent() -> usize {
    10
}
fn default_recall_limit() -> usize {
    5
}
fn default_recall_min_score() -> f32 {
    0.2
}
fn default_max_sessions() -> usize {
    1024
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            hot_budget_tokens: default_hot_budget(),
            keep_recent_turns: default_keep_recent(),
            recall_limit: default_recall_limit(),
            recall_min_score: default_recall_min_score(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider name ("openai", "openrouter", "none")
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding call timeout in seconds
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

fn default_embedding_provider() -> String {
    "openai".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embed_timeout() -> u64 {
    10
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            timeout_secs: default_embed_timeout(),
            api_key: None,
            api_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    47810
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
}

const KNOWN_TIERS: [&str; 3] = ["fast", "mid", "reasoning"];

impl AppConfig {
    /// Load configuration from the default path (~/.stratachat/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `STRATACHAT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    /// - `ANTHROPIC_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("STRATACHAT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stratachat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.memory.hot_budget_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "memory.hot_budget_tokens must be > 0".into(),
            ));
        }

        if self.memory.keep_recent_turns == 0 {
            return Err(ConfigError::ValidationError(
                "memory.keep_recent_turns must be > 0".into(),
            ));
        }

        if self.memory.recall_limit == 0 {
            return Err(ConfigError::ValidationError(
                "memory.recall_limit must be > 0".into(),
            ));
        }

        for entry in &self.providers {
            if !KNOWN_TIERS.contains(&entry.tier.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' has unknown tier '{}' (expected one of: {})",
                    entry.name,
                    entry.tier,
                    KNOWN_TIERS.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Providers assigned to a given tier, in file order.
    pub fn providers_in_tier(&self, tier: &str) -> Vec<&ProviderEntry> {
        self.providers.iter().filter(|p| p.tier == tier).collect()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self {
            providers: vec![
                ProviderEntry {
                    name: "openrouter".into(),
                    model: "meta-llama/llama-3.1-8b-instruct".into(),
                    tier: "fast".into(),
                    api_key: None,
                    api_url: None,
                },
                ProviderEntry {
                    name: "anthropic".into(),
                    model: "claude-sonnet-4".into(),
                    tier: "mid".into(),
                    api_key: None,
                    api_url: None,
                },
                ProviderEntry {
                    name: "deepseek".into(),
                    model: "deepseek-r1".into(),
                    tier: "reasoning".into(),
                    api_key: None,
                    api_url: None,
                },
            ],
            ..Self::default()
        };
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: vec![],
            routing: RoutingConfig::default(),
            memory: MemoryConfig::default(),
            embedding: EmbeddingConfig::default(),
            gateway: GatewayConfig::default(),
            custom_pricing: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.hot_budget_tokens, 2048);
        assert_eq!(config.memory.recall_limit, 5);
        assert_eq!(config.gateway.port, 47810);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.memory.hot_budget_tokens,
            config.memory.hot_budget_tokens
        );
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_hot_budget_rejected() {
        let mut config = AppConfig::default();
        config.memory.hot_budget_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_tier_rejected() {
        let config = AppConfig {
            providers: vec![ProviderEntry {
                name: "openai".into(),
                model: "gpt-4o".into(),
                tier: "turbo".into(),
                api_key: None,
                api_url: None,
            }],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("turbo"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().memory.keep_recent_turns, 10);
    }

    #[test]
    fn provider_entries_parse_with_tiers() {
        let toml_str = r#"
[[providers]]
name = "openrouter"
model = "meta-llama/llama-3.1-8b-instruct"
tier = "fast"

[[providers]]
name = "anthropic"
model = "claude-sonnet-4"
tier = "mid"

[[providers]]
name = "deepseek"
model = "deepseek-r1"
tier = "reasoning"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers_in_tier("fast").len(), 1);
        assert_eq!(config.providers_in_tier("mid").len(), 1);
        assert_eq!(config.providers_in_tier("reasoning")[0].name, "deepseek");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("hot_budget_tokens"));
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
