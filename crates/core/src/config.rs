//! Configuration management for the DocChat workflow.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (docchat.yaml)
//!
//! The workflow knobs (`max_rounds`, `top_k`, timeouts, concurrency) are
//! validated here so the orchestrator can rely on them being positive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Primary LLM provider (e.g., "gemini", "openai", "scripted")
    pub provider: String,

    /// Fallback LLM provider tried when the primary fails
    pub fallback_provider: Option<String>,

    /// Default model identifier
    pub model: String,

    /// API key for the primary LLM provider
    pub api_key: Option<String>,

    /// Hard ceiling on research/verify rounds per query
    pub max_rounds: u32,

    /// Number of evidence chunks retrieved per search method
    pub top_k: u32,

    /// Timeout for each external stage call, in seconds
    pub stage_timeout_secs: u64,

    /// Maximum number of concurrently processed queries
    pub max_concurrent_queries: usize,

    /// Weight of the lexical ranking in fusion (0.0 - 1.0)
    pub lexical_weight: f32,

    /// Weight of the semantic ranking in fusion (0.0 - 1.0)
    pub semantic_weight: f32,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,
}

/// LLM configuration from docchat.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "fallbackProvider")]
    pub fallback_provider: Option<String>,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "organizationEnv")]
        organization_env: Option<String>,
    },
}

impl ProviderConfig {
    /// Get the model name for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::Gemini { model, .. } => model,
            Self::OpenAI { model, .. } => model,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workflow: Option<WorkflowConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkflowConfig {
    max_rounds: Option<u32>,
    top_k: Option<u32>,
    stage_timeout_secs: Option<u64>,
    max_concurrent_queries: Option<usize>,
    lexical_weight: Option<f32>,
    semantic_weight: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            provider: "gemini".to_string(),
            fallback_provider: Some("openai".to_string()),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            max_rounds: 2,
            top_k: 5,
            stage_timeout_secs: 60,
            max_concurrent_queries: 8,
            lexical_weight: 0.4,
            semantic_weight: 0.6,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `DOCCHAT_CONFIG`: Path to config file
    /// - `DOCCHAT_PROVIDER`: Primary LLM provider
    /// - `DOCCHAT_MODEL`: Model identifier
    /// - `DOCCHAT_API_KEY`: API key
    /// - `DOCCHAT_MAX_ROUNDS`: Round ceiling override
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("DOCCHAT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Load from YAML config file if it exists
        if let Some(config_path) = config.config_file.clone() {
            if !config_path.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    config_path
                )));
            }
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCCHAT_MODEL") {
            config.model = model;
        }

        if let Ok(rounds) = std::env::var("DOCCHAT_MAX_ROUNDS") {
            config.max_rounds = rounds.parse().map_err(|_| {
                AppError::Config(format!("Invalid DOCCHAT_MAX_ROUNDS value: {}", rounds))
            })?;
        }

        config.api_key = std::env::var("DOCCHAT_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        // Merge workflow settings
        if let Some(workflow) = config_file.workflow {
            if let Some(max_rounds) = workflow.max_rounds {
                result.max_rounds = max_rounds;
            }
            if let Some(top_k) = workflow.top_k {
                result.top_k = top_k;
            }
            if let Some(timeout) = workflow.stage_timeout_secs {
                result.stage_timeout_secs = timeout;
            }
            if let Some(concurrency) = workflow.max_concurrent_queries {
                result.max_concurrent_queries = concurrency;
            }
            if let Some(w) = workflow.lexical_weight {
                result.lexical_weight = w;
            }
            if let Some(w) = workflow.semantic_weight {
                result.semantic_weight = w;
            }
        }

        // Merge logging settings
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        // Merge LLM settings
        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            result.fallback_provider = llm.fallback_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and YAML.
    pub fn with_overrides(
        mut self,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        max_rounds: Option<u32>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> AppResult<Self> {
        // A config file given on the command line is merged first, so the
        // remaining flags still override its contents
        if let Some(config_file) = config_file {
            if !config_file.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    config_file
                )));
            }
            self = self.merge_yaml(&config_file)?;
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(max_rounds) = max_rounds {
            self.max_rounds = max_rounds;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        Ok(self)
    }

    /// Get the active provider configuration.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key for a provider from its configured environment
    /// variable, falling back to `DOCCHAT_API_KEY`.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(provider_config) = self.get_provider_config(provider) {
            let env_var = match provider_config {
                ProviderConfig::Gemini { api_key_env, .. } => api_key_env,
                ProviderConfig::OpenAI { api_key_env, .. } => api_key_env,
            };
            if let Ok(key) = std::env::var(&env_var) {
                return Some(key);
            }
        }

        self.api_key.clone()
    }

    /// Validate configuration.
    ///
    /// The round ceiling, retrieval depth, and concurrency limit must all be
    /// positive: `max_rounds` bounds an otherwise-unbounded loop and is a
    /// hard requirement, never inferred.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["gemini", "openai", "scripted"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(ref fallback) = self.fallback_provider {
            if !known_providers.contains(&fallback.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown fallback provider: {}",
                    fallback
                )));
            }
        }

        if self.max_rounds == 0 {
            return Err(AppError::Config(
                "max_rounds must be positive (it bounds the research loop)".to_string(),
            ));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be positive".to_string()));
        }

        if self.stage_timeout_secs == 0 {
            return Err(AppError::Config(
                "stage_timeout_secs must be positive".to_string(),
            ));
        }

        if self.max_concurrent_queries == 0 {
            return Err(AppError::Config(
                "max_concurrent_queries must be positive".to_string(),
            ));
        }

        if self.lexical_weight < 0.0 || self.semantic_weight < 0.0 {
            return Err(AppError::Config(
                "fusion weights must be non-negative".to_string(),
            ));
        }

        if self.lexical_weight + self.semantic_weight <= 0.0 {
            return Err(AppError::Config(
                "at least one fusion weight must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
