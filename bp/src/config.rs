//! Budget planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); `--log-level` wins
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Ledger database configuration
    pub store: StoreConfig,

    /// Orchestrator limits and policies
    pub planner: PlannerConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the LLM API key environment variable is set. Call this
    /// before building an LLM client to fail fast with a clear message.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(self.llm.api_key_env()).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env()
            ));
        }
        if self.planner.llm_timeout_ms == 0 || self.planner.store_timeout_ms == 0 {
            return Err(eyre::eyre!("planner timeouts must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .budgetplanner.yml
        let local_config = PathBuf::from(".budgetplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/budgetplanner/budgetplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("budgetplanner").join("budgetplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
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
    /// Provider name ("openai" or "anthropic")
    pub provider: String,

    /// Model identifier; provider default when unset
    pub model: Option<String>,

    /// Environment variable containing the API key; provider default when unset
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// API base URL; provider default when unset
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 1000,
            temperature: 0.0,
            timeout_ms: 60_000,
        }
    }
}

/// Model, key variable and endpoint used when a provider's fields are left unset
struct ProviderDefaults {
    model: &'static str,
    api_key_env: &'static str,
    base_url: &'static str,
}

const OPENAI_DEFAULTS: ProviderDefaults = ProviderDefaults {
    model: "gpt-4o",
    api_key_env: "OPENAI_API_KEY",
    base_url: "https://api.openai.com",
};

const ANTHROPIC_DEFAULTS: ProviderDefaults = ProviderDefaults {
    model: "claude-sonnet-4-20250514",
    api_key_env: "ANTHROPIC_API_KEY",
    base_url: "https://api.anthropic.com",
};

impl LlmConfig {
    fn defaults(&self) -> &'static ProviderDefaults {
        match self.provider.as_str() {
            "anthropic" => &ANTHROPIC_DEFAULTS,
            _ => &OPENAI_DEFAULTS,
        }
    }

    /// Configured model, or the provider's default
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.defaults().model)
    }

    /// Configured key variable, or the provider's default
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(self.defaults().api_key_env)
    }

    /// Configured base URL without a trailing slash, or the provider's default
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.defaults().base_url)
            .trim_end_matches('/')
    }

    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        let var = self.api_key_env();
        std::env::var(var).context(format!("Environment variable {} is not set", var))
    }
}

/// Ledger database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file; when absent the chat runs without a data store
    pub path: Option<PathBuf>,

    /// User the generated queries are scoped to
    #[serde(rename = "user-id")]
    pub user_id: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: None, user_id: 1 }
    }
}

impl StoreConfig {
    /// Database the chat should use, if any
    ///
    /// An explicit `path` always counts; otherwise the default file is used
    /// only once `bp db init` has created it.
    pub fn chat_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(path.clone()),
            None => Some(self.path_or_default()).filter(|p| p.exists()),
        }
    }

    /// The configured path, or the default under the XDG data directory
    pub fn path_or_default(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("budgetplanner")
                .join("ledger.db")
        })
    }
}

/// How generated queries are checked before they reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryGuard {
    /// Execute exactly what the model wrote
    Verbatim,
    /// One statement, whose verb matches the request kind; reads use a read-only connection
    Statement,
}

/// Orchestrator limits and policies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum number of prompt regenerations per message
    #[serde(rename = "max-refinements")]
    pub max_refinements: u32,

    /// Timeout for each LLM call in milliseconds
    #[serde(rename = "llm-timeout-ms")]
    pub llm_timeout_ms: u64,

    /// Timeout for each store call in milliseconds
    #[serde(rename = "store-timeout-ms")]
    pub store_timeout_ms: u64,

    /// Generated-query policy
    #[serde(rename = "query-guard")]
    pub query_guard: QueryGuard,

    /// Maximum rows included in prompts built from query results
    #[serde(rename = "max-prompt-rows")]
    pub max_prompt_rows: usize,

    /// Directory with `.pmt` overrides for the embedded prompts
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_refinements: 3,
            llm_timeout_ms: 60_000,
            store_timeout_ms: 10_000,
            query_guard: QueryGuard::Statement,
            max_prompt_rows: 50,
            prompts_dir: None,
        }
    }
}

impl PlannerConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
