//! Configuration Store
//!
//! Loads and saves the TOML config file and turns it into the settings the
//! client, retry wrapper, executor and agent loop are built from.

use crate::agent::DEFAULT_MAX_TURNS;
use crate::error::{AgentError, OptionExt, Result};
use crate::executor::CommandExecutor;
use crate::llm::{LlmConfig, RetryPolicy, DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sitesmith configuration
///
/// Every section is optional in the file; anything missing falls back to
/// its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model provider connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Agent loop behaviour
    #[serde(default)]
    pub agent: AgentSettings,

    /// Shell command execution
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` if it exists, otherwise defaults.
    ///
    /// A file that exists but does not parse is an error, not a silent
    /// fallback.
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            crate::debug_log!("Loading config from {}", path.display());
            Self::load(path)
        } else {
            crate::debug_log!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from the default location, or defaults if there is no file.
    pub fn load_or_default() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_or_default_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sitesmith").join("config.toml"))
    }

    /// Reject settings the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.agent.retry.max_attempts == 0 {
            return Err(AgentError::InvalidConfig {
                message: "agent.retry.max_attempts must be at least 1".to_string(),
            });
        }
        if self.provider.timeout_secs == 0 {
            return Err(AgentError::InvalidConfig {
                message: "provider.timeout_secs must be at least 1".to_string(),
            });
        }
        if self.provider.model.trim().is_empty() {
            return Err(AgentError::InvalidConfig {
                message: "provider.model must not be empty".to_string(),
            });
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(AgentError::InvalidConfig {
                message: "provider.base_url must not be empty".to_string(),
            });
        }
        if let Some(t) = self.provider.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(AgentError::InvalidConfig {
                    message: format!("provider.temperature must be between 0.0 and 2.0, got {}", t),
                });
            }
        }
        Ok(())
    }

    /// Client settings for the provider section.
    ///
    /// Fails with a missing-config error when no API key is set anywhere.
    pub fn llm_config(&self) -> Result<LlmConfig> {
        let api_key = self
            .provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_missing("provider.api_key")?;

        let mut config = LlmConfig::new(api_key)
            .with_base_url(self.provider.base_url.clone())
            .with_model(self.provider.model.clone());
        config.timeout_secs = self.provider.timeout_secs;
        if let Some(tokens) = self.provider.max_output_tokens {
            config = config.with_max_output_tokens(tokens);
        }
        if let Some(temp) = self.provider.temperature {
            config = config.with_temperature(temp);
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.agent.retry.max_attempts,
            Duration::from_secs(self.agent.retry.delay_secs),
        )
    }

    pub fn command_executor(&self) -> CommandExecutor {
        let mut executor = CommandExecutor::new()
            .with_timeout(self.executor.timeout_secs.map(Duration::from_secs));
        if let Some(dir) = &self.executor.working_dir {
            executor = executor.with_working_dir(dir.clone());
        }
        executor
    }

    /// Log file from config, or the per-user default.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.app
            .log_file
            .clone()
            .or_else(crate::agent::logger::default_log_path)
    }
}

/// Model provider connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Usually supplied through the environment instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    300
}

/// Agent loop behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Model calls allowed per goal; 0 means no limit
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Echo tool results to the terminal
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            verbose: false,
            retry: RetrySettings::default(),
        }
    }
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

/// Rate-limit retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_secs() -> u64 {
    35
}

/// Shell command execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Kill commands that run longer than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Directory commands run in; the current directory if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}
