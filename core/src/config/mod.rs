//! Configuration management
//!
//! File config, then environment overrides, then whatever the caller
//! applies from the command line.

pub mod env;
pub mod store;

pub use env::EnvConfig;
pub use store::{AgentSettings, AppConfig, Config, ExecutorConfig, ProviderConfig, RetrySettings};

use std::path::Path;

/// Load the config file (default location unless `path` is given) and
/// apply environment overrides.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    EnvConfig::apply(&mut config);
    Ok(config)
}
