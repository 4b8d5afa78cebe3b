//! Environment variable overrides
//!
//! Applied on top of the file config and below command-line flags.

use crate::config::store::Config;

pub const API_KEY_VAR: &str = "SITESMITH_API_KEY";
/// Read when `SITESMITH_API_KEY` is unset
pub const FALLBACK_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "SITESMITH_MODEL";
pub const MAX_TURNS_VAR: &str = "SITESMITH_MAX_TURNS";
pub const BASE_URL_VAR: &str = "SITESMITH_BASE_URL";

/// Environment variable configuration loader
pub struct EnvConfig;

impl EnvConfig {
    /// Apply overrides from the process environment.
    pub fn apply(config: &mut Config) {
        Self::apply_from(config, |key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` in place of the environment.
    pub fn apply_from<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_VAR).or_else(|| non_empty(FALLBACK_API_KEY_VAR)) {
            config.provider.api_key = Some(key);
        }

        if let Some(model) = non_empty(MODEL_VAR) {
            config.provider.model = model;
        }

        if let Some(url) = non_empty(BASE_URL_VAR) {
            config.provider.base_url = url;
        }

        if let Some(val) = non_empty(MAX_TURNS_VAR) {
            match val.trim().parse() {
                Ok(turns) => config.agent.max_turns = turns,
                Err(_) => crate::warn_log!("Ignoring {}={:?}: not a number", MAX_TURNS_VAR, val),
            }
        }
    }
}
