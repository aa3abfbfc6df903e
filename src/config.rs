use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{JoinError, Result};
use crate::store::RetryPolicy;

const DEFAULT_CONFIG_FILE: &str = "join.toml";
const DEFAULT_SESSION_FILE: &str = ".join/session.json";
/// Firebase emulator default
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9000";

pub const ENV_STORE_URL: &str = "JOIN_STORE_URL";
pub const ENV_STORE_AUTH: &str = "JOIN_STORE_AUTH";

/// Top-level configuration loaded from `join.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JoinConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// `[store]` block: where the database lives and how hard to try reaching it
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub base_url: String,
    pub auth: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth: None,
            timeout_secs: 10,
            max_retries: 3,
            initial_backoff_ms: 200,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}

/// `[session]` block
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl JoinConfig {
    /// Loads `path` (or `join.toml` in the working directory), then applies
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|err| {
                JoinError::ConfigError(format!("failed to read {}: {}", path.display(), err))
            })?;
            toml::from_str(&contents).map_err(|err| {
                JoinError::ConfigError(format!("{}: {}", path.display(), err))
            })?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| JoinError::ConfigError(err.to_string()))
    }

    /// Overrides store settings from `lookup` (the process environment in practice)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_STORE_URL).filter(|v| !v.trim().is_empty()) {
            self.store.base_url = url;
        }
        if let Some(auth) = lookup(ENV_STORE_AUTH).filter(|v| !v.trim().is_empty()) {
            self.store.auth = Some(auth);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.store.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(JoinError::ConfigError(format!(
                "store.base_url must be an http(s) URL, got '{}'",
                self.store.base_url
            )));
        }
        if self.store.timeout_secs == 0 {
            return Err(JoinError::ConfigError(
                "store.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
