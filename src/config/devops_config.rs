use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Issue tracker account.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct AccountConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub retry_count: Option<u32>,
}

/// An account with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccountConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: u64,
    pub retry_count: u32,
}

impl AccountConfig {
    /// `None` unless both url and token are present and non-empty.
    pub fn resolve(self) -> Option<ResolvedAccountConfig> {
        let base_url = self.base_url.filter(|u| !u.is_empty())?;
        let token = self.token.filter(|t| !t.is_empty())?;

        Some(ResolvedAccountConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout: self.timeout.unwrap_or(10_000),
            retry_count: self.retry_count.unwrap_or(3),
        })
    }

    /// Environment values override the file.
    pub fn merge_with_env(mut self, env_map: &HashMap<String, String>) -> Self {
        if let Some(url) = env_map.get("CHANGESCOPE_TRACKER_BASE_URL") {
            self.base_url = Some(url.clone());
        }
        if let Some(token) = env_map.get("CHANGESCOPE_TRACKER_TOKEN") {
            self.token = Some(token.clone());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref token) = self.token {
            if token.is_empty() {
                return Err(ConfigError::EmptyToken);
            }
        }

        if let Some(ref url) = self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }

        Ok(())
    }
}
