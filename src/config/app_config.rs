use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

use crate::errors::ConfigError;

use super::{
    ai_config::{AIConfig, PartialAIConfig},
    analysis_config::{AnalysisConfig, PartialAnalysisConfig},
    devops_config::{AccountConfig, ResolvedAccountConfig},
    loader::ConfigLoader,
    output_config::{OutputConfig, PartialOutputConfig},
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/changescope";

// Configuration file names
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Main Application Configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub ai: AIConfig,
    pub account: Option<ResolvedAccountConfig>,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    pub ai: Option<PartialAIConfig>,
    pub account: Option<AccountConfig>,
    pub analysis: Option<PartialAnalysisConfig>,
    pub output: Option<PartialOutputConfig>,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration with custom base path (for testing)
    pub fn load_with_base_path(base_path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_base_path(base_path).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let ai = AIConfig::from_env_or_file(partial.ai, &env_map);

        let account = partial.account.unwrap_or_default().merge_with_env(&env_map);
        account.validate()?;
        let account = account.resolve();

        let analysis = AnalysisConfig::from_partial(partial.analysis);
        let output = OutputConfig::from_partial(partial.output);

        Ok(AppConfig {
            ai,
            account,
            analysis,
            output,
        })
    }
}
