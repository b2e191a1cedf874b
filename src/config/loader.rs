use std::{collections::HashMap, env, fs, path::PathBuf};

use crate::errors::ConfigError;

use super::app_config::{AppConfig, PartialAppConfig, CONFIG_FILE_NAME, USER_CONFIG_PATH};

const ENV_KEYS: [&str; 6] = [
    // AI config
    "CHANGESCOPE_AI_API_URL",
    "CHANGESCOPE_AI_MODEL",
    "CHANGESCOPE_AI_TEMPERATURE",
    "CHANGESCOPE_AI_API_KEY",
    // Issue tracker config
    "CHANGESCOPE_TRACKER_BASE_URL",
    "CHANGESCOPE_TRACKER_TOKEN",
];

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Load complete application configuration. A missing file is not an error.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let config_path = self.config_file_path();
        let partial = self.load_partial_config(&config_path)?;
        let env_map = self.collect_env_vars();
        AppConfig::from_partial_and_env(partial, env_map)
    }

    /// Path of `config.toml`, with tilde expansion and base path override
    pub fn config_file_path(&self) -> PathBuf {
        let base_dir = match &self.base_path {
            Some(base_path) => base_path.join(USER_CONFIG_PATH.trim_start_matches("~/")),
            None => PathBuf::from(shellexpand::tilde(USER_CONFIG_PATH).as_ref()),
        };
        base_dir.join(CONFIG_FILE_NAME)
    }

    fn load_partial_config(&self, path: &PathBuf) -> Result<Option<PartialAppConfig>, ConfigError> {
        if !path.exists() {
            tracing::debug!("配置文件 {} 不存在，使用默认配置", path.display());
            return Ok(None);
        }

        let path_str = path.to_string_lossy().to_string();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path_str.clone(), e))?;
        let partial: PartialAppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::TomlParse(path_str.clone(), e))?;

        tracing::info!("已加载配置文件: {}", path_str);
        Ok(Some(partial))
    }

    fn collect_env_vars(&self) -> HashMap<String, String> {
        let mut env_map = HashMap::new();
        for key in &ENV_KEYS {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) {
        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());
        let path = loader.config_file_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());
        let partial = loader.load_partial_config(&loader.config_file_path()).unwrap();
        assert!(partial.is_none());
    }

    #[test]
    fn test_loads_sections_from_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
[ai]
api_url = "http://localhost:11434/v1/chat/completions"
model_name = "qwen2.5:32b"

[analysis]
default_project_prefix = "SHOP"
compliance_threshold = 80

[analysis.confidence]
commit = 60

[output]
verbosity = "detailed"
style = "markdown"
"#,
        );

        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());
        let partial = loader
            .load_partial_config(&loader.config_file_path())
            .unwrap();
        let config = AppConfig::from_partial_and_env(partial, HashMap::new()).unwrap();

        assert_eq!(config.ai.model_name, "qwen2.5:32b");
        assert!(config.ai.is_configured());
        assert_eq!(config.analysis.default_project_prefix.as_deref(), Some("SHOP"));
        assert_eq!(config.analysis.compliance_threshold, 80);
        assert_eq!(config.analysis.confidence.commit, 60);
        assert_eq!(config.analysis.confidence.title, 95);
        assert_eq!(config.output.verbosity, "detailed");
        assert_eq!(config.output.style, "markdown");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[ai\nbroken");
        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());
        let err = loader
            .load_partial_config(&loader.config_file_path())
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_, _)));
    }
}
