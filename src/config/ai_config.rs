use serde::Deserialize;
use std::collections::HashMap;

/// Chat model endpoint configuration.
///
/// `api_url == None` means no model is configured; EXECUTE runs then fall back
/// to static analysis only.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AIConfig {
    pub api_url: Option<String>,
    pub model_name: String,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Partial AI Configuration for loading from files
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PartialAIConfig {
    pub api_url: Option<String>,
    pub model_name: Option<String>,
    pub temperature: Option<f32>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self::from_env_or_file(None, &HashMap::new())
    }
}

impl AIConfig {
    /// Environment wins over the file, the file wins over defaults.
    pub fn from_env_or_file(
        file_ai_config: Option<PartialAIConfig>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let file = file_ai_config.unwrap_or_default();

        let api_url = env_map
            .get("CHANGESCOPE_AI_API_URL")
            .cloned()
            .or(file.api_url)
            .filter(|url| !url.trim().is_empty());

        let model_name = env_map
            .get("CHANGESCOPE_AI_MODEL")
            .cloned()
            .or(file.model_name)
            .unwrap_or_else(default_ai_model_name);

        let temperature = env_map
            .get("CHANGESCOPE_AI_TEMPERATURE")
            .and_then(|s| s.parse().ok())
            .or(file.temperature)
            .unwrap_or_else(default_ai_temperature);

        let api_key = env_map
            .get("CHANGESCOPE_AI_API_KEY")
            .cloned()
            .or(file.api_key)
            .filter(|key| !key.is_empty());

        let timeout_secs = file.timeout_secs.unwrap_or_else(default_timeout_secs);

        AIConfig {
            api_url,
            model_name,
            temperature,
            api_key,
            timeout_secs,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_url.is_some()
    }
}

fn default_ai_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ai_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_config_from_env() {
        let mut env_map = HashMap::new();
        env_map.insert("CHANGESCOPE_AI_API_URL".to_string(), "http://test.com".to_string());
        env_map.insert("CHANGESCOPE_AI_MODEL".to_string(), "test-model".to_string());

        let config = AIConfig::from_env_or_file(None, &env_map);
        assert_eq!(config.api_url.as_deref(), Some("http://test.com"));
        assert_eq!(config.model_name, "test-model");
        assert_eq!(config.temperature, 0.2);
        assert!(config.is_configured());
    }

    #[test]
    fn test_env_overrides_file() {
        let file_config = PartialAIConfig {
            api_url: Some("http://file.com".to_string()),
            model_name: Some("file-model".to_string()),
            temperature: Some(0.7),
            api_key: Some("file-key".to_string()),
            timeout_secs: Some(30),
        };

        let mut env_map = HashMap::new();
        env_map.insert("CHANGESCOPE_AI_API_URL".to_string(), "http://env.com".to_string());
        env_map.insert("CHANGESCOPE_AI_API_KEY".to_string(), "env-key".to_string());

        let config = AIConfig::from_env_or_file(Some(file_config), &env_map);
        assert_eq!(config.api_url.as_deref(), Some("http://env.com"));
        assert_eq!(config.model_name, "file-model");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.api_key, Some("env-key".to_string()));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_blank_url_means_unconfigured() {
        let file_config = PartialAIConfig {
            api_url: Some("   ".to_string()),
            ..Default::default()
        };
        let config = AIConfig::from_env_or_file(Some(file_config), &HashMap::new());
        assert!(!config.is_configured());
        assert!(!AIConfig::default().is_configured());
    }
}
