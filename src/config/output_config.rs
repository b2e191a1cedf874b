use serde::Deserialize;

/// Report rendering defaults. Values are validated when the report is built.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_verbosity")]
    pub verbosity: String,

    /// `console` or `markdown`
    #[serde(default = "default_style")]
    pub style: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PartialOutputConfig {
    pub verbosity: Option<String>,
    pub style: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_partial(None)
    }
}

impl OutputConfig {
    pub fn from_partial(partial: Option<PartialOutputConfig>) -> Self {
        let partial = partial.unwrap_or_default();
        Self {
            verbosity: partial.verbosity.unwrap_or_else(default_verbosity),
            style: partial.style.unwrap_or_else(default_style),
        }
    }
}

fn default_verbosity() -> String {
    "standard".to_string()
}

fn default_style() -> String {
    "console".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_config() {
        let config = OutputConfig::default();
        assert_eq!(config.verbosity, "standard");
        assert_eq!(config.style, "console");
    }

    #[test]
    fn test_from_partial() {
        let config = OutputConfig::from_partial(Some(PartialOutputConfig {
            verbosity: Some("verbose".to_string()),
            style: None,
        }));
        assert_eq!(config.verbosity, "verbose");
        assert_eq!(config.style, "console");
    }
}
