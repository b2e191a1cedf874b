pub mod ai_config;
pub mod analysis_config;
pub mod app_config;
pub mod devops_config;
pub mod loader;
pub mod output_config;

// Re-export commonly used types
pub use ai_config::AIConfig;
pub use analysis_config::{AnalysisConfig, ConfidenceWeights};
pub use app_config::AppConfig;
pub use devops_config::{AccountConfig, ResolvedAccountConfig};
pub use output_config::OutputConfig;

pub use app_config::{CONFIG_FILE_NAME, USER_CONFIG_PATH};
