pub mod args;
pub mod clients;
pub mod config;
pub mod cost;
pub mod diff;
pub mod errors;
pub mod formatter;
pub mod git;
pub mod handlers;
pub mod logging;
pub mod orchestrator;
pub mod static_analysis;
pub mod tickets;
pub mod types;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use cost::analyze_devops_files;
pub use diff::parse_diff_files;
pub use errors::{AppError, ContractError};
pub use formatter::{format, ReportStyle, Verbosity};
pub use orchestrator::{AnalysisOptions, AnalysisOrchestrator};
pub use tickets::extract_ticket_references;
pub use types::analysis::{AgentResult, AnalysisMode, AnalysisModes, AnalysisOutcome, PromptOnlyResult};
