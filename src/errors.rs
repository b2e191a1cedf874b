use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Git command error: {0}")]
    Git(#[from] GitError),
    #[error("AI interaction error: {0}")]
    AI(#[from] AIError),
    #[error("Issue tracker error: {0}")]
    DevOps(#[from] DevOpsError),
    #[error("Invalid usage: {0}")]
    Contract(#[from] ContractError),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error),
    #[error("Application error: {0}")]
    Generic(String),
}

/// Failures talking to the issue tracker.
///
/// None of these ever abort an analysis: the orchestrator logs them and
/// continues without ticket details.
#[derive(Debug, Error)]
pub enum DevOpsError {
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Authentication failed: Invalid token")]
    AuthenticationError,

    #[error("API rate limit exceeded, please try again later")]
    RateLimitExceeded,

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Response data parsing failed: {0}")]
    ParseError(reqwest::Error),

    #[error("Request timed out")]
    TimeoutError,

    #[error("Unexpected response structure from API: {0}")]
    UnexpectedResponseStructure(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Wrong url format: {0}")]
    InvalidUrl(String),
    #[error("Empty token")]
    EmptyToken,
}

#[derive(Debug)]
pub enum GitError {
    CommandFailed {
        command: String,
        status_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    Spawn(String, std::io::Error),
    NotARepository,
    Other(String),
}

#[derive(Debug, Error)]
pub enum AIError {
    #[error("AI API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("AI API responded with error {0}: {1}")]
    ApiResponseError(reqwest::StatusCode, String),
    #[error("AI API response contained no choices.")]
    NoChoiceInResponse,
    #[error("AI returned an empty message.")]
    EmptyMessage,
    #[error("AI response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("AI response for stage '{step}' does not match its schema: {message}")]
    SchemaMismatch { step: String, message: String },
    #[error("No language model is configured")]
    Unavailable,
}

/// Caller defects. Unlike every other error class these abort the pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("unknown verbosity '{0}' (expected minimal, compact, standard, detailed or verbose)")]
    InvalidVerbosity(String),
    #[error("unknown analysis mode '{0}' (expected execute or prompt-only)")]
    InvalidMode(String),
    #[error("unknown report style '{0}' (expected console or markdown)")]
    InvalidReportStyle(String),
    #[error("invalid ticket pattern '{pattern}': {message}")]
    InvalidTicketPattern { pattern: String, message: String },
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::CommandFailed {
                command,
                status_code,
                stdout,
                stderr,
            } => {
                write!(f, "Git command '{}' failed", command)?;
                if let Some(c) = status_code {
                    write!(f, " with exit code {}", c)?;
                }
                if !stdout.is_empty() {
                    write!(f, "\nStdout:\n{}", stdout)?;
                }
                if !stderr.is_empty() {
                    write!(f, "\nStderr:\n{}", stderr)?;
                }
                Ok(())
            }
            GitError::Spawn(command, e) => write!(f, "Failed to run '{}': {}", command, e),
            GitError::NotARepository => write!(
                f,
                "Not a git repository (or any of the parent directories)."
            ),
            GitError::Other(s) => write!(f, "Git error: {}", s),
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::Spawn(_, e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IO("I/O operation failed".to_string(), err)
    }
}

/// Builds a `GitError::CommandFailed` from a finished process.
///
/// `status_code` is `None` when the process was terminated by a signal.
pub fn map_command_error(cmd_str: &str, output: std::process::Output) -> GitError {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if stderr.contains("not a git repository") {
        return GitError::NotARepository;
    }
    GitError::CommandFailed {
        command: cmd_str.to_string(),
        status_code: output.status.code(),
        stdout,
        stderr,
    }
}
