//! Git collaborator: diff text, branch name and commit subjects.

use crate::errors::{map_command_error, GitError};
use crate::types::git::ChangeMetadata;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Branch name used when the repository cannot tell us one.
pub const UNKNOWN_BRANCH: &str = "unknown";

#[async_trait]
pub trait GitRepository: Send + Sync {
    async fn git_diff(&self, args: &[String]) -> Result<String, GitError>;

    async fn current_branch(&self) -> Result<String, GitError>;

    /// Subjects of the most recent commits, newest first.
    async fn commit_messages(&self, limit: usize) -> Result<Vec<String>, GitError>;
}

/// Runs the `git` executable as a subprocess.
#[derive(Debug, Clone, Default)]
pub struct SystemGit {
    work_dir: Option<PathBuf>,
    log_range: Option<String>,
}

impl SystemGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Restricts `commit_messages` to a revision range such as `main..HEAD`.
    pub fn with_log_range(mut self, range: impl Into<String>) -> Self {
        self.log_range = Some(range.into());
        self
    }

    async fn run(&self, args: &[String]) -> Result<String, GitError> {
        let cmd_str = format!("git {}", args.join(" "));
        tracing::debug!("执行 Git 命令: {}", cmd_str);

        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| GitError::Spawn(cmd_str.clone(), e))?;

        if !output.status.success() {
            return Err(map_command_error(&cmd_str, output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl GitRepository for SystemGit {
    async fn git_diff(&self, args: &[String]) -> Result<String, GitError> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push("diff".to_string());
        full.push("--no-color".to_string());
        full.extend(args.iter().cloned());
        self.run(&full).await
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let out = self
            .run(&["rev-parse".to_string(), "--abbrev-ref".to_string(), "HEAD".to_string()])
            .await?;
        let branch = out.trim().to_string();
        if branch.is_empty() {
            return Err(GitError::Other("empty branch name".to_string()));
        }
        Ok(branch)
    }

    async fn commit_messages(&self, limit: usize) -> Result<Vec<String>, GitError> {
        let mut args = vec![
            "log".to_string(),
            format!("-n{}", limit),
            "--pretty=format:%s".to_string(),
        ];
        if let Some(range) = &self.log_range {
            args.push(range.clone());
        }
        let out = self.run(&args).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Gathers branch and commit metadata, replacing failures with defaults.
pub async fn collect_change_metadata(
    repo: &dyn GitRepository,
    title: Option<String>,
    branch_override: Option<String>,
    description: Option<String>,
    commit_limit: usize,
) -> ChangeMetadata {
    let branch_name = match branch_override {
        Some(branch) => branch,
        None => match repo.current_branch().await {
            Ok(branch) => branch,
            Err(e) => {
                tracing::warn!("Could not determine current branch: {}", e);
                UNKNOWN_BRANCH.to_string()
            }
        },
    };

    let commit_messages = if commit_limit == 0 {
        Vec::new()
    } else {
        repo.commit_messages(commit_limit).await.unwrap_or_else(|e| {
            tracing::warn!("Could not read commit messages: {}", e);
            Vec::new()
        })
    };

    ChangeMetadata {
        title,
        branch_name,
        description,
        commit_messages,
    }
}
