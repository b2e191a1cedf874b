use serde::{Deserialize, Serialize};
use std::fmt;

/// How a file was touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file span of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFileRecord {
    /// Never `/dev/null`.
    pub path: String,
    pub additions: usize,
    pub deletions: usize,
    pub status: FileStatus,
}

impl DiffFileRecord {
    pub fn changed_lines(&self) -> usize {
        self.additions + self.deletions
    }
}

/// A file path paired with the raw diff text of its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub diff: String,
}

/// Change metadata collected from the repository before analysis.
#[derive(Debug, Clone, Default)]
pub struct ChangeMetadata {
    pub title: Option<String>,
    pub branch_name: String,
    pub description: Option<String>,
    pub commit_messages: Vec<String>,
}
