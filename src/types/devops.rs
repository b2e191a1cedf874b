use serde::{Deserialize, Serialize};

/// Issue as returned by a Jira-compatible REST endpoint (`/rest/api/2/issue/{key}`).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IssueResponse {
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IssueFields {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<NamedField>,
    #[serde(default, rename = "issuetype")]
    pub issue_type: Option<NamedField>,
    #[serde(default)]
    pub priority: Option<NamedField>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NamedField {
    pub name: String,
}

/// Ticket details the analysis works with, independent of the tracker wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub key: String,
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl From<IssueResponse> for Ticket {
    fn from(issue: IssueResponse) -> Self {
        Ticket {
            key: issue.key.to_uppercase(),
            title: issue.fields.summary,
            description: issue.fields.description.unwrap_or_default(),
            status: issue.fields.status.map(|s| s.name),
            issue_type: issue.fields.issue_type.map(|t| t.name),
            priority: issue.fields.priority.map(|p| p.name),
            labels: issue.fields.labels,
        }
    }
}
