use serde::{Deserialize, Serialize};
use std::fmt;

/// Infrastructure-as-code flavour a file was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraFileType {
    Terraform,
    Cloudformation,
    Docker,
    Kubernetes,
    GithubActions,
    Serverless,
}

impl InfraFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfraFileType::Terraform => "terraform",
            InfraFileType::Cloudformation => "cloudformation",
            InfraFileType::Docker => "docker",
            InfraFileType::Kubernetes => "kubernetes",
            InfraFileType::GithubActions => "github_actions",
            InfraFileType::Serverless => "serverless",
        }
    }

    /// Only these flavours declare billable cloud resources we can price.
    pub fn declares_resources(&self) -> bool {
        matches!(
            self,
            InfraFileType::Terraform | InfraFileType::Cloudformation | InfraFileType::Serverless
        )
    }
}

impl fmt::Display for InfraFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostConfidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for CostConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CostConfidence::High => "high",
            CostConfidence::Medium => "medium",
            CostConfidence::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub resource_type: String,
    /// USD per month.
    pub estimated_new_cost: f64,
    pub confidence: CostConfidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevOpsAnalysis {
    pub has_dev_ops_changes: bool,
    pub file_types: Vec<InfraFileType>,
    pub estimates: Vec<CostEstimate>,
    pub total_estimated_cost: f64,
}
