use crate::types::ticket::TicketSource;
use serde::Deserialize;

/// Default ticket key shape: an uppercase-led project code, a dash and digits.
pub const DEFAULT_TICKET_PATTERN: &str = r"\b[A-Z][A-Z0-9]+-\d+\b";

/// Confidence assigned to a ticket reference by where it was found.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceWeights {
    #[serde(default = "default_title_weight")]
    pub title: u8,
    #[serde(default = "default_branch_weight")]
    pub branch: u8,
    #[serde(default = "default_description_weight")]
    pub description: u8,
    #[serde(default = "default_commit_weight")]
    pub commit: u8,
}

impl ConfidenceWeights {
    pub fn for_source(&self, source: TicketSource) -> u8 {
        let weight = match source {
            TicketSource::Title => self.title,
            TicketSource::Branch => self.branch,
            TicketSource::Description => self.description,
            TicketSource::Commit => self.commit,
        };
        weight.min(100)
    }
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            title: default_title_weight(),
            branch: default_branch_weight(),
            description: default_description_weight(),
            commit: default_commit_weight(),
        }
    }
}

/// Knobs for the analysis pipeline.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default = "default_ticket_pattern")]
    pub ticket_pattern: String,

    #[serde(default)]
    pub default_project_prefix: Option<String>,

    #[serde(default)]
    pub confidence: ConfidenceWeights,

    /// Append ticket quality, AC validation and peer review stages when a ticket is referenced.
    #[serde(default = "default_true")]
    pub peer_review: bool,

    #[serde(default = "default_true")]
    pub self_refinement: bool,

    /// Compliance percentage at or above which acceptance criteria count as satisfied.
    #[serde(default = "default_compliance_threshold")]
    pub compliance_threshold: u8,

    #[serde(default = "default_commit_limit")]
    pub commit_limit: usize,

    #[serde(default = "default_ticket_batch_size")]
    pub ticket_batch_size: usize,
}

/// Partial analysis configuration for loading from files
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PartialAnalysisConfig {
    pub ticket_pattern: Option<String>,
    pub default_project_prefix: Option<String>,
    pub confidence: Option<ConfidenceWeights>,
    pub peer_review: Option<bool>,
    pub self_refinement: Option<bool>,
    pub compliance_threshold: Option<u8>,
    pub commit_limit: Option<usize>,
    pub ticket_batch_size: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_partial(None)
    }
}

impl AnalysisConfig {
    pub fn from_partial(partial: Option<PartialAnalysisConfig>) -> Self {
        let partial = partial.unwrap_or_default();

        Self {
            ticket_pattern: partial.ticket_pattern.unwrap_or_else(default_ticket_pattern),
            default_project_prefix: partial
                .default_project_prefix
                .filter(|p| !p.trim().is_empty()),
            confidence: partial.confidence.unwrap_or_default(),
            peer_review: partial.peer_review.unwrap_or(true),
            self_refinement: partial.self_refinement.unwrap_or(true),
            compliance_threshold: partial
                .compliance_threshold
                .unwrap_or_else(default_compliance_threshold)
                .min(100),
            commit_limit: partial.commit_limit.unwrap_or_else(default_commit_limit),
            ticket_batch_size: partial
                .ticket_batch_size
                .unwrap_or_else(default_ticket_batch_size)
                .max(1),
        }
    }
}

fn default_ticket_pattern() -> String {
    DEFAULT_TICKET_PATTERN.to_string()
}

fn default_title_weight() -> u8 {
    95
}

fn default_branch_weight() -> u8 {
    90
}

fn default_description_weight() -> u8 {
    80
}

fn default_commit_weight() -> u8 {
    70
}

fn default_true() -> bool {
    true
}

fn default_compliance_threshold() -> u8 {
    70
}

fn default_commit_limit() -> usize {
    20
}

fn default_ticket_batch_size() -> usize {
    5
}
