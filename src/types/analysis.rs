use crate::errors::ContractError;
use crate::types::cost::DevOpsAnalysis;
use crate::types::devops::Ticket;
use crate::types::ticket::TicketReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One step of the analysis pipeline, listed in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisStep {
    FileAnalysis,
    RiskDetection,
    SummaryGeneration,
    SelfRefinement,
    TicketQuality,
    AcValidation,
    PeerReview,
}

impl AnalysisStep {
    pub const ALL: [AnalysisStep; 7] = [
        AnalysisStep::FileAnalysis,
        AnalysisStep::RiskDetection,
        AnalysisStep::SummaryGeneration,
        AnalysisStep::SelfRefinement,
        AnalysisStep::TicketQuality,
        AnalysisStep::AcValidation,
        AnalysisStep::PeerReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStep::FileAnalysis => "fileAnalysis",
            AnalysisStep::RiskDetection => "riskDetection",
            AnalysisStep::SummaryGeneration => "summaryGeneration",
            AnalysisStep::SelfRefinement => "selfRefinement",
            AnalysisStep::TicketQuality => "ticketQuality",
            AnalysisStep::AcValidation => "acValidation",
            AnalysisStep::PeerReview => "peerReview",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AnalysisStep::FileAnalysis => "File analysis",
            AnalysisStep::RiskDetection => "Risk detection",
            AnalysisStep::SummaryGeneration => "Summary generation",
            AnalysisStep::SelfRefinement => "Self refinement",
            AnalysisStep::TicketQuality => "Ticket quality",
            AnalysisStep::AcValidation => "Acceptance criteria validation",
            AnalysisStep::PeerReview => "Peer review",
        }
    }
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage rendered as a prompt instead of being executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPrompt {
    pub step: AnalysisStep,
    pub prompt: String,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisMode {
    Execute,
    PromptOnly,
}

impl FromStr for AnalysisMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "execute" => Ok(AnalysisMode::Execute),
            "prompt-only" | "prompt" => Ok(AnalysisMode::PromptOnly),
            _ => Err(ContractError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Execute => f.write_str("EXECUTE"),
            AnalysisMode::PromptOnly => f.write_str("PROMPT_ONLY"),
        }
    }
}

/// Which analyses the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisModes {
    pub summary: bool,
    pub risks: bool,
    pub complexity: bool,
}

impl Default for AnalysisModes {
    fn default() -> Self {
        Self {
            summary: true,
            risks: true,
            complexity: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn to_emoji(&self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::High => "🟠",
            Severity::Medium => "🟡",
            Severity::Low => "🔵",
            Severity::Info => "ℹ️",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub path: String,
    #[serde(default)]
    pub summary: String,
    /// 1..=5
    #[serde(default = "default_complexity")]
    pub complexity: u8,
    #[serde(default)]
    pub risks: Vec<String>,
}

fn default_complexity() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuggestion {
    pub source_file: String,
    pub suggested_test_file: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub source_files: usize,
    pub test_files: usize,
    pub covered_source_files: usize,
    /// Share of changed source files that have a companion test change.
    pub coverage_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectClassification {
    /// Languages ordered by changed lines, most first.
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<String>,
    pub touches_infrastructure: bool,
    pub touches_ci: bool,
    pub touches_docs: bool,
    pub touches_dependencies: bool,
}

/// Deterministic results computed regardless of mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_suggestions: Option<Vec<TestSuggestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_ops_cost_estimates: Option<DevOpsAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_report: Option<CoverageReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_classification: Option<ProjectClassification>,
}

/// Eight named quality dimensions, each 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQualityDimensions {
    pub clarity: u8,
    pub completeness: u8,
    pub testability: u8,
    pub feasibility: u8,
    pub scope: u8,
    pub acceptance_criteria: u8,
    pub business_value: u8,
    pub technical_detail: u8,
}

impl TicketQualityDimensions {
    pub fn entries(&self) -> [(&'static str, u8); 8] {
        [
            ("Clarity", self.clarity),
            ("Completeness", self.completeness),
            ("Testability", self.testability),
            ("Feasibility", self.feasibility),
            ("Scope", self.scope),
            ("Acceptance criteria", self.acceptance_criteria),
            ("Business value", self.business_value),
            ("Technical detail", self.technical_detail),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQualityRating {
    pub overall_score: u8,
    pub dimensions: TicketQualityDimensions,
    #[serde(default)]
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionStatus {
    Met,
    Partial,
    Unmet,
    Unclear,
}

impl fmt::Display for CriterionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CriterionStatus::Met => "met",
            CriterionStatus::Partial => "partial",
            CriterionStatus::Unmet => "unmet",
            CriterionStatus::Unclear => "unclear",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    pub criterion: String,
    pub status: CriterionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceCriteriaValidation {
    pub criteria: Vec<CriterionResult>,
    /// `None` when there are no criteria to judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_percentage: Option<u8>,
    pub satisfied: bool,
    /// Criteria that are not fully met, in ticket order.
    #[serde(default)]
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approve,
    RequestChanges,
    NeedsDiscussion,
}

impl ReviewVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewVerdict::Approve => "approve",
            ReviewVerdict::RequestChanges => "request_changes",
            ReviewVerdict::NeedsDiscussion => "needs_discussion",
        }
    }

    pub fn to_emoji(&self) -> &'static str {
        match self {
            ReviewVerdict::Approve => "✅",
            ReviewVerdict::RequestChanges => "❌",
            ReviewVerdict::NeedsDiscussion => "💬",
        }
    }
}

impl fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerReviewResult {
    pub ticket_key: String,
    /// `None` when the tracker had no details for the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
    pub ticket_quality: TicketQualityRating,
    pub acceptance_criteria: AcceptanceCriteriaValidation,
    pub verdict: ReviewVerdict,
    #[serde(default)]
    pub comments: Vec<String>,
}

/// Aggregated output of an EXECUTE run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub summary: String,
    pub file_analyses: BTreeMap<String, FileAnalysis>,
    pub fixes: Vec<Fix>,
    pub recommendations: Vec<String>,
    /// 1..=5
    pub overall_complexity: u8,
    pub overall_risks: Vec<String>,
    pub ticket_references: Vec<TicketReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_review: Option<PeerReviewResult>,
    /// Stages that fell back to static analysis, one line each.
    #[serde(default)]
    pub warnings: Vec<String>,
    pub static_analysis: StaticAnalysis,
}

/// Output of a PROMPT_ONLY run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOnlyResult {
    pub prompts: Vec<AnalysisPrompt>,
    pub ticket_references: Vec<TicketReference>,
    pub static_analysis: StaticAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisOutcome {
    Executed(AgentResult),
    PromptOnly(PromptOnlyResult),
}

impl AnalysisOutcome {
    pub fn static_analysis(&self) -> &StaticAnalysis {
        match self {
            AnalysisOutcome::Executed(r) => &r.static_analysis,
            AnalysisOutcome::PromptOnly(r) => &r.static_analysis,
        }
    }

    pub fn ticket_references(&self) -> &[TicketReference] {
        match self {
            AnalysisOutcome::Executed(r) => &r.ticket_references,
            AnalysisOutcome::PromptOnly(r) => &r.ticket_references,
        }
    }
}
