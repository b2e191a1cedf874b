//! Verbosity-tiered rendering of analysis outcomes.
//!
//! Both dialects render the same [`Report`]; which sections it holds is decided
//! once, from the tier table in [`tiers`].

pub mod console;
pub mod markdown;
pub mod tiers;

use crate::errors::ContractError;
use crate::types::analysis::{AgentResult, AnalysisOutcome, PromptOnlyResult, StaticAnalysis};
use crate::types::ticket::TicketReference;
use std::fmt;
use std::str::FromStr;
use tiers::{cap, clip, TierFeatures};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Minimal,
    Compact,
    #[default]
    Standard,
    Detailed,
    Verbose,
}

impl Verbosity {
    pub const ALL: [Verbosity; 5] = [
        Verbosity::Minimal,
        Verbosity::Compact,
        Verbosity::Standard,
        Verbosity::Detailed,
        Verbosity::Verbose,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Minimal => "minimal",
            Verbosity::Compact => "compact",
            Verbosity::Standard => "standard",
            Verbosity::Detailed => "detailed",
            Verbosity::Verbose => "verbose",
        }
    }
}

impl FromStr for Verbosity {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verbosity::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ContractError::InvalidVerbosity(s.to_string()))
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStyle {
    #[default]
    Console,
    Markdown,
}

impl FromStr for ReportStyle {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "text" => Ok(ReportStyle::Console),
            "markdown" | "md" => Ok(ReportStyle::Markdown),
            _ => Err(ContractError::InvalidReportStyle(s.to_string())),
        }
    }
}

/// One titled block of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub body: Option<String>,
    pub items: Vec<String>,
    /// Items dropped by the tier's cap.
    pub omitted: usize,
}

impl Section {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            body: None,
            items: Vec::new(),
            omitted: 0,
        }
    }

    fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        if !body.trim().is_empty() {
            self.body = Some(body);
        }
        self
    }

    fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }

    fn with_capped(mut self, items: &[String], max: Option<usize>) -> Self {
        let (kept, omitted) = cap(items, max);
        self.items.extend(kept);
        self.omitted += omitted;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub heading: String,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn titles(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.title).collect()
    }
}

/// Renders `outcome`. `Minimal` is always one line, whatever the style.
pub fn format(outcome: &AnalysisOutcome, verbosity: Verbosity, style: ReportStyle) -> String {
    let features = tiers::features(verbosity);
    if features.single_line {
        return summary_line(outcome);
    }
    let report = build_report(outcome, features);
    match style {
        ReportStyle::Console => console::render(&report),
        ReportStyle::Markdown => markdown::render(&report),
    }
}

/// String-typed entry point; unknown levels or styles are caller defects.
pub fn format_report(
    outcome: &AnalysisOutcome,
    verbosity: &str,
    style: &str,
) -> Result<String, ContractError> {
    Ok(format(outcome, verbosity.parse()?, style.parse()?))
}

/// The `minimal` rendering.
pub fn summary_line(outcome: &AnalysisOutcome) -> String {
    let mut parts = vec!["changescope".to_string()];
    match outcome {
        AnalysisOutcome::Executed(r) => {
            parts.push(format!("{} file(s)", r.file_analyses.len()));
            parts.push(format!("complexity {}/5", r.overall_complexity));
            parts.push(format!("{} risk(s)", r.overall_risks.len()));
            if let Some(review) = &r.peer_review {
                parts.push(format!("{} {}", review.ticket_key, review.verdict));
            }
        }
        AnalysisOutcome::PromptOnly(r) => {
            parts.push("PROMPT_ONLY".to_string());
            parts.push(format!("{} prompt(s)", r.prompts.len()));
            if let Some(first) = r.ticket_references.first() {
                parts.push(format!("ticket {}", first.key));
            }
        }
    }
    if let Some(cost) = &outcome.static_analysis().dev_ops_cost_estimates {
        parts.push(format!("cost +${:.2}/mo", cost.total_estimated_cost));
    }
    if let AnalysisOutcome::Executed(r) = outcome {
        if !r.warnings.is_empty() {
            parts.push(format!("{} warning(s)", r.warnings.len()));
        }
    }
    parts.join(" | ")
}

pub fn build_report(outcome: &AnalysisOutcome, features: &TierFeatures) -> Report {
    match outcome {
        AnalysisOutcome::Executed(r) => Report {
            heading: "changescope analysis".to_string(),
            sections: executed_sections(r, features),
        },
        AnalysisOutcome::PromptOnly(r) => Report {
            heading: "changescope prompts (PROMPT_ONLY)".to_string(),
            sections: prompt_sections(r, features),
        },
    }
}

fn executed_sections(r: &AgentResult, f: &TierFeatures) -> Vec<Section> {
    let mut sections = vec![Section::new("Summary")
        .with_body(r.summary.clone())
        .with_items(vec![format!("Overall complexity: {}/5", r.overall_complexity)])];

    if !r.overall_risks.is_empty() {
        sections.push(Section::new("Risks").with_capped(&r.overall_risks, f.max_items));
    }

    if f.show_files && !r.file_analyses.is_empty() {
        let files: Vec<String> = r
            .file_analyses
            .values()
            .map(|fa| {
                let mut line = format!(
                    "{} [{}/5]: {}",
                    fa.path,
                    fa.complexity,
                    clip(&fa.summary, f.max_text_chars)
                );
                if f.show_file_risks && !fa.risks.is_empty() {
                    line.push_str(&format!(" (risks: {})", fa.risks.join("; ")));
                }
                line
            })
            .collect();
        sections.push(Section::new("Files").with_capped(&files, f.max_items));
    }

    if f.show_fixes && !r.fixes.is_empty() {
        let fixes: Vec<String> = r
            .fixes
            .iter()
            .map(|fix| {
                let location = match fix.line {
                    Some(line) => format!("{}:{}", fix.file, line),
                    None => fix.file.clone(),
                };
                let mut text = format!(
                    "{} [{}] {}: {}",
                    fix.severity.to_emoji(),
                    fix.severity,
                    location,
                    clip(&fix.description, f.max_text_chars)
                );
                if let Some(s) = &fix.suggestion {
                    text.push_str(&format!(". Suggestion: {}", clip(s, f.max_text_chars)));
                }
                text
            })
            .collect();
        sections.push(Section::new("Fixes").with_capped(&fixes, f.max_items));
    }

    if !r.recommendations.is_empty() {
        sections.push(Section::new("Recommendations").with_capped(&r.recommendations, f.max_items));
    }

    if let Some(review) = &r.peer_review {
        let ac = &review.acceptance_criteria;
        let mut items = vec![match &review.ticket {
            Some(ticket) => format!("Ticket {}: {}", ticket.key, ticket.title),
            None => format!("Ticket {} (details unavailable)", review.ticket_key),
        }];
        items.push(format!(
            "Verdict: {} {}",
            review.verdict.to_emoji(),
            review.verdict
        ));
        items.push(match ac.compliance_percentage {
            Some(pct) => format!(
                "Acceptance criteria compliance: {}% ({})",
                pct,
                if ac.satisfied { "satisfied" } else { "not satisfied" }
            ),
            None => "Acceptance criteria compliance: n/a".to_string(),
        });
        if f.show_quality_score {
            items.push(format!(
                "Ticket quality: {}/100",
                review.ticket_quality.overall_score
            ));
        }
        let gaps: Vec<String> = ac.gaps.iter().map(|g| format!("Gap: {}", g)).collect();
        let mut section = Section::new("Peer review")
            .with_items(items)
            .with_capped(&gaps, f.max_items);
        if f.show_quality_score {
            section = section.with_capped(&review.comments, f.max_items);
        }
        sections.push(section);

        if f.show_dimensions {
            let mut dims: Vec<String> = review
                .ticket_quality
                .dimensions
                .entries()
                .iter()
                .map(|(name, score)| format!("{}: {}", name, score))
                .collect();
            dims.extend(review.ticket_quality.feedback.iter().cloned());
            sections.push(Section::new("Ticket quality").with_items(dims));
        }
        if f.show_ac_details && !ac.criteria.is_empty() {
            let criteria = ac
                .criteria
                .iter()
                .map(|c| match &c.evidence {
                    Some(e) => format!("[{}] {} ({})", c.status, c.criterion, clip(e, f.max_text_chars)),
                    None => format!("[{}] {}", c.status, c.criterion),
                })
                .collect();
            sections.push(Section::new("Acceptance criteria").with_items(criteria));
        }
    }

    if f.show_ticket_references && !r.ticket_references.is_empty() {
        sections.push(ticket_section(&r.ticket_references, f));
    }
    sections.extend(static_sections(&r.static_analysis, f));

    if !r.warnings.is_empty() {
        sections.push(Section::new("Warnings").with_capped(&r.warnings, f.max_items));
    }
    sections
}

fn prompt_sections(r: &PromptOnlyResult, f: &TierFeatures) -> Vec<Section> {
    let steps = r
        .prompts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}: {}", i + 1, p.step, clip(&p.instructions, f.max_text_chars)))
        .collect();
    let mut sections = vec![Section::new("Prompts")
        .with_body("Run each prompt in order and validate the answer against its schema.")
        .with_items(steps)];

    if f.show_prompt_bodies {
        let bodies = r
            .prompts
            .iter()
            .map(|p| {
                let keys = p
                    .context
                    .as_ref()
                    .map(|c| c.keys().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                format!("{}\n{}\nContext: {}", p.step, p.prompt, keys)
            })
            .collect();
        sections.push(Section::new("Prompt details").with_items(bodies));
    }

    if f.show_ticket_references && !r.ticket_references.is_empty() {
        sections.push(ticket_section(&r.ticket_references, f));
    }
    sections.extend(static_sections(&r.static_analysis, f));
    sections
}

fn ticket_section(refs: &[TicketReference], f: &TierFeatures) -> Section {
    let items: Vec<String> = refs
        .iter()
        .map(|r| format!("{} from {} ({})", r.key, r.source, r.confidence))
        .collect();
    Section::new("Ticket references").with_capped(&items, f.max_items)
}

fn static_sections(sa: &StaticAnalysis, f: &TierFeatures) -> Vec<Section> {
    let mut sections = Vec::new();

    if f.show_costs {
        if let Some(cost) = &sa.dev_ops_cost_estimates {
            let mut items: Vec<String> = cost
                .estimates
                .iter()
                .map(|e| {
                    let mut line = format!(
                        "{}: ${:.2}/month ({} confidence)",
                        e.resource_type, e.estimated_new_cost, e.confidence
                    );
                    if let Some(d) = &e.details {
                        line.push_str(&format!(", {}", d));
                    }
                    line
                })
                .collect();
            if !cost.file_types.is_empty() {
                items.push(format!(
                    "File types: {}",
                    cost.file_types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
                ));
            }
            sections.push(
                Section::new("Infrastructure cost")
                    .with_body(format!(
                        "Estimated monthly cost delta: +${:.2}",
                        cost.total_estimated_cost
                    ))
                    .with_items(items),
            );
        }
    }

    if f.show_test_suggestions {
        if let Some(suggestions) = sa.test_suggestions.as_ref().filter(|s| !s.is_empty()) {
            let items: Vec<String> = suggestions
                .iter()
                .map(|s| format!("{} -> {} ({})", s.source_file, s.suggested_test_file, s.reason))
                .collect();
            sections.push(Section::new("Test suggestions").with_capped(&items, f.max_items));
        }
        if let Some(cov) = &sa.coverage_report {
            sections.push(Section::new("Test coverage").with_items(vec![
                format!("Source files changed: {}", cov.source_files),
                format!("Test files changed: {}", cov.test_files),
                format!(
                    "Sources with test changes: {} ({}%)",
                    cov.covered_source_files, cov.coverage_percentage
                ),
            ]));
        }
    }

    if f.show_classification {
        if let Some(class) = &sa.project_classification {
            let mut items = Vec::new();
            if !class.languages.is_empty() {
                items.push(format!("Languages: {}", class.languages.join(", ")));
            }
            if let Some(lang) = &class.primary_language {
                items.push(format!("Primary language: {}", lang));
            }
            let touched: Vec<&str> = [
                (class.touches_infrastructure, "infrastructure"),
                (class.touches_ci, "CI"),
                (class.touches_docs, "documentation"),
                (class.touches_dependencies, "dependencies"),
            ]
            .iter()
            .filter(|(flag, _)| *flag)
            .map(|(_, name)| *name)
            .collect();
            if !touched.is_empty() {
                items.push(format!("Touches: {}", touched.join(", ")));
            }
            sections.push(Section::new("Project classification").with_items(items));
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::analysis::{
        AcceptanceCriteriaValidation, AnalysisPrompt, AnalysisStep, CoverageReport, CriterionResult,
        CriterionStatus, FileAnalysis, Fix, PeerReviewResult, ProjectClassification, ReviewVerdict,
        Severity, TestSuggestion, TicketQualityRating,
    };
    use crate::types::cost::{CostConfidence, CostEstimate, DevOpsAnalysis, InfraFileType};
    use crate::types::ticket::TicketSource;
    use std::collections::BTreeMap;

    fn static_analysis() -> StaticAnalysis {
        StaticAnalysis {
            test_suggestions: Some(vec![TestSuggestion {
                source_file: "src/lib.rs".to_string(),
                suggested_test_file: "tests/lib_test.rs".to_string(),
                reason: "no test changes".to_string(),
            }]),
            dev_ops_cost_estimates: Some(DevOpsAnalysis {
                has_dev_ops_changes: true,
                file_types: vec![InfraFileType::Terraform],
                estimates: vec![CostEstimate {
                    resource_type: "ec2".to_string(),
                    estimated_new_cost: 60.74,
                    confidence: CostConfidence::Medium,
                    details: None,
                }],
                total_estimated_cost: 60.74,
            }),
            coverage_report: Some(CoverageReport {
                source_files: 1,
                test_files: 0,
                covered_source_files: 0,
                coverage_percentage: 0,
            }),
            project_classification: Some(ProjectClassification {
                languages: vec!["rust".to_string()],
                primary_language: Some("rust".to_string()),
                touches_infrastructure: true,
                touches_ci: false,
                touches_docs: false,
                touches_dependencies: false,
            }),
        }
    }

    fn rich_result() -> AgentResult {
        let mut files = BTreeMap::new();
        files.insert(
            "src/lib.rs".to_string(),
            FileAnalysis {
                path: "src/lib.rs".to_string(),
                summary: "Adds loading".to_string(),
                complexity: 2,
                risks: vec!["unwrap".to_string()],
            },
        );
        AgentResult {
            summary: "Adds value loading.".to_string(),
            file_analyses: files,
            fixes: vec![Fix {
                file: "src/lib.rs".to_string(),
                line: Some(2),
                description: "Avoid unwrap".to_string(),
                suggestion: Some("Use ?".to_string()),
                severity: Severity::Medium,
            }],
            recommendations: (1..=7).map(|i| format!("rec {}", i)).collect(),
            overall_complexity: 2,
            overall_risks: vec!["panics on bad input".to_string()],
            ticket_references: vec![TicketReference {
                key: "ABC-100".to_string(),
                source: TicketSource::Title,
                confidence: 95,
            }],
            peer_review: Some(PeerReviewResult {
                ticket_key: "ABC-100".to_string(),
                ticket: None,
                ticket_quality: TicketQualityRating::default(),
                acceptance_criteria: AcceptanceCriteriaValidation {
                    criteria: vec![CriterionResult {
                        criterion: "loads value".to_string(),
                        status: CriterionStatus::Partial,
                        evidence: None,
                    }],
                    compliance_percentage: Some(50),
                    satisfied: false,
                    gaps: vec!["loads value (partial)".to_string()],
                },
                verdict: ReviewVerdict::RequestChanges,
                comments: vec!["needs tests".to_string()],
            }),
            warnings: (1..=8).map(|i| format!("warning {}", i)).collect(),
            static_analysis: static_analysis(),
        }
    }

    fn prompt_result() -> PromptOnlyResult {
        PromptOnlyResult {
            prompts: vec![AnalysisPrompt {
                step: AnalysisStep::FileAnalysis,
                prompt: "Unified diff: ...".to_string(),
                instructions: "Describe each file".to_string(),
                context: None,
                schema: None,
            }],
            ticket_references: Vec::new(),
            static_analysis: static_analysis(),
        }
    }

    fn section<'a>(report: &'a Report, title: &str) -> &'a Section {
        report.sections.iter().find(|s| s.title == title).unwrap()
    }

    #[test]
    fn test_parse_levels_and_styles() {
        assert_eq!("Detailed".parse::<Verbosity>().unwrap(), Verbosity::Detailed);
        assert_eq!("md".parse::<ReportStyle>().unwrap(), ReportStyle::Markdown);
        assert_eq!(
            "loud".parse::<Verbosity>().unwrap_err(),
            ContractError::InvalidVerbosity("loud".to_string())
        );
        assert!(matches!(
            "html".parse::<ReportStyle>(),
            Err(ContractError::InvalidReportStyle(_))
        ));
    }

    #[test]
    fn test_minimal_is_one_line_in_both_styles() {
        let outcome = AnalysisOutcome::Executed(rich_result());
        for style in [ReportStyle::Console, ReportStyle::Markdown] {
            let out = format(&outcome, Verbosity::Minimal, style);
            assert!(!out.contains('\n'));
            assert_eq!(
                out,
                "changescope | 1 file(s) | complexity 2/5 | 1 risk(s) | ABC-100 request_changes | cost +$60.74/mo | 8 warning(s)"
            );
        }
        let prompts = AnalysisOutcome::PromptOnly(prompt_result());
        assert!(!format(&prompts, Verbosity::Minimal, ReportStyle::Markdown).contains('\n'));
    }

    #[test]
    fn test_sections_nest_across_tiers() {
        for outcome in [
            AnalysisOutcome::Executed(rich_result()),
            AnalysisOutcome::PromptOnly(prompt_result()),
        ] {
            let titles: Vec<Vec<&str>> = Verbosity::ALL[1..]
                .iter()
                .map(|v| build_report(&outcome, tiers::features(*v)).titles())
                .collect();
            for pair in titles.windows(2) {
                for title in &pair[0] {
                    assert!(pair[1].contains(title), "{} missing at higher tier", title);
                }
            }
        }
    }

    #[test]
    fn test_standard_adds_files_fixes_and_costs() {
        let outcome = AnalysisOutcome::Executed(rich_result());
        let compact = build_report(&outcome, tiers::features(Verbosity::Compact)).titles();
        let standard = build_report(&outcome, tiers::features(Verbosity::Standard)).titles();
        let detailed = build_report(&outcome, tiers::features(Verbosity::Detailed)).titles();

        assert_eq!(
            compact,
            vec!["Summary", "Risks", "Recommendations", "Peer review", "Warnings"]
        );
        for title in ["Files", "Fixes", "Infrastructure cost", "Ticket references"] {
            assert!(!compact.contains(&title));
            assert!(standard.contains(&title));
        }
        for title in [
            "Ticket quality",
            "Acceptance criteria",
            "Test suggestions",
            "Test coverage",
            "Project classification",
        ] {
            assert!(!standard.contains(&title));
            assert!(detailed.contains(&title));
        }
    }

    #[test]
    fn test_file_risks_appear_from_detailed() {
        let outcome = AnalysisOutcome::Executed(rich_result());
        let files = |v: Verbosity| {
            build_report(&outcome, tiers::features(v))
                .sections
                .into_iter()
                .find(|s| s.title == "Files")
                .unwrap()
                .items
        };
        assert!(files(Verbosity::Standard).iter().all(|l| !l.contains("(risks:")));
        assert!(files(Verbosity::Detailed).iter().any(|l| l.contains("(risks: unwrap)")));
    }

    #[test]
    fn test_format_is_deterministic() {
        let outcome = AnalysisOutcome::Executed(rich_result());
        let first = format(&outcome, Verbosity::Verbose, ReportStyle::Markdown);
        assert_eq!(first, format(&outcome, Verbosity::Verbose, ReportStyle::Markdown));
    }

    #[test]
    fn test_list_caps_are_exact() {
        let outcome = AnalysisOutcome::Executed(rich_result());
        let expected = [
            (Verbosity::Compact, 3, 5),
            (Verbosity::Standard, 5, 3),
            (Verbosity::Detailed, 8, 0),
            (Verbosity::Verbose, 8, 0),
        ];
        for (verbosity, shown, omitted) in expected {
            let report = build_report(&outcome, tiers::features(verbosity));
            let warnings = section(&report, "Warnings");
            assert_eq!(warnings.items.len(), shown, "{}", verbosity);
            assert_eq!(warnings.omitted, omitted, "{}", verbosity);
        }
        let compact = build_report(&outcome, tiers::features(Verbosity::Compact));
        assert_eq!(section(&compact, "Recommendations").items.len(), 3);
        assert_eq!(section(&compact, "Recommendations").omitted, 4);
    }

    #[test]
    fn test_prompt_bodies_only_when_verbose() {
        let outcome = AnalysisOutcome::PromptOnly(prompt_result());
        let detailed = build_report(&outcome, tiers::features(Verbosity::Detailed));
        let verbose = build_report(&outcome, tiers::features(Verbosity::Verbose));
        assert!(!detailed.titles().contains(&"Prompt details"));
        assert!(section(&verbose, "Prompt details").items[0].contains("Unified diff"));
        assert_eq!(section(&detailed, "Prompts").items[0], "1. fileAnalysis: Describe each file");
    }

    #[test]
    fn test_format_report_rejects_unknown_levels() {
        let outcome = AnalysisOutcome::PromptOnly(prompt_result());
        assert!(format_report(&outcome, "standard", "markdown").is_ok());
        assert!(matches!(
            format_report(&outcome, "everything", "console"),
            Err(ContractError::InvalidVerbosity(_))
        ));
    }
}
