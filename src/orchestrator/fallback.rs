//! Deterministic stand-ins for every stage.
//!
//! Each function returns the same shape a model answer would parse into, so
//! aggregation never needs to know which path produced a stage.

use super::peer_review::{
    decide_verdict, heuristic_ticket_quality, unjudged_criteria, validate_criteria,
};
use super::runner::{FileAnalysisOutput, PeerReviewOutput, RiskOutput, StageContext, StageOutput, SummaryOutput};
use super::AnalysisInput;
use crate::static_analysis::{heuristic_complexity, is_dependency_manifest, severity_rank, LARGE_FILE_LINES};
use crate::types::analysis::{AnalysisStep, FileAnalysis, Severity};
use crate::types::git::{DiffFileRecord, FileStatus};

/// Change sets above this many lines get a "split it" recommendation.
const LARGE_CHANGE_LINES: usize = 800;
const LARGE_CHANGE_FILES: usize = 20;

pub fn fallback_for(step: AnalysisStep, input: &AnalysisInput, context: &StageContext) -> StageOutput {
    match step {
        AnalysisStep::FileAnalysis => StageOutput::FileAnalysis(file_analysis(input)),
        AnalysisStep::RiskDetection => StageOutput::RiskDetection(risk_detection(input)),
        AnalysisStep::SummaryGeneration => StageOutput::Summary(summary(input)),
        AnalysisStep::SelfRefinement => StageOutput::Refinement(refinement(input, context)),
        AnalysisStep::TicketQuality => {
            StageOutput::TicketQuality(heuristic_ticket_quality(input.primary_ticket()))
        }
        AnalysisStep::AcValidation => StageOutput::AcValidation(validate_criteria(
            unjudged_criteria(input.primary_ticket()),
            input.config.compliance_threshold,
        )),
        AnalysisStep::PeerReview => StageOutput::PeerReview(peer_review(input, context)),
    }
}

pub fn describe_file(record: &DiffFileRecord) -> String {
    let verb = match record.status {
        FileStatus::Added => "Added",
        FileStatus::Modified => "Modified",
        FileStatus::Deleted => "Deleted",
    };
    format!("{} (+{} -{})", verb, record.additions, record.deletions)
}

pub fn file_analysis(input: &AnalysisInput) -> FileAnalysisOutput {
    let mut by_file = input.risk_scan.by_file();
    let files = input
        .records
        .iter()
        .map(|record| FileAnalysis {
            path: record.path.clone(),
            summary: describe_file(record),
            complexity: heuristic_complexity(record.changed_lines()),
            risks: by_file.remove(&record.path).unwrap_or_default(),
        })
        .collect();
    FileAnalysisOutput {
        files,
        fixes: Vec::new(),
    }
}

pub fn risk_detection(input: &AnalysisInput) -> RiskOutput {
    RiskOutput {
        risks: input.risk_scan.overall(),
        fixes: input.risk_scan.fixes(),
    }
}

pub fn summary(input: &AnalysisInput) -> SummaryOutput {
    let records = &input.records;
    if records.is_empty() {
        return SummaryOutput {
            summary: "No file changes detected.".to_string(),
            recommendations: default_recommendations(input),
            overall_complexity: None,
        };
    }

    let count = |status: FileStatus| records.iter().filter(|r| r.status == status).count();
    let additions: usize = records.iter().map(|r| r.additions).sum();
    let deletions: usize = records.iter().map(|r| r.deletions).sum();

    let mut parts = vec![format!(
        "Changes {} file{} (+{} -{}): {} added, {} modified, {} deleted.",
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        additions,
        deletions,
        count(FileStatus::Added),
        count(FileStatus::Modified),
        count(FileStatus::Deleted)
    )];
    if let Some(class) = &input.static_analysis.project_classification {
        if let Some(lang) = &class.primary_language {
            parts.push(format!("Mostly {}.", lang));
        }
    }
    if let Some(reference) = input.primary_reference() {
        parts.push(format!("Linked to {}.", reference.key));
    }
    if let Some(cost) = &input.static_analysis.dev_ops_cost_estimates {
        if cost.total_estimated_cost > 0.0 {
            parts.push(format!(
                "Estimated infrastructure cost +${:.2}/month.",
                cost.total_estimated_cost
            ));
        }
    }

    SummaryOutput {
        summary: parts.join(" "),
        recommendations: default_recommendations(input),
        overall_complexity: None,
    }
}

/// Keeps the earlier summary as is; there is nothing to refine without a model.
pub fn refinement(input: &AnalysisInput, context: &StageContext) -> SummaryOutput {
    context.summary.clone().unwrap_or_else(|| summary(input))
}

pub fn peer_review(input: &AnalysisInput, context: &StageContext) -> PeerReviewOutput {
    let threshold = input.config.compliance_threshold;
    let quality = context
        .ticket_quality
        .clone()
        .unwrap_or_else(|| heuristic_ticket_quality(input.primary_ticket()));
    let ac = context.ac_validation.clone().unwrap_or_else(|| {
        validate_criteria(unjudged_criteria(input.primary_ticket()), threshold)
    });
    let verdict = decide_verdict(input.primary_ticket().is_some(), &quality, &ac, threshold);

    let mut comments = Vec::new();
    match (input.primary_reference(), input.primary_ticket()) {
        (Some(reference), None) => {
            comments.push(format!("Ticket {} could not be fetched", reference.key))
        }
        (_, Some(_)) => {
            match ac.compliance_percentage {
                Some(pct) => comments.push(format!(
                    "Acceptance criteria compliance {}% (threshold {}%)",
                    pct, threshold
                )),
                None => comments.push("Ticket lists no acceptance criteria".to_string()),
            }
            comments.extend(ac.gaps.iter().map(|g| format!("Gap: {}", g)));
            if quality.overall_score < super::peer_review::MIN_APPROVAL_QUALITY {
                comments.push(format!("Ticket quality is low ({}/100)", quality.overall_score));
            }
        }
        (None, None) => {}
    }
    if input.risk_scan.has_severity_at_least(Severity::High) {
        comments.push("Static analysis flagged high-severity risks".to_string());
    }

    PeerReviewOutput { verdict, comments }
}

/// Recommendations derived from static analysis alone.
pub fn default_recommendations(input: &AnalysisInput) -> Vec<String> {
    let mut recs = Vec::new();
    let sa = &input.static_analysis;

    if let Some(suggestions) = sa.test_suggestions.as_ref().filter(|s| !s.is_empty()) {
        recs.push(format!(
            "Add tests for {} changed source file(s) without test changes (e.g. {})",
            suggestions.len(),
            suggestions[0].suggested_test_file
        ));
    }

    let severe = input
        .risk_scan
        .findings
        .iter()
        .filter(|f| severity_rank(f.severity) >= severity_rank(Severity::High))
        .count();
    if severe > 0 {
        recs.push(format!(
            "Address the {} high-severity risk(s) flagged by static analysis",
            severe
        ));
    }

    if let Some(cost) = &sa.dev_ops_cost_estimates {
        if cost.total_estimated_cost > 0.0 {
            recs.push(format!(
                "Review the estimated infrastructure cost increase of ${:.2}/month",
                cost.total_estimated_cost
            ));
        } else if cost.has_dev_ops_changes {
            recs.push("Verify infrastructure changes in a staging environment".to_string());
        }
    }

    let total: usize = input.records.iter().map(DiffFileRecord::changed_lines).sum();
    if total > LARGE_CHANGE_LINES || input.records.len() > LARGE_CHANGE_FILES {
        recs.push("Consider splitting this change into smaller reviews".to_string());
    } else if input.records.iter().any(|r| r.changed_lines() > LARGE_FILE_LINES) {
        recs.push("Review the largest file changes with extra care".to_string());
    }

    if input.records.iter().any(|r| is_dependency_manifest(&r.path)) {
        recs.push(
            "Check new or updated dependencies for licensing and security advisories".to_string(),
        );
    }

    if recs.is_empty() {
        recs.push("No blocking issues detected by static analysis".to_string());
    }
    recs
}
