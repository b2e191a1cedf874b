//! Ticket quality, acceptance criteria compliance and the review verdict.

use crate::types::analysis::{
    AcceptanceCriteriaValidation, CriterionResult, CriterionStatus, ReviewVerdict,
    TicketQualityDimensions, TicketQualityRating,
};
use crate::types::devops::Ticket;
use lazy_static::lazy_static;
use regex::Regex;

/// Ticket quality below this never yields an approval.
pub const MIN_APPROVAL_QUALITY: u8 = 50;

lazy_static! {
    static ref AC_HEADING: Regex =
        Regex::new(r"(?i)^\s*(#+\s*|\*\*|h\d\.\s*)?(acceptance criteria|ac)\b\s*:?\**\s*:?\s*$").unwrap();
    static ref LIST_ITEM: Regex =
        Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(?:\[[ xX]?\]\s*)?(.+?)\s*$").unwrap();
    static ref GHERKIN: Regex = Regex::new(r"(?i)^\s*(given|when|then|and)\s+\S").unwrap();
    static ref ANY_HEADING: Regex = Regex::new(r"^\s*(#+\s+\S|h\d\.\s|\*\*[^*]+\*\*\s*:?\s*$)").unwrap();
}

/// `round(100 * (met + 0.5 * partial) / total)`, `None` with no criteria.
pub fn compliance_percentage(criteria: &[CriterionResult]) -> Option<u8> {
    if criteria.is_empty() {
        return None;
    }
    let met = criteria
        .iter()
        .filter(|c| c.status == CriterionStatus::Met)
        .count() as f64;
    let partial = criteria
        .iter()
        .filter(|c| c.status == CriterionStatus::Partial)
        .count() as f64;
    let pct = 100.0 * (met + 0.5 * partial) / criteria.len() as f64;
    Some(pct.round().clamp(0.0, 100.0) as u8)
}

/// Builds the validation record; compliance is always recomputed here.
pub fn validate_criteria(criteria: Vec<CriterionResult>, threshold: u8) -> AcceptanceCriteriaValidation {
    let compliance = compliance_percentage(&criteria);
    let gaps = criteria
        .iter()
        .filter(|c| c.status != CriterionStatus::Met)
        .map(|c| format!("{} ({})", c.criterion, c.status))
        .collect();
    AcceptanceCriteriaValidation {
        satisfied: compliance.map_or(false, |c| c >= threshold),
        compliance_percentage: compliance,
        criteria,
        gaps,
    }
}

/// Verdict derived from the ticket and the criteria alone.
///
/// Criteria that were never judged (all `unclear`) need a human.
pub fn decide_verdict(
    ticket_available: bool,
    quality: &TicketQualityRating,
    ac: &AcceptanceCriteriaValidation,
    threshold: u8,
) -> ReviewVerdict {
    if !ticket_available {
        return ReviewVerdict::NeedsDiscussion;
    }
    let any_unmet = ac.criteria.iter().any(|c| c.status == CriterionStatus::Unmet);
    let all_unclear = !ac.criteria.is_empty()
        && ac.criteria.iter().all(|c| c.status == CriterionStatus::Unclear);

    if ac.satisfied && !any_unmet && quality.overall_score >= MIN_APPROVAL_QUALITY {
        return ReviewVerdict::Approve;
    }
    if all_unclear {
        return ReviewVerdict::NeedsDiscussion;
    }
    let below = ac.compliance_percentage.map_or(false, |c| c < threshold);
    if any_unmet || below {
        return ReviewVerdict::RequestChanges;
    }
    ReviewVerdict::NeedsDiscussion
}

/// Acceptance criteria listed in a ticket description.
///
/// Items under an "Acceptance Criteria" heading win; without one, checkbox
/// items and Given/When/Then lines are used.
pub fn extract_acceptance_criteria(description: &str) -> Vec<String> {
    let lines: Vec<&str> = description.lines().collect();

    if let Some(start) = lines.iter().position(|l| AC_HEADING.is_match(l)) {
        let mut items = Vec::new();
        for line in &lines[start + 1..] {
            if line.trim().is_empty() {
                if items.is_empty() {
                    continue;
                }
                break;
            }
            if ANY_HEADING.is_match(line) {
                break;
            }
            let item = LIST_ITEM
                .captures(line)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| line.trim().to_string());
            if !item.is_empty() {
                items.push(item);
            }
        }
        if !items.is_empty() {
            return items;
        }
    }

    lines
        .iter()
        .filter(|l| l.trim_start().starts_with("- [") || GHERKIN.is_match(l))
        .map(|l| {
            LIST_ITEM
                .captures(l)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| l.trim().to_string())
        })
        .collect()
}

fn scale(value: usize, full_at: usize) -> u8 {
    ((value.min(full_at) * 100) / full_at.max(1)) as u8
}

/// Scores a ticket without a model, from the shape of its text.
pub fn heuristic_ticket_quality(ticket: Option<&Ticket>) -> TicketQualityRating {
    let Some(ticket) = ticket else {
        return TicketQualityRating {
            overall_score: 0,
            dimensions: TicketQualityDimensions::default(),
            feedback: vec!["Ticket details are unavailable".to_string()],
        };
    };

    let description = ticket.description.trim();
    let words = description.split_whitespace().count();
    let criteria = extract_acceptance_criteria(description);
    let lower = description.to_lowercase();
    let mentions_tech = ["api", "endpoint", "database", "schema", "service", "config", "migration", "function"]
        .iter()
        .filter(|w| lower.contains(*w))
        .count();
    let mentions_value = ["user", "customer", "so that", "because", "business", "benefit"]
        .iter()
        .any(|w| lower.contains(*w));
    let title_words = ticket.title.split_whitespace().count();

    let dimensions = TicketQualityDimensions {
        clarity: (scale(title_words, 4) / 2).saturating_add(scale(words, 60) / 2),
        completeness: scale(words, 150),
        testability: if criteria.is_empty() { 20 } else { 60u8.saturating_add(scale(criteria.len(), 4) * 2 / 5) },
        feasibility: if words == 0 { 40 } else { 70 },
        scope: match words {
            0 => 30,
            1..=400 => 80,
            _ => 55,
        },
        acceptance_criteria: scale(criteria.len(), 3),
        business_value: if mentions_value { 80 } else { 40 },
        technical_detail: scale(mentions_tech, 3),
    };

    let entries = dimensions.entries();
    let overall = (entries.iter().map(|(_, s)| *s as u32).sum::<u32>() as f64 / entries.len() as f64).round() as u8;

    let mut feedback = Vec::new();
    if criteria.is_empty() {
        feedback.push("Add explicit acceptance criteria".to_string());
    }
    if words < 20 {
        feedback.push("Describe the expected behaviour in more detail".to_string());
    }
    if !mentions_value {
        feedback.push("State the user or business value of the change".to_string());
    }

    TicketQualityRating {
        overall_score: overall,
        dimensions,
        feedback,
    }
}

/// Criteria from the ticket with no judgement attached.
pub fn unjudged_criteria(ticket: Option<&Ticket>) -> Vec<CriterionResult> {
    ticket
        .map(|t| extract_acceptance_criteria(&t.description))
        .unwrap_or_default()
        .into_iter()
        .map(|criterion| CriterionResult {
            criterion,
            status: CriterionStatus::Unclear,
            evidence: None,
        })
        .collect()
}
