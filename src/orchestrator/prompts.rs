//! Prompt text, instructions and JSON schemas for each stage.

use super::runner::StageContext;
use super::stages::StageDescriptor;
use super::AnalysisInput;
use crate::types::analysis::{AnalysisPrompt, AnalysisStep};
use serde_json::{json, Map, Value};

/// Diff text beyond this many characters is cut from prompts.
pub const MAX_DIFF_CHARS: usize = 60_000;

const REVIEWER_ROLE: &str = "You are a senior software engineer reviewing a code change.";

fn truncated_diff(diff: &str) -> String {
    if diff.len() <= MAX_DIFF_CHARS {
        return diff.to_string();
    }
    let mut end = MAX_DIFF_CHARS;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... [diff truncated, {} more characters]",
        &diff[..end],
        diff.len() - end
    )
}

fn file_schema(with_complexity: bool) -> Value {
    let mut properties = json!({
        "path": {"type": "string"},
        "summary": {"type": "string"},
        "risks": {"type": "array", "items": {"type": "string"}}
    });
    let mut required = vec!["path", "summary"];
    if with_complexity {
        properties["complexity"] = json!({"type": "integer", "minimum": 1, "maximum": 5});
        required.push("complexity");
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn fix_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "file": {"type": "string"},
            "line": {"type": "integer"},
            "description": {"type": "string"},
            "suggestion": {"type": "string"},
            "severity": {"enum": ["critical", "high", "medium", "low", "info"]}
        },
        "required": ["file", "description"]
    })
}

fn string_list() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

/// JSON schema the model's answer for `step` must satisfy.
pub fn schema_for(step: AnalysisStep, with_complexity: bool) -> Value {
    match step {
        AnalysisStep::FileAnalysis => json!({
            "type": "object",
            "properties": {
                "files": {"type": "array", "items": file_schema(with_complexity)},
                "fixes": {"type": "array", "items": fix_schema()}
            },
            "required": ["files"]
        }),
        AnalysisStep::RiskDetection => json!({
            "type": "object",
            "properties": {
                "risks": string_list(),
                "fixes": {"type": "array", "items": fix_schema()}
            },
            "required": ["risks"]
        }),
        AnalysisStep::SummaryGeneration => {
            let mut schema = json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string"},
                    "recommendations": string_list()
                },
                "required": ["summary", "recommendations"]
            });
            if with_complexity {
                schema["properties"]["overallComplexity"] =
                    json!({"type": "integer", "minimum": 1, "maximum": 5});
            }
            schema
        }
        AnalysisStep::SelfRefinement => json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string"},
                "recommendations": string_list()
            },
            "required": ["summary"]
        }),
        AnalysisStep::TicketQuality => {
            let score = json!({"type": "integer", "minimum": 0, "maximum": 100});
            json!({
                "type": "object",
                "properties": {
                    "overallScore": score,
                    "dimensions": {
                        "type": "object",
                        "properties": {
                            "clarity": score, "completeness": score, "testability": score,
                            "feasibility": score, "scope": score, "acceptanceCriteria": score,
                            "businessValue": score, "technicalDetail": score
                        },
                        "required": ["clarity", "completeness", "testability", "feasibility",
                                     "scope", "acceptanceCriteria", "businessValue", "technicalDetail"]
                    },
                    "feedback": string_list()
                },
                "required": ["overallScore", "dimensions"]
            })
        }
        AnalysisStep::AcValidation => json!({
            "type": "object",
            "properties": {
                "criteria": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "criterion": {"type": "string"},
                            "status": {"enum": ["met", "partial", "unmet", "unclear"]},
                            "evidence": {"type": "string"}
                        },
                        "required": ["criterion", "status"]
                    }
                }
            },
            "required": ["criteria"]
        }),
        AnalysisStep::PeerReview => json!({
            "type": "object",
            "properties": {
                "verdict": {"enum": ["approve", "request_changes", "needs_discussion"]},
                "comments": string_list()
            },
            "required": ["verdict"]
        }),
    }
}

fn instructions_for(step: AnalysisStep) -> &'static str {
    match step {
        AnalysisStep::FileAnalysis => {
            "Describe what changed in each file in one or two sentences, list file-specific risks, \
             and rate each file's change complexity from 1 (trivial) to 5 (very complex)."
        }
        AnalysisStep::RiskDetection => {
            "Identify correctness, security, performance and operational risks introduced by the change. \
             Propose concrete fixes with file and line where possible."
        }
        AnalysisStep::SummaryGeneration => {
            "Write a short summary of the change for a reviewer and list actionable recommendations."
        }
        AnalysisStep::SelfRefinement => {
            "Critically re-read the draft summary against the diff and the detected risks. \
             Correct inaccuracies and remove speculation; keep it concise."
        }
        AnalysisStep::TicketQuality => {
            "Rate the ticket on each dimension from 0 to 100 and give short feedback on how to improve it."
        }
        AnalysisStep::AcValidation => {
            "For each acceptance criterion of the ticket decide whether the change meets it \
             (met, partial, unmet, unclear) and cite evidence from the diff."
        }
        AnalysisStep::PeerReview => {
            "Decide whether the change should be approved, needs changes, or needs discussion, \
             and explain the decision in a few review comments."
        }
    }
}

fn prompt_text(step: AnalysisStep, input: &AnalysisInput) -> String {
    let header = match &input.metadata.title {
        Some(title) => format!("Change: {}\nBranch: {}", title, input.metadata.branch_name),
        None => format!("Branch: {}", input.metadata.branch_name),
    };
    match step {
        AnalysisStep::FileAnalysis | AnalysisStep::RiskDetection | AnalysisStep::AcValidation => {
            format!(
                "{}\n\n{}\n\nUnified diff:\n```diff\n{}\n```",
                REVIEWER_ROLE,
                header,
                truncated_diff(&input.diff)
            )
        }
        AnalysisStep::SummaryGeneration | AnalysisStep::SelfRefinement | AnalysisStep::PeerReview => {
            format!(
                "{}\n\n{}\n\n{} file(s) changed, +{} -{}.",
                REVIEWER_ROLE,
                header,
                input.records.len(),
                input.records.iter().map(|r| r.additions).sum::<usize>(),
                input.records.iter().map(|r| r.deletions).sum::<usize>()
            )
        }
        AnalysisStep::TicketQuality => match input.primary_ticket() {
            Some(ticket) => format!(
                "{}\n\nTicket {}: {}\n\n{}",
                REVIEWER_ROLE, ticket.key, ticket.title, ticket.description
            ),
            None => format!(
                "{}\n\nTicket {} could not be fetched; rate it as unavailable.",
                REVIEWER_ROLE,
                input.primary_reference().map(|r| r.key.as_str()).unwrap_or_default()
            ),
        },
    }
}

fn insert_json<T: serde::Serialize>(map: &mut Map<String, Value>, key: &str, value: &T) {
    if let Ok(v) = serde_json::to_value(value) {
        map.insert(key.to_string(), v);
    }
}

/// Static data every stage may see, independent of other stages.
fn static_context(step: AnalysisStep, input: &AnalysisInput) -> Map<String, Value> {
    let mut map = Map::new();
    insert_json(&mut map, "files", &input.records);
    if !input.ticket_references.is_empty() {
        insert_json(&mut map, "ticketReferences", &input.ticket_references);
    }
    if !input.metadata.commit_messages.is_empty() {
        insert_json(&mut map, "commitMessages", &input.metadata.commit_messages);
    }

    match step {
        AnalysisStep::RiskDetection => {
            let findings: Vec<String> = input
                .risk_scan
                .findings
                .iter()
                .map(|f| format!("{}: {}", f.path, f.describe()))
                .collect();
            if !findings.is_empty() {
                insert_json(&mut map, "staticFindings", &findings);
            }
            if let Some(cost) = &input.static_analysis.dev_ops_cost_estimates {
                insert_json(&mut map, "devOpsCostEstimates", cost);
            }
        }
        AnalysisStep::SummaryGeneration | AnalysisStep::SelfRefinement => {
            insert_json(&mut map, "staticAnalysis", &input.static_analysis);
        }
        AnalysisStep::TicketQuality | AnalysisStep::AcValidation | AnalysisStep::PeerReview => {
            if let Some(ticket) = input.primary_ticket() {
                insert_json(&mut map, "ticket", ticket);
            }
            if step == AnalysisStep::PeerReview {
                let related: Vec<String> = input
                    .ticket_references
                    .iter()
                    .skip(1)
                    .filter_map(|r| input.tickets.get(&r.key))
                    .map(|t| format!("{}: {}", t.key, t.title))
                    .collect();
                if !related.is_empty() {
                    insert_json(&mut map, "relatedTickets", &related);
                }
            }
        }
        AnalysisStep::FileAnalysis => {}
    }
    map
}

/// Renders one stage.
///
/// With `prior == None` (prompt collection) only static data is attached; a
/// running model pipeline passes the accumulated context so the stage sees the
/// parsed output of the stages it reads.
pub fn render_prompt(
    descriptor: &StageDescriptor,
    input: &AnalysisInput,
    prior: Option<&StageContext>,
) -> AnalysisPrompt {
    let step = descriptor.step;
    let mut context = static_context(step, input);

    if let Some(prior) = prior {
        for read in descriptor.reads {
            if let Some(value) = prior.output_json(*read) {
                context.insert(read.as_str().to_string(), value);
            }
        }
    }

    AnalysisPrompt {
        step,
        prompt: prompt_text(step, input),
        instructions: instructions_for(step).to_string(),
        context: if context.is_empty() { None } else { Some(context) },
        schema: Some(schema_for(step, input.modes.complexity)),
    }
}
