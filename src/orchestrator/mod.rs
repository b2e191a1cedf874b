//! Analysis orchestration.
//!
//! One invocation parses the diff, extracts tickets, computes static analysis,
//! fetches ticket details and then hands a stage plan to one of two executors:
//! prompt collection (PROMPT_ONLY) or model execution (EXECUTE).

pub mod fallback;
pub mod peer_review;
pub mod prompts;
pub mod runner;
pub mod stages;

use crate::clients::{fetch_tickets_batched, ChatModel, TicketProvider};
use crate::config::AnalysisConfig;
use crate::diff::parse_with_fragments;
use crate::errors::ContractError;
use crate::git::UNKNOWN_BRANCH;
use crate::static_analysis::{build_static_analysis, heuristic_complexity, overall_complexity, scan_risks, RiskScan};
use crate::tickets::{TicketExtractor, TicketSources};
use crate::types::analysis::{
    AgentResult, AnalysisMode, AnalysisModes, AnalysisOutcome, FileAnalysis, PeerReviewResult,
    PromptOnlyResult, StaticAnalysis,
};
use crate::types::devops::Ticket;
use crate::types::git::{ChangeMetadata, DiffFileRecord, FileDiff};
use crate::types::ticket::TicketReference;
use runner::{ModelRunner, PromptCollector, StageContext};
use stages::build_stage_plan;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Per-invocation options besides the diff and title.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub mode: AnalysisMode,
    pub branch_name: String,
    pub commit_messages: Vec<String>,
    pub description: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Execute,
            branch_name: UNKNOWN_BRANCH.to_string(),
            commit_messages: Vec::new(),
            description: None,
        }
    }
}

/// Read-only data shared by every stage of one invocation.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub diff: String,
    pub records: Vec<DiffFileRecord>,
    pub fragments: Vec<FileDiff>,
    pub metadata: ChangeMetadata,
    /// Sorted by descending confidence; the first entry is the primary ticket.
    pub ticket_references: Vec<TicketReference>,
    pub tickets: HashMap<String, Ticket>,
    pub modes: AnalysisModes,
    pub config: AnalysisConfig,
    pub static_analysis: StaticAnalysis,
    pub risk_scan: RiskScan,
}

impl AnalysisInput {
    pub fn primary_reference(&self) -> Option<&TicketReference> {
        self.ticket_references.first()
    }

    pub fn primary_ticket(&self) -> Option<&Ticket> {
        self.primary_reference().and_then(|r| self.tickets.get(&r.key))
    }
}

pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    model: Option<Arc<dyn ChatModel>>,
    ticket_provider: Option<Arc<dyn TicketProvider>>,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            model: None,
            ticket_provider: None,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_ticket_provider(mut self, provider: Arc<dyn TicketProvider>) -> Self {
        self.ticket_provider = Some(provider);
        self
    }

    /// Deterministic preparation shared by both modes. No I/O.
    pub fn prepare(
        &self,
        diff: &str,
        title: Option<&str>,
        modes: AnalysisModes,
        options: &AnalysisOptions,
    ) -> Result<AnalysisInput, ContractError> {
        let extractor = TicketExtractor::new(
            &self.config.ticket_pattern,
            self.config.default_project_prefix.as_deref(),
        )?
        .with_weights(self.config.confidence);

        let (records, fragments) = parse_with_fragments(diff);
        let ticket_references = extractor.extract(&TicketSources {
            title,
            branch_name: &options.branch_name,
            description: options.description.as_deref(),
            commit_messages: &options.commit_messages,
        });
        let static_analysis = build_static_analysis(&records, &fragments);
        let risk_scan = scan_risks(&records, &fragments);

        tracing::info!(
            "Parsed {} file(s), {} ticket reference(s)",
            records.len(),
            ticket_references.len()
        );

        Ok(AnalysisInput {
            diff: diff.to_string(),
            records,
            fragments,
            metadata: ChangeMetadata {
                title: title.map(str::to_string),
                branch_name: options.branch_name.clone(),
                description: options.description.clone(),
                commit_messages: options.commit_messages.clone(),
            },
            ticket_references,
            tickets: HashMap::new(),
            modes,
            config: self.config.clone(),
            static_analysis,
            risk_scan,
        })
    }

    async fn fetch_tickets(&self, input: &mut AnalysisInput) {
        let Some(provider) = &self.ticket_provider else {
            return;
        };
        if input.ticket_references.is_empty() {
            return;
        }
        let keys: Vec<String> = input
            .ticket_references
            .iter()
            .map(|r| r.key.clone())
            .collect();
        input.tickets =
            fetch_tickets_batched(provider.as_ref(), &keys, self.config.ticket_batch_size).await;
    }

    /// Runs the pipeline in the requested mode.
    ///
    /// Only caller defects (an invalid ticket pattern) are errors; collaborator
    /// failures degrade the result instead.
    pub async fn analyze(
        &self,
        diff: &str,
        title: Option<&str>,
        modes: AnalysisModes,
        options: &AnalysisOptions,
    ) -> Result<AnalysisOutcome, ContractError> {
        let mut input = self.prepare(diff, title, modes, options)?;
        self.fetch_tickets(&mut input).await;

        let plan = build_stage_plan(&modes, input.primary_reference().is_some(), &self.config);
        tracing::info!(
            "Stage plan ({}): {}",
            options.mode,
            plan.iter().map(|d| d.step.as_str()).collect::<Vec<_>>().join(" -> ")
        );

        match options.mode {
            AnalysisMode::PromptOnly => {
                let prompts = PromptCollector::collect(&plan, &input);
                Ok(AnalysisOutcome::PromptOnly(PromptOnlyResult {
                    prompts,
                    ticket_references: input.ticket_references,
                    static_analysis: input.static_analysis,
                }))
            }
            AnalysisMode::Execute => {
                let runner = ModelRunner::new(self.model.as_deref());
                let context = runner.run(&plan, &input).await;
                Ok(AnalysisOutcome::Executed(aggregate(input, context)))
            }
        }
    }
}

/// Folds stage outputs into the final result.
pub fn aggregate(input: AnalysisInput, context: StageContext) -> AgentResult {
    let modes = input.modes;

    let mut file_analyses: BTreeMap<String, FileAnalysis> = BTreeMap::new();
    let mut fixes = Vec::new();
    if let Some(fa) = &context.file_analysis {
        for file in &fa.files {
            file_analyses.insert(file.path.clone(), file.clone());
        }
        fixes.extend(fa.fixes.iter().cloned());
    }
    let baseline = fallback::file_analysis(&input);
    for file in baseline.files {
        file_analyses.entry(file.path.clone()).or_insert(file);
    }
    if !modes.complexity {
        for record in &input.records {
            if let Some(fa) = file_analyses.get_mut(&record.path) {
                fa.complexity = heuristic_complexity(record.changed_lines());
            }
        }
    }

    let overall_risks = match (&context.risks, modes.risks) {
        (Some(risks), true) => {
            for fix in &risks.fixes {
                if !fixes.contains(fix) {
                    fixes.push(fix.clone());
                }
            }
            risks.risks.clone()
        }
        _ => Vec::new(),
    };

    let latest_summary = context.refinement.as_ref().or(context.summary.as_ref());
    let summary = if modes.summary {
        latest_summary.map(|s| s.summary.clone()).unwrap_or_default()
    } else {
        String::new()
    };
    let recommendations = [context.refinement.as_ref(), context.summary.as_ref()]
        .into_iter()
        .flatten()
        .map(|s| s.recommendations.clone())
        .find(|r| !r.is_empty())
        .unwrap_or_else(|| fallback::default_recommendations(&input));

    let per_file: Vec<u8> = file_analyses.values().map(|f| f.complexity).collect();
    let overall_complexity = context
        .summary
        .as_ref()
        .and_then(|s| s.overall_complexity)
        .filter(|_| modes.complexity)
        .unwrap_or_else(|| overall_complexity(&per_file, &input.records));

    let peer_review = match (context.peer_review.as_ref(), input.primary_reference()) {
        (Some(review), Some(reference)) => {
            let threshold = input.config.compliance_threshold;
            Some(PeerReviewResult {
                ticket_key: reference.key.clone(),
                ticket: input.primary_ticket().cloned(),
                ticket_quality: context.ticket_quality.clone().unwrap_or_else(|| {
                    peer_review::heuristic_ticket_quality(input.primary_ticket())
                }),
                acceptance_criteria: context.ac_validation.clone().unwrap_or_else(|| {
                    peer_review::validate_criteria(
                        peer_review::unjudged_criteria(input.primary_ticket()),
                        threshold,
                    )
                }),
                verdict: review.verdict,
                comments: review.comments.clone(),
            })
        }
        _ => None,
    };

    tracing::info!(
        "Analysis complete: {} file(s), complexity {}, {} warning(s)",
        file_analyses.len(),
        overall_complexity,
        context.warnings.len()
    );

    AgentResult {
        summary,
        file_analyses,
        fixes,
        recommendations,
        overall_complexity,
        overall_risks,
        ticket_references: input.ticket_references,
        peer_review,
        warnings: context.warnings,
        static_analysis: input.static_analysis,
    }
}
