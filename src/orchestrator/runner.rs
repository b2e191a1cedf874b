//! The two executors over a stage plan.
//!
//! [`PromptCollector`] turns every descriptor into a prompt without calling
//! anything. [`ModelRunner`] executes descriptors one at a time, threading
//! each parsed output into the context of later stages.

use super::fallback;
use super::peer_review::validate_criteria;
use super::prompts::render_prompt;
use super::stages::StageDescriptor;
use super::AnalysisInput;
use crate::clients::ChatModel;
use crate::errors::AIError;
use crate::types::analysis::{
    AcceptanceCriteriaValidation, AnalysisPrompt, AnalysisStep, CriterionResult, FileAnalysis, Fix,
    ReviewVerdict, TicketQualityRating,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysisOutput {
    #[serde(default)]
    pub files: Vec<FileAnalysis>,
    #[serde(default)]
    pub fixes: Vec<Fix>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskOutput {
    pub risks: Vec<String>,
    #[serde(default)]
    pub fixes: Vec<Fix>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_complexity: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcOutput {
    pub criteria: Vec<CriterionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerReviewOutput {
    pub verdict: ReviewVerdict,
    #[serde(default)]
    pub comments: Vec<String>,
}

/// Parsed result of one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    FileAnalysis(FileAnalysisOutput),
    RiskDetection(RiskOutput),
    Summary(SummaryOutput),
    Refinement(SummaryOutput),
    TicketQuality(TicketQualityRating),
    AcValidation(AcceptanceCriteriaValidation),
    PeerReview(PeerReviewOutput),
}

/// Outputs accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageContext {
    pub file_analysis: Option<FileAnalysisOutput>,
    pub risks: Option<RiskOutput>,
    pub summary: Option<SummaryOutput>,
    pub refinement: Option<SummaryOutput>,
    pub ticket_quality: Option<TicketQualityRating>,
    pub ac_validation: Option<AcceptanceCriteriaValidation>,
    pub peer_review: Option<PeerReviewOutput>,
    /// Degradation notes, surfaced as result warnings.
    pub warnings: Vec<String>,
}

impl StageContext {
    /// New context with `output` merged in.
    pub fn with_output(mut self, output: StageOutput) -> Self {
        match output {
            StageOutput::FileAnalysis(o) => self.file_analysis = Some(o),
            StageOutput::RiskDetection(o) => self.risks = Some(o),
            StageOutput::Summary(o) => self.summary = Some(o),
            StageOutput::Refinement(o) => self.refinement = Some(o),
            StageOutput::TicketQuality(o) => self.ticket_quality = Some(o),
            StageOutput::AcValidation(o) => self.ac_validation = Some(o),
            StageOutput::PeerReview(o) => self.peer_review = Some(o),
        }
        self
    }

    /// Serialized output of `step`, if it ran.
    pub fn output_json(&self, step: AnalysisStep) -> Option<Value> {
        let value = match step {
            AnalysisStep::FileAnalysis => serde_json::to_value(self.file_analysis.as_ref()?),
            AnalysisStep::RiskDetection => serde_json::to_value(self.risks.as_ref()?),
            AnalysisStep::SummaryGeneration => serde_json::to_value(self.summary.as_ref()?),
            AnalysisStep::SelfRefinement => serde_json::to_value(self.refinement.as_ref()?),
            AnalysisStep::TicketQuality => serde_json::to_value(self.ticket_quality.as_ref()?),
            AnalysisStep::AcValidation => serde_json::to_value(self.ac_validation.as_ref()?),
            AnalysisStep::PeerReview => serde_json::to_value(self.peer_review.as_ref()?),
        };
        value.ok()
    }
}

fn mismatch(step: AnalysisStep, message: impl Into<String>) -> AIError {
    AIError::SchemaMismatch {
        step: step.as_str().to_string(),
        message: message.into(),
    }
}

fn decode<T: serde::de::DeserializeOwned>(step: AnalysisStep, value: Value) -> Result<T, AIError> {
    serde_json::from_value(value).map_err(|e| mismatch(step, e.to_string()))
}

/// Checks a model answer against the stage's shape and normalizes it.
pub fn parse_stage_output(
    step: AnalysisStep,
    value: Value,
    input: &AnalysisInput,
) -> Result<StageOutput, AIError> {
    if !value.is_object() {
        return Err(mismatch(step, "expected a JSON object"));
    }
    match step {
        AnalysisStep::FileAnalysis => {
            let mut out: FileAnalysisOutput = decode(step, value)?;
            if out.files.is_empty() && !input.records.is_empty() {
                return Err(mismatch(step, "no file analyses returned"));
            }
            for file in &mut out.files {
                file.complexity = file.complexity.clamp(1, 5);
            }
            Ok(StageOutput::FileAnalysis(out))
        }
        AnalysisStep::RiskDetection => Ok(StageOutput::RiskDetection(decode(step, value)?)),
        AnalysisStep::SummaryGeneration | AnalysisStep::SelfRefinement => {
            let mut out: SummaryOutput = decode(step, value)?;
            if out.summary.trim().is_empty() {
                return Err(mismatch(step, "summary is empty"));
            }
            out.overall_complexity = out.overall_complexity.map(|c| c.clamp(1, 5));
            Ok(if step == AnalysisStep::SummaryGeneration {
                StageOutput::Summary(out)
            } else {
                StageOutput::Refinement(out)
            })
        }
        AnalysisStep::TicketQuality => {
            let mut rating: TicketQualityRating = decode(step, value)?;
            rating.overall_score = rating.overall_score.min(100);
            Ok(StageOutput::TicketQuality(rating))
        }
        AnalysisStep::AcValidation => {
            let out: AcOutput = decode(step, value)?;
            Ok(StageOutput::AcValidation(validate_criteria(
                out.criteria,
                input.config.compliance_threshold,
            )))
        }
        AnalysisStep::PeerReview => Ok(StageOutput::PeerReview(decode(step, value)?)),
    }
}

/// Executor that never calls a model.
pub struct PromptCollector;

impl PromptCollector {
    pub fn collect(plan: &[StageDescriptor], input: &AnalysisInput) -> Vec<AnalysisPrompt> {
        plan.iter()
            .map(|descriptor| render_prompt(descriptor, input, None))
            .collect()
    }
}

/// Executor that runs each stage against a model, strictly in order.
pub struct ModelRunner<'a> {
    model: Option<&'a dyn ChatModel>,
}

impl<'a> ModelRunner<'a> {
    pub fn new(model: Option<&'a dyn ChatModel>) -> Self {
        Self { model }
    }

    async fn run_stage(
        &self,
        descriptor: &StageDescriptor,
        input: &AnalysisInput,
        context: &StageContext,
    ) -> Result<StageOutput, AIError> {
        let model = self.model.ok_or(AIError::Unavailable)?;
        let prompt = render_prompt(descriptor, input, Some(context));
        let value = model.invoke(&prompt).await?;
        parse_stage_output(descriptor.step, value, input)
    }

    pub async fn run(&self, plan: &[StageDescriptor], input: &AnalysisInput) -> StageContext {
        let mut context = StageContext::default();
        if self.model.is_none() {
            tracing::warn!("No language model configured; using static analysis for every stage");
            context
                .warnings
                .push("No language model configured; results come from static analysis".to_string());
        }

        for descriptor in plan {
            let step = descriptor.step;
            tracing::debug!("Running stage {}", step);

            let output = match self.run_stage(descriptor, input, &context).await {
                Ok(output) => output,
                Err(e) => {
                    if let (Some(model), false) = (self.model, matches!(e, AIError::Unavailable)) {
                        tracing::warn!("Stage {} failed, using static fallback: {}", step, e);
                        context.warnings.push(format!(
                            "{}: {} (model {}); static fallback used",
                            step.title(),
                            e,
                            model.model_name()
                        ));
                    }
                    fallback::fallback_for(step, input, &context)
                }
            };
            context = context.with_output(output);
        }
        context
    }
}
