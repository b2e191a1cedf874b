//! The fixed stage pipeline and the rules selecting which stages run.

use crate::config::AnalysisConfig;
use crate::types::analysis::{AnalysisModes, AnalysisStep};

/// One entry of the pipeline. Both executors walk the same descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub step: AnalysisStep,
    /// Earlier stages whose parsed output this stage reads when executed.
    pub reads: &'static [AnalysisStep],
}

const PIPELINE: [StageDescriptor; 7] = [
    StageDescriptor {
        step: AnalysisStep::FileAnalysis,
        reads: &[],
    },
    StageDescriptor {
        step: AnalysisStep::RiskDetection,
        reads: &[AnalysisStep::FileAnalysis],
    },
    StageDescriptor {
        step: AnalysisStep::SummaryGeneration,
        reads: &[AnalysisStep::FileAnalysis, AnalysisStep::RiskDetection],
    },
    StageDescriptor {
        step: AnalysisStep::SelfRefinement,
        reads: &[AnalysisStep::SummaryGeneration, AnalysisStep::RiskDetection],
    },
    StageDescriptor {
        step: AnalysisStep::TicketQuality,
        reads: &[],
    },
    StageDescriptor {
        step: AnalysisStep::AcValidation,
        reads: &[AnalysisStep::FileAnalysis, AnalysisStep::SummaryGeneration],
    },
    StageDescriptor {
        step: AnalysisStep::PeerReview,
        reads: &[
            AnalysisStep::TicketQuality,
            AnalysisStep::AcValidation,
            AnalysisStep::RiskDetection,
            AnalysisStep::SelfRefinement,
            AnalysisStep::SummaryGeneration,
        ],
    },
];

/// Whether `step` takes part in a run with these flags.
fn is_selected(
    step: AnalysisStep,
    modes: &AnalysisModes,
    has_primary_ticket: bool,
    config: &AnalysisConfig,
) -> bool {
    match step {
        AnalysisStep::FileAnalysis => true,
        AnalysisStep::RiskDetection => modes.risks,
        AnalysisStep::SummaryGeneration => modes.summary,
        AnalysisStep::SelfRefinement => modes.summary && config.self_refinement,
        AnalysisStep::TicketQuality | AnalysisStep::AcValidation | AnalysisStep::PeerReview => {
            has_primary_ticket && config.peer_review
        }
    }
}

/// Ordered stage list for one invocation.
pub fn build_stage_plan(
    modes: &AnalysisModes,
    has_primary_ticket: bool,
    config: &AnalysisConfig,
) -> Vec<StageDescriptor> {
    PIPELINE
        .iter()
        .copied()
        .filter(|d| is_selected(d.step, modes, has_primary_ticket, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(plan: &[StageDescriptor]) -> Vec<AnalysisStep> {
        plan.iter().map(|d| d.step).collect()
    }

    #[test]
    fn test_full_plan_follows_pipeline_order() {
        let plan = build_stage_plan(&AnalysisModes::default(), true, &AnalysisConfig::default());
        assert_eq!(steps(&plan), AnalysisStep::ALL.to_vec());
    }

    #[test]
    fn test_ticket_stages_need_a_primary_ticket() {
        let plan = build_stage_plan(&AnalysisModes::default(), false, &AnalysisConfig::default());
        assert_eq!(
            steps(&plan),
            vec![
                AnalysisStep::FileAnalysis,
                AnalysisStep::RiskDetection,
                AnalysisStep::SummaryGeneration,
                AnalysisStep::SelfRefinement,
            ]
        );

        let config = AnalysisConfig {
            peer_review: false,
            ..AnalysisConfig::default()
        };
        let plan = build_stage_plan(&AnalysisModes::default(), true, &config);
        assert!(!steps(&plan).contains(&AnalysisStep::PeerReview));
    }

    #[test]
    fn test_mode_flags_drop_stages() {
        let modes = AnalysisModes {
            summary: false,
            risks: false,
            complexity: false,
        };
        let plan = build_stage_plan(&modes, true, &AnalysisConfig::default());
        assert_eq!(
            steps(&plan),
            vec![
                AnalysisStep::FileAnalysis,
                AnalysisStep::TicketQuality,
                AnalysisStep::AcValidation,
                AnalysisStep::PeerReview,
            ]
        );

        let config = AnalysisConfig {
            self_refinement: false,
            ..AnalysisConfig::default()
        };
        let plan = build_stage_plan(&AnalysisModes::default(), false, &config);
        assert!(!steps(&plan).contains(&AnalysisStep::SelfRefinement));
    }

    #[test]
    fn test_reads_only_point_backwards() {
        for (i, descriptor) in PIPELINE.iter().enumerate() {
            for read in descriptor.reads {
                let pos = PIPELINE.iter().position(|d| d.step == *read).unwrap();
                assert!(pos < i, "{} reads later stage {}", descriptor.step, read);
            }
        }
    }
}
