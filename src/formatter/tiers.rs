use super::Verbosity;

/// What one verbosity level shows. Levels only ever add features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierFeatures {
    pub single_line: bool,
    /// Cap for list sections (risks, recommendations, gaps, comments, warnings).
    pub max_items: Option<usize>,
    /// Cap for free text such as per-file summaries and prompt bodies.
    pub max_text_chars: Option<usize>,
    pub show_files: bool,
    /// Per-file risk lines under each entry of the Files section.
    pub show_file_risks: bool,
    pub show_fixes: bool,
    pub show_costs: bool,
    pub show_ticket_references: bool,
    pub show_quality_score: bool,
    pub show_dimensions: bool,
    pub show_ac_details: bool,
    pub show_test_suggestions: bool,
    pub show_classification: bool,
    pub show_prompt_bodies: bool,
}

const NOTHING: TierFeatures = TierFeatures {
    single_line: false,
    max_items: Some(0),
    max_text_chars: Some(0),
    show_files: false,
    show_file_risks: false,
    show_fixes: false,
    show_costs: false,
    show_ticket_references: false,
    show_quality_score: false,
    show_dimensions: false,
    show_ac_details: false,
    show_test_suggestions: false,
    show_classification: false,
    show_prompt_bodies: false,
};

const MINIMAL: TierFeatures = TierFeatures {
    single_line: true,
    ..NOTHING
};

const COMPACT: TierFeatures = TierFeatures {
    max_items: Some(3),
    max_text_chars: Some(120),
    ..NOTHING
};

const STANDARD: TierFeatures = TierFeatures {
    max_items: Some(5),
    max_text_chars: Some(240),
    show_files: true,
    show_fixes: true,
    show_costs: true,
    show_ticket_references: true,
    show_quality_score: true,
    ..COMPACT
};

const DETAILED: TierFeatures = TierFeatures {
    max_items: None,
    max_text_chars: Some(600),
    show_file_risks: true,
    show_dimensions: true,
    show_ac_details: true,
    show_test_suggestions: true,
    show_classification: true,
    ..STANDARD
};

const VERBOSE: TierFeatures = TierFeatures {
    max_text_chars: None,
    show_prompt_bodies: true,
    ..DETAILED
};

/// Indexed by [`Verbosity::index`].
const TIERS: [TierFeatures; 5] = [MINIMAL, COMPACT, STANDARD, DETAILED, VERBOSE];

pub fn features(verbosity: Verbosity) -> &'static TierFeatures {
    &TIERS[verbosity.index()]
}

/// Applies a list cap, returning the kept items and how many were dropped.
pub fn cap<T: Clone>(items: &[T], max: Option<usize>) -> (Vec<T>, usize) {
    match max {
        Some(n) if items.len() > n => (items[..n].to_vec(), items.len() - n),
        _ => (items.to_vec(), 0),
    }
}

pub fn clip(text: &str, max: Option<usize>) -> String {
    match max {
        Some(n) if text.chars().count() > n => {
            let kept: String = text.chars().take(n).collect();
            format!("{}…", kept.trim_end())
        }
        _ => text.to_string(),
    }
}
