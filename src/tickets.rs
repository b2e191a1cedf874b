//! Ticket reference extraction from change metadata.
//!
//! Each source (title, branch, description, commits) carries a fixed
//! confidence. A key found in several places keeps only its most trusted
//! sighting, and the final list is ordered by confidence.

use crate::config::analysis_config::{ConfidenceWeights, DEFAULT_TICKET_PATTERN};
use crate::errors::ContractError;
use crate::types::ticket::{TicketReference, TicketSource};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref DEFAULT_PATTERN: Regex = Regex::new(DEFAULT_TICKET_PATTERN).unwrap();
}

/// The text fragments a change offers for ticket discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketSources<'a> {
    pub title: Option<&'a str>,
    pub branch_name: &'a str,
    pub description: Option<&'a str>,
    pub commit_messages: &'a [String],
}

impl<'a> TicketSources<'a> {
    /// Fragments in discovery order.
    fn fragments(&self) -> Vec<(TicketSource, &'a str)> {
        let mut fragments = Vec::with_capacity(3 + self.commit_messages.len());
        if let Some(title) = self.title {
            fragments.push((TicketSource::Title, title));
        }
        fragments.push((TicketSource::Branch, self.branch_name));
        if let Some(description) = self.description {
            fragments.push((TicketSource::Description, description));
        }
        for message in self.commit_messages {
            fragments.push((TicketSource::Commit, message.as_str()));
        }
        fragments
    }
}

/// `true` when `candidate` should replace `existing` for the same key.
///
/// Higher confidence wins; on a tie the earlier sighting stays.
pub fn prefer_candidate(existing: &TicketReference, candidate: &TicketReference) -> bool {
    candidate.confidence > existing.confidence
}

/// Ordered key -> reference map with the keep-higher-else-first rule.
#[derive(Debug, Default)]
pub struct ReferenceSet {
    order: Vec<TicketReference>,
    index: HashMap<String, usize>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, candidate: TicketReference) {
        match self.index.get(&candidate.key) {
            Some(&slot) => {
                if prefer_candidate(&self.order[slot], &candidate) {
                    self.order[slot] = candidate;
                }
            }
            None => {
                self.index.insert(candidate.key.clone(), self.order.len());
                self.order.push(candidate);
            }
        }
    }

    /// References sorted by descending confidence, discovery order on ties.
    pub fn into_ranked(self) -> Vec<TicketReference> {
        let mut refs = self.order;
        // sort_by is stable, which keeps discovery order for equal confidence
        refs.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        refs
    }
}

/// Compiled extraction settings.
#[derive(Debug, Clone)]
pub struct TicketExtractor {
    pattern: Regex,
    project_prefix: Option<String>,
    weights: ConfidenceWeights,
}

impl Default for TicketExtractor {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
            project_prefix: None,
            weights: ConfidenceWeights::default(),
        }
    }
}

impl TicketExtractor {
    pub fn new(pattern: &str, project_prefix: Option<&str>) -> Result<Self, ContractError> {
        let pattern = Regex::new(pattern).map_err(|e| ContractError::InvalidTicketPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            project_prefix: project_prefix
                .map(|p| p.trim().to_uppercase())
                .filter(|p| !p.is_empty()),
            weights: ConfidenceWeights::default(),
        })
    }

    pub fn with_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.weights = weights;
        self
    }

    fn accepts(&self, key: &str) -> bool {
        match &self.project_prefix {
            Some(prefix) => key.starts_with(prefix.as_str()),
            None => true,
        }
    }

    pub fn extract(&self, sources: &TicketSources<'_>) -> Vec<TicketReference> {
        let mut set = ReferenceSet::new();

        for (source, text) in sources.fragments() {
            let confidence = self.weights.for_source(source);
            for found in self.pattern.find_iter(text) {
                if found.as_str().is_empty() {
                    continue;
                }
                let key = found.as_str().to_uppercase();
                if !self.accepts(&key) {
                    continue;
                }
                set.merge(TicketReference {
                    key,
                    source,
                    confidence,
                });
            }
        }

        let refs = set.into_ranked();
        tracing::debug!("Extracted {} ticket reference(s)", refs.len());
        refs
    }
}

/// Convenience wrapper over [`TicketExtractor`] with default weights.
pub fn extract_ticket_references(
    title: Option<&str>,
    branch_name: &str,
    commit_messages: &[String],
    ticket_pattern: &str,
    default_project_prefix: Option<&str>,
) -> Result<Vec<TicketReference>, ContractError> {
    let extractor = TicketExtractor::new(ticket_pattern, default_project_prefix)?;
    Ok(extractor.extract(&TicketSources {
        title,
        branch_name,
        description: None,
        commit_messages,
    }))
}
