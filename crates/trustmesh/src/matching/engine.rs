//! Weighted opportunity scoring.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::ConnectionGraph;
use super::opportunity::Opportunity;
use super::scorers::{default_scorers, matched_skills, DimensionScorer};
use super::weights::{self, Dimension, WeightTable, WEIGHTS};
use crate::config::MatchingConfig;
use crate::identity::IdentityId;
use crate::privacy::PartialProfile;
use crate::Result;

/// Per-dimension sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub skill: f64,
    pub availability: f64,
    pub network: f64,
    pub interest: f64,
    pub resource: f64,
    pub track_record: f64,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Skill => self.skill,
            Dimension::Availability => self.availability,
            Dimension::Network => self.network,
            Dimension::Interest => self.interest,
            Dimension::Resource => self.resource,
            Dimension::TrackRecord => self.track_record,
        }
    }

    fn set(&mut self, dimension: Dimension, value: f64) {
        let slot = match dimension {
            Dimension::Skill => &mut self.skill,
            Dimension::Availability => &mut self.availability,
            Dimension::Network => &mut self.network,
            Dimension::Interest => &mut self.interest,
            Dimension::Resource => &mut self.resource,
            Dimension::TrackRecord => &mut self.track_record,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub opportunity_id: String,
    pub candidate_id: IdentityId,
    /// 0 to 100
    pub total_score: u8,
    pub dimension_scores: DimensionScores,
    pub matched_skills: Vec<String>,
}

pub struct MatchingEngine {
    scorers: Vec<Box<dyn DimensionScorer>>,
    weights: WeightTable,
}

impl MatchingEngine {
    pub fn new(graph: Arc<dyn ConnectionGraph>, config: &MatchingConfig) -> Result<Self> {
        Self::with_weights(default_scorers(graph, config.hop_limit), WEIGHTS)
    }

    /// Build from explicit parts. The weight table is re-checked here.
    pub fn with_weights(scorers: Vec<Box<dyn DimensionScorer>>, weights: WeightTable) -> Result<Self> {
        weights::validate(&weights)?;
        let mut engine = Self { scorers: Vec::with_capacity(Dimension::ALL.len()), weights };
        for scorer in scorers {
            engine.replace_scorer(scorer);
        }
        Ok(engine)
    }

    /// Substitute the scorer for one dimension.
    pub fn replace_scorer(&mut self, scorer: Box<dyn DimensionScorer>) {
        let dimension = scorer.dimension();
        self.scorers.retain(|s| s.dimension() != dimension);
        self.scorers.push(scorer);
    }

    /// Score one filtered candidate against one opportunity. Dimensions with
    /// no scorer contribute 0.
    pub fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> MatchResult {
        let mut dimension_scores = DimensionScores::default();
        for scorer in &self.scorers {
            let value = scorer.score(candidate, opportunity);
            let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
            dimension_scores.set(scorer.dimension(), value);
        }

        let weighted: f64 = Dimension::ALL
            .iter()
            .map(|d| weights::weight_of(&self.weights, *d) * dimension_scores.get(*d))
            .sum();
        let total_score = (weighted * 100.0).round().clamp(0.0, 100.0) as u8;

        MatchResult {
            opportunity_id: opportunity.id.clone(),
            candidate_id: candidate.owner().clone(),
            total_score,
            dimension_scores,
            matched_skills: matched_skills(candidate, opportunity),
        }
    }

    /// Score every candidate against every opportunity.
    pub fn batch_recompute(&self, candidates: &[PartialProfile], opportunities: &[Opportunity]) -> Vec<MatchResult> {
        let results: Vec<_> = candidates
            .iter()
            .flat_map(|c| opportunities.iter().map(move |o| self.score(c, o)))
            .collect();
        debug!(candidates = candidates.len(), opportunities = opportunities.len(), "Batch match recompute");
        results
    }

    /// Rescore one candidate after a profile change.
    pub fn on_profile_update(&self, candidate: &PartialProfile, opportunities: &[Opportunity]) -> Vec<MatchResult> {
        opportunities.iter().map(|o| self.score(candidate, o)).collect()
    }
}
