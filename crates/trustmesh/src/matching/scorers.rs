//! One scorer per dimension. Every scorer returns a value in `[0, 1]`.

use std::collections::HashSet;
use std::sync::Arc;

use super::graph::ConnectionGraph;
use super::opportunity::Opportunity;
use super::weights::Dimension;
use crate::privacy::PartialProfile;

pub trait DimensionScorer: Send + Sync {
    fn dimension(&self) -> Dimension;

    fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> f64;
}

fn normalized(tags: &[String]) -> HashSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fraction of `required` found in `offered`, case-insensitively.
/// Nothing required counts as fully covered.
fn coverage(required: &[String], offered: &[String]) -> f64 {
    let required = normalized(required);
    if required.is_empty() {
        return 1.0;
    }
    let offered = normalized(offered);
    required.intersection(&offered).count() as f64 / required.len() as f64
}

/// Required skills the candidate visibly has, in the opportunity's spelling.
pub fn matched_skills(candidate: &PartialProfile, opportunity: &Opportunity) -> Vec<String> {
    let offered = normalized(candidate.skills());
    let mut seen = HashSet::new();
    opportunity
        .required_skills
        .iter()
        .filter(|skill| {
            let key = skill.trim().to_lowercase();
            offered.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

pub struct SkillScorer;

impl DimensionScorer for SkillScorer {
    fn dimension(&self) -> Dimension {
        Dimension::Skill
    }

    fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> f64 {
        coverage(&opportunity.required_skills, candidate.skills())
    }
}

pub struct AvailabilityScorer;

impl DimensionScorer for AvailabilityScorer {
    fn dimension(&self) -> Dimension {
        Dimension::Availability
    }

    fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> f64 {
        let Some(window) = candidate.availability() else {
            return 0.0;
        };
        let timeline = &opportunity.timeline;
        if timeline.is_empty() {
            // A point-in-time opportunity: available or not.
            return if window.start <= timeline.start && timeline.start < window.end { 1.0 } else { 0.0 };
        }
        (window.overlap(timeline) as f64 / timeline.len() as f64).clamp(0.0, 1.0)
    }
}

pub struct NetworkScorer {
    graph: Arc<dyn ConnectionGraph>,
    hop_limit: u32,
}

impl NetworkScorer {
    pub fn new(graph: Arc<dyn ConnectionGraph>, hop_limit: u32) -> Self {
        Self { graph, hop_limit }
    }
}

impl DimensionScorer for NetworkScorer {
    fn dimension(&self) -> Dimension {
        Dimension::Network
    }

    fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> f64 {
        match self.graph.distance(candidate.owner(), &opportunity.creator, self.hop_limit) {
            Some(0) => 1.0,
            Some(d) => 1.0 / f64::from(d),
            None => 0.0,
        }
    }
}

/// Overlap of the candidate's interests with the opportunity's category and
/// required skills, as a fraction of the latter.
pub struct InterestScorer;

impl DimensionScorer for InterestScorer {
    fn dimension(&self) -> Dimension {
        Dimension::Interest
    }

    fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> f64 {
        let mut targets = normalized(&opportunity.required_skills);
        let category = opportunity.category.trim().to_lowercase();
        if !category.is_empty() {
            targets.insert(category);
        }
        if targets.is_empty() {
            return 0.0;
        }
        let interests = normalized(candidate.interests());
        targets.intersection(&interests).count() as f64 / targets.len() as f64
    }
}

pub struct ResourceScorer;

impl DimensionScorer for ResourceScorer {
    fn dimension(&self) -> Dimension {
        Dimension::Resource
    }

    fn score(&self, candidate: &PartialProfile, opportunity: &Opportunity) -> f64 {
        coverage(&opportunity.required_resources, candidate.resources())
    }
}

pub struct TrackRecordScorer;

impl DimensionScorer for TrackRecordScorer {
    fn dimension(&self) -> Dimension {
        Dimension::TrackRecord
    }

    fn score(&self, candidate: &PartialProfile, _opportunity: &Opportunity) -> f64 {
        match candidate.track_record() {
            Some(record) if record.completed > 0 => {
                (f64::from(record.successful) / f64::from(record.completed)).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// The standard scorer for every dimension.
pub fn default_scorers(graph: Arc<dyn ConnectionGraph>, hop_limit: u32) -> Vec<Box<dyn DimensionScorer>> {
    vec![
        Box::new(SkillScorer),
        Box::new(AvailabilityScorer),
        Box::new(NetworkScorer::new(graph, hop_limit)),
        Box::new(InterestScorer),
        Box::new(ResourceScorer),
        Box::new(TrackRecordScorer),
    ]
}
