//! Totals stay within 0..=100 and the weight table sums to one.

use std::sync::Arc;

use proptest::prelude::*;
use trustmesh::config::MatchingConfig;
use trustmesh::matching::weights::{validate, weight_of, Dimension, WEIGHTS};
use trustmesh::matching::{MatchingEngine, MemoryConnectionGraph, Opportunity};
use trustmesh::privacy::{
    filter, AvailabilityWindow, ConnectionTier, FieldValue, PrivacySettings, Profile, ProfileField, TrackRecord,
};

const VOCAB: &[&str] = &["rust", "go", "design", "audio", "studio", "camera", "dsp", "sql"];

fn tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(VOCAB), 0..5)
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

fn window() -> impl Strategy<Value = AvailabilityWindow> {
    (0i64..1_000, 0i64..1_000).prop_map(|(a, len)| AvailabilityWindow { start: a, end: a + len })
}

fn candidate_profile() -> impl Strategy<Value = Profile> {
    (tags(), tags(), tags(), prop::option::of(window()), prop::option::of((0u32..50, 0u32..50))).prop_map(
        |(skills, interests, resources, availability, record)| {
            let mut profile = Profile::new("cand".into());
            profile.set(ProfileField::Skills, FieldValue::Tags(skills)).unwrap();
            profile.set(ProfileField::Interests, FieldValue::Tags(interests)).unwrap();
            profile.set(ProfileField::Resources, FieldValue::Tags(resources)).unwrap();
            if let Some(window) = availability {
                profile.set(ProfileField::Availability, FieldValue::Window(window)).unwrap();
            }
            if let Some((a, b)) = record {
                let record = TrackRecord { completed: a.max(b), successful: a.min(b) };
                profile.set(ProfileField::TrackRecord, FieldValue::TrackRecord(record)).unwrap();
            }
            profile
        },
    )
}

fn opportunity() -> impl Strategy<Value = Opportunity> {
    (prop::sample::select(VOCAB), tags(), tags(), window()).prop_map(|(category, skills, resources, timeline)| {
        Opportunity::new("opp", "creator".into(), category, timeline)
            .with_skills(skills)
            .with_resources(resources)
    })
}

fn engine(graph: Arc<MemoryConnectionGraph>) -> MatchingEngine {
    MatchingEngine::new(graph, &MatchingConfig::default()).unwrap()
}

#[test]
fn test_weights_sum_to_one() {
    validate(&WEIGHTS).unwrap();
    let total: f64 = Dimension::ALL.iter().map(|d| weight_of(&WEIGHTS, *d)).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

proptest! {
    #[test]
    fn total_score_is_bounded(profile in candidate_profile(), opportunity in opportunity(), connected in any::<bool>()) {
        let graph = Arc::new(MemoryConnectionGraph::new());
        if connected {
            graph.connect(&"cand".into(), &"creator".into());
        }
        let engine = engine(graph);
        let view = filter(&profile, &PrivacySettings::new("cand".into()), ConnectionTier::Unconnected);
        let result = engine.score(&view, &opportunity);

        prop_assert!(result.total_score <= 100);
        for dimension in Dimension::ALL {
            let s = result.dimension_scores.get(dimension);
            prop_assert!((0.0..=1.0).contains(&s), "{} scored {}", dimension, s);
        }
    }
}
