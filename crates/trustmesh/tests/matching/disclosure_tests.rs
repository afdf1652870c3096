//! A restricted view can never score higher than a fuller view of the same
//! profile.

use std::sync::Arc;

use proptest::prelude::*;
use trustmesh::config::MatchingConfig;
use trustmesh::matching::{MatchingEngine, MemoryConnectionGraph, Opportunity};
use trustmesh::privacy::{
    filter, AvailabilityWindow, ConnectionTier, DisclosureLevel, FieldValue, PrivacySettings, Profile, ProfileField,
    TrackRecord,
};

const VOCAB: &[&str] = &["rust", "go", "design", "audio", "studio", "dsp"];

fn tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(VOCAB), 0..4)
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

fn level() -> impl Strategy<Value = DisclosureLevel> {
    prop::sample::select(DisclosureLevel::ALL.to_vec())
}

prop_compose! {
    fn scenario()(
        skills in tags(),
        interests in tags(),
        resources in tags(),
        required in tags(),
        offered in tags(),
        start in 0i64..100,
        levels in prop::collection::vec(level(), 5),
        completed in 1u32..20,
    ) -> (Profile, PrivacySettings, Opportunity) {
        let profile = Profile::new("cand".into())
            .with(ProfileField::Skills, FieldValue::Tags(skills)).unwrap()
            .with(ProfileField::Interests, FieldValue::Tags(interests)).unwrap()
            .with(ProfileField::Resources, FieldValue::Tags(resources)).unwrap()
            .with(ProfileField::Availability, FieldValue::Window(AvailabilityWindow { start, end: start + 50 })).unwrap()
            .with(ProfileField::TrackRecord, FieldValue::TrackRecord(TrackRecord { completed, successful: completed / 2 })).unwrap();

        let mut settings = PrivacySettings::new("cand".into());
        let scored = [
            ProfileField::Skills,
            ProfileField::Interests,
            ProfileField::Resources,
            ProfileField::Availability,
            ProfileField::TrackRecord,
        ];
        for (field, level) in scored.into_iter().zip(levels) {
            settings.set_field_level(field, level);
        }

        let opportunity = Opportunity::new("opp", "creator".into(), "audio", AvailabilityWindow { start: 20, end: 120 })
            .with_skills(required)
            .with_resources(offered);
        (profile, settings, opportunity)
    }
}

proptest! {
    #[test]
    fn public_view_never_outscores_close_view((profile, settings, opportunity) in scenario()) {
        let engine = MatchingEngine::new(Arc::new(MemoryConnectionGraph::new()), &MatchingConfig::default()).unwrap();

        let mut previous = None;
        for tier in ConnectionTier::ALL {
            let score = engine.score(&filter(&profile, &settings, tier), &opportunity).total_score;
            if let Some(lower) = previous {
                prop_assert!(score >= lower, "{} scored {} < {}", tier, score, lower);
            }
            previous = Some(score);
        }
    }
}

#[test]
fn test_hidden_skills_score_zero() {
    let profile = Profile::new("cand".into())
        .with(ProfileField::Skills, FieldValue::Tags(vec!["rust".into()]))
        .unwrap();
    let mut settings = PrivacySettings::new("cand".into());
    settings.set_field_level(ProfileField::Skills, DisclosureLevel::Close);
    let opportunity =
        Opportunity::new("opp", "creator".into(), "dev", AvailabilityWindow { start: 0, end: 1 }).with_skills(["rust"]);
    let engine = MatchingEngine::new(Arc::new(MemoryConnectionGraph::new()), &MatchingConfig::default()).unwrap();

    let public = engine.score(&filter(&profile, &settings, ConnectionTier::Unconnected), &opportunity);
    let close = engine.score(&filter(&profile, &settings, ConnectionTier::CloseCollaborator), &opportunity);
    assert_eq!(public.dimension_scores.skill, 0.0);
    assert!(public.matched_skills.is_empty());
    assert_eq!(close.dimension_scores.skill, 1.0);
    assert!(close.total_score > public.total_score);
}
