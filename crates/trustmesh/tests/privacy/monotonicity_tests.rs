//! Field presence is decided by level alone, and more trust never hides data.

use proptest::prelude::*;
use trustmesh::privacy::{
    effective_level, filter, AvailabilityWindow, ConnectionTier, DisclosureLevel, FieldValue, PrivacySettings,
    Profile, ProfileField, TrackRecord,
};

fn value_for(field: ProfileField) -> FieldValue {
    match field {
        ProfileField::Skills | ProfileField::Interests | ProfileField::Resources => {
            FieldValue::Tags(vec![format!("{field}-tag")])
        }
        ProfileField::Availability => FieldValue::Window(AvailabilityWindow { start: 0, end: 10 }),
        ProfileField::TrackRecord => FieldValue::TrackRecord(TrackRecord { completed: 3, successful: 1 }),
        _ => FieldValue::Text(format!("{field}-value")),
    }
}

fn any_level() -> impl Strategy<Value = DisclosureLevel> {
    prop::sample::select(DisclosureLevel::ALL.to_vec())
}

fn any_tier() -> impl Strategy<Value = ConnectionTier> {
    prop::sample::select(ConnectionTier::ALL.to_vec())
}

/// A profile with a random subset of fields filled and random levels set.
fn any_profile() -> impl Strategy<Value = (Profile, PrivacySettings)> {
    (
        prop::collection::vec(any::<bool>(), ProfileField::ALL.len()),
        prop::collection::vec(prop::option::of(any_level()), ProfileField::ALL.len()),
    )
        .prop_map(|(present, levels)| {
            let mut profile = Profile::new("owner".into());
            let mut settings = PrivacySettings::new("owner".into());
            for (i, field) in ProfileField::ALL.into_iter().enumerate() {
                if present[i] {
                    profile.set(field, value_for(field)).unwrap();
                }
                if let Some(level) = levels[i] {
                    settings.set_field_level(field, level);
                }
            }
            (profile, settings)
        })
}

proptest! {
    #[test]
    fn field_present_iff_level_allows((profile, settings) in any_profile(), tier in any_tier()) {
        let view = filter(&profile, &settings, tier);
        for field in ProfileField::ALL {
            let expected = profile.get(field).is_some() && settings.level_of(field) <= effective_level(tier);
            prop_assert_eq!(view.contains(field), expected, "field {}", field);
            if expected {
                prop_assert_eq!(view.get(field), profile.get(field));
            }
        }
    }

    #[test]
    fn higher_tier_sees_superset((profile, settings) in any_profile(), a in any_tier(), b in any_tier()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_view = filter(&profile, &settings, low);
        let high_view = filter(&profile, &settings, high);
        for field in low_view.visible_fields() {
            prop_assert!(high_view.contains(field), "{} visible at {} but not at {}", field, low, high);
        }
    }
}

#[test]
fn test_unset_levels_default_public() {
    let profile = Profile::new("owner".into())
        .with(ProfileField::Headline, value_for(ProfileField::Headline))
        .unwrap();
    let view = filter(&profile, &PrivacySettings::new("owner".into()), ConnectionTier::Unconnected);
    assert!(view.contains(ProfileField::Headline));
}
