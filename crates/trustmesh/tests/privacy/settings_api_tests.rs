//! The owner-only settings store.

use trustmesh::privacy::{ConnectionTier, DisclosureLevel, FieldValue, PrivacyService, Profile, ProfileField};
use trustmesh::{Error, IdentityId};

#[test]
fn test_setting_takes_effect_on_next_read() {
    let service = PrivacyService::new();
    let alice: IdentityId = "alice".into();
    let bob: IdentityId = "bob".into();
    let profile = Profile::new(alice.clone())
        .with(ProfileField::Location, FieldValue::Text("Porto".into()))
        .unwrap();
    service.put_profile(&alice, profile).unwrap();

    assert!(service.view(&alice, &bob).unwrap().contains(ProfileField::Location));
    service.set_field_level(&alice, &alice, ProfileField::Location, DisclosureLevel::Close).unwrap();
    assert!(!service.view(&alice, &bob).unwrap().contains(ProfileField::Location));
    service.set_connection_tier(&alice, &alice, &bob, ConnectionTier::CloseCollaborator).unwrap();
    assert!(service.view(&alice, &bob).unwrap().contains(ProfileField::Location));
}

#[test]
fn test_rejected_batch_changes_nothing() {
    let service = PrivacyService::new();
    let alice: IdentityId = "alice".into();
    service.set_field_level(&alice, &alice, ProfileField::Email, DisclosureLevel::Close).unwrap();
    let before = service.settings(&alice);

    let result = service.set_field_levels_raw(&alice, &alice, [("email", "public"), ("headline", "5")]);
    assert!(matches!(result, Err(Error::InvalidDisclosureLevel(_))));
    assert_eq!(service.settings(&alice), before);

    let result = service.set_field_levels_raw(&"mallory".into(), &alice, [("email", "public")]);
    assert!(matches!(result, Err(Error::NotOwner { .. })));
    assert_eq!(service.settings(&alice), before);
}
