//! The disclosure filter.

use tracing::warn;

use super::levels::{effective_level, ConnectionTier, DisclosureLevel};
use super::profile::{PartialProfile, Profile};
use super::settings::PrivacySettings;
use crate::identity::IdentityId;

/// Reduce `profile` to what a viewer in `tier` may see: a field is kept iff
/// its configured level is at most the tier's effective level.
///
/// Settings belonging to someone else disclose nothing.
pub fn filter(profile: &Profile, settings: &PrivacySettings, tier: ConnectionTier) -> PartialProfile {
    filter_at(profile, settings, effective_level(tier))
}

/// Like [`filter`], resolving the viewer's tier from the owner's settings.
/// Owners always see their full profile.
pub fn filter_for_viewer(profile: &Profile, settings: &PrivacySettings, viewer: &IdentityId) -> PartialProfile {
    if viewer == profile.owner() {
        return filter_at(profile, settings, DisclosureLevel::Close);
    }
    filter(profile, settings, settings.tier_of(viewer))
}

fn filter_at(profile: &Profile, settings: &PrivacySettings, allowed: DisclosureLevel) -> PartialProfile {
    let mut view = PartialProfile::new(profile.owner().clone(), allowed);
    if &settings.owner != profile.owner() {
        warn!(
            target: "trustmesh::audit",
            event = "privacy_settings_mismatch",
            profile = %profile.owner(),
            settings = %settings.owner,
            "Filtering with another owner's settings; disclosing nothing"
        );
        return view;
    }
    for (field, value) in profile.fields() {
        if settings.level_of(field) <= allowed {
            view.insert(field, value.clone());
        }
    }
    view
}
