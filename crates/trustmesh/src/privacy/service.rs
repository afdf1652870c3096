//! Owner-scoped store behind the privacy settings API.
//!
//! Every mutation names the acting identity and is refused unless it is the
//! owner. Batch updates are applied under one write lock after all input is
//! validated, so they land completely or not at all.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

use super::filter::filter_for_viewer;
use super::levels::{ConnectionTier, DisclosureLevel};
use super::profile::{PartialProfile, Profile, ProfileField};
use super::settings::PrivacySettings;
use crate::identity::IdentityId;
use crate::{Error, Result};

#[derive(Default)]
pub struct PrivacyService {
    settings: RwLock<HashMap<IdentityId, PrivacySettings>>,
    profiles: RwLock<HashMap<IdentityId, Profile>>,
}

fn ensure_owner(actor: &IdentityId, owner: &IdentityId, resource: &str) -> Result<()> {
    if actor != owner {
        return Err(Error::NotOwner { actor: actor.clone(), resource: format!("{resource} of {owner}") });
    }
    Ok(())
}

impl PrivacyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings; an owner who never changed anything gets defaults.
    pub fn settings(&self, owner: &IdentityId) -> PrivacySettings {
        self.settings
            .read()
            .get(owner)
            .cloned()
            .unwrap_or_else(|| PrivacySettings::new(owner.clone()))
    }

    pub fn set_field_level(
        &self,
        actor: &IdentityId,
        owner: &IdentityId,
        field: ProfileField,
        level: DisclosureLevel,
    ) -> Result<()> {
        self.set_field_levels(actor, owner, [(field, level)])
    }

    /// Apply several field levels at once.
    pub fn set_field_levels(
        &self,
        actor: &IdentityId,
        owner: &IdentityId,
        levels: impl IntoIterator<Item = (ProfileField, DisclosureLevel)>,
    ) -> Result<()> {
        ensure_owner(actor, owner, "privacy settings")?;
        let levels: Vec<_> = levels.into_iter().collect();

        let mut all = self.settings.write();
        let settings = all.entry(owner.clone()).or_insert_with(|| PrivacySettings::new(owner.clone()));
        for (field, level) in &levels {
            settings.set_field_level(*field, *level);
        }
        drop(all);

        for (field, level) in levels {
            info!(
                target: "trustmesh::audit",
                event = "disclosure_changed",
                owner = %owner,
                %field,
                %level,
                "Field disclosure level updated"
            );
        }
        Ok(())
    }

    /// Parse and apply raw `field -> level` pairs; nothing is applied if any
    /// pair is invalid.
    pub fn set_field_levels_raw<'a>(
        &self,
        actor: &IdentityId,
        owner: &IdentityId,
        raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<()> {
        let parsed = raw
            .into_iter()
            .map(|(field, level)| -> Result<(ProfileField, DisclosureLevel)> {
                Ok((field.parse()?, level.parse()?))
            })
            .collect::<Result<Vec<_>>>()?;
        self.set_field_levels(actor, owner, parsed)
    }

    pub fn set_connection_tier(
        &self,
        actor: &IdentityId,
        owner: &IdentityId,
        connection: &IdentityId,
        tier: ConnectionTier,
    ) -> Result<()> {
        ensure_owner(actor, owner, "connection tiers")?;
        self.settings
            .write()
            .entry(owner.clone())
            .or_insert_with(|| PrivacySettings::new(owner.clone()))
            .set_connection_tier(connection.clone(), tier);

        info!(
            target: "trustmesh::audit",
            event = "connection_tier_changed",
            owner = %owner,
            connection = %connection,
            %tier,
            "Connection tier updated"
        );
        Ok(())
    }

    pub fn connection_tier(&self, owner: &IdentityId, connection: &IdentityId) -> ConnectionTier {
        self.settings.read().get(owner).map(|s| s.tier_of(connection)).unwrap_or_default()
    }

    /// Store or replace the actor's own profile.
    pub fn put_profile(&self, actor: &IdentityId, profile: Profile) -> Result<()> {
        ensure_owner(actor, profile.owner(), "profile")?;
        self.profiles.write().insert(profile.owner().clone(), profile);
        Ok(())
    }

    pub fn profile_owners(&self) -> Vec<IdentityId> {
        self.profiles.read().keys().cloned().collect()
    }

    /// The owner's profile as `viewer` may see it.
    pub fn view(&self, owner: &IdentityId, viewer: &IdentityId) -> Result<PartialProfile> {
        let profiles = self.profiles.read();
        let profile = profiles.get(owner).ok_or_else(|| Error::ProfileNotFound(owner.clone()))?;
        Ok(filter_for_viewer(profile, &self.settings(owner), viewer))
    }
}
