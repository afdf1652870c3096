//! Per-owner disclosure choices: a level for each profile field and a tier
//! for each connection. Anything unset falls back to the most open level
//! and the least trusted tier.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::levels::{ConnectionTier, DisclosureLevel};
use super::profile::ProfileField;
use crate::identity::IdentityId;

/// Per-owner disclosure settings.
///
/// Unset fields are public; unknown viewers are unconnected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub owner: IdentityId,
    #[serde(default)]
    pub field_levels: BTreeMap<ProfileField, DisclosureLevel>,
    #[serde(default)]
    pub connection_tiers: HashMap<IdentityId, ConnectionTier>,
}

impl PrivacySettings {
    pub fn new(owner: IdentityId) -> Self {
        Self { owner, field_levels: BTreeMap::new(), connection_tiers: HashMap::new() }
    }

    pub fn level_of(&self, field: ProfileField) -> DisclosureLevel {
        self.field_levels.get(&field).copied().unwrap_or_default()
    }

    pub fn tier_of(&self, viewer: &IdentityId) -> ConnectionTier {
        self.connection_tiers.get(viewer).copied().unwrap_or_default()
    }

    pub fn set_field_level(&mut self, field: ProfileField, level: DisclosureLevel) {
        self.field_levels.insert(field, level);
    }

    /// Setting `Unconnected` removes the entry.
    pub fn set_connection_tier(&mut self, connection: IdentityId, tier: ConnectionTier) {
        if tier == ConnectionTier::Unconnected {
            self.connection_tiers.remove(&connection);
        } else {
            self.connection_tiers.insert(connection, tier);
        }
    }
}
