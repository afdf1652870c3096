//! Profile records and their filtered views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::levels::DisclosureLevel;
use crate::identity::IdentityId;
use crate::{Error, Result};

/// The closed set of profile fields that can carry a disclosure level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ProfileField {
    DisplayName,
    Headline,
    Email,
    Location,
    Skills,
    Availability,
    Interests,
    Resources,
    TrackRecord,
}

impl ProfileField {
    pub const ALL: [ProfileField; 9] = [
        Self::DisplayName,
        Self::Headline,
        Self::Email,
        Self::Location,
        Self::Skills,
        Self::Availability,
        Self::Interests,
        Self::Resources,
        Self::TrackRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisplayName => "display_name",
            Self::Headline => "headline",
            Self::Email => "email",
            Self::Location => "location",
            Self::Skills => "skills",
            Self::Availability => "availability",
            Self::Interests => "interests",
            Self::Resources => "resources",
            Self::TrackRecord => "track_record",
        }
    }

    fn expected_kind(self) -> &'static str {
        match self {
            Self::DisplayName | Self::Headline | Self::Email | Self::Location => "text",
            Self::Skills | Self::Interests | Self::Resources => "a list of tags",
            Self::Availability => "an availability window",
            Self::TrackRecord => "a track record",
        }
    }

    fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Self::DisplayName | Self::Headline | Self::Email | Self::Location, FieldValue::Text(_))
                | (Self::Skills | Self::Interests | Self::Resources, FieldValue::Tags(_))
                | (Self::Availability, FieldValue::Window(_))
                | (Self::TrackRecord, FieldValue::TrackRecord(_))
        )
    }
}

impl FromStr for ProfileField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

impl TryFrom<String> for ProfileField {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open availability interval in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start: i64,
    pub end: i64,
}

impl AvailabilityWindow {
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidFieldValue {
                field: ProfileField::Availability.to_string(),
                expected: "a window whose end is not before its start",
            });
        }
        Ok(Self { start, end })
    }

    /// Widened so the full `i64` range cannot overflow.
    pub fn len(&self) -> i128 {
        i128::from(self.end) - i128::from(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    /// Length of the intersection with `other`.
    pub fn overlap(&self, other: &AvailabilityWindow) -> i128 {
        (i128::from(self.end.min(other.end)) - i128::from(self.start.max(other.start))).max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub completed: u32,
    pub successful: u32,
}

/// Value stored under a [`ProfileField`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Tags(Vec<String>),
    Window(AvailabilityWindow),
    TrackRecord(TrackRecord),
}

/// Full profile as held by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedProfile")]
pub struct Profile {
    owner: IdentityId,
    fields: BTreeMap<ProfileField, FieldValue>,
}

#[derive(Deserialize)]
struct UncheckedProfile {
    owner: IdentityId,
    #[serde(default)]
    fields: BTreeMap<ProfileField, FieldValue>,
}

impl TryFrom<UncheckedProfile> for Profile {
    type Error = Error;

    fn try_from(raw: UncheckedProfile) -> Result<Self> {
        let mut profile = Profile::new(raw.owner);
        for (field, value) in raw.fields {
            profile.set(field, value)?;
        }
        Ok(profile)
    }
}

impl Profile {
    pub fn new(owner: IdentityId) -> Self {
        Self { owner, fields: BTreeMap::new() }
    }

    pub fn owner(&self) -> &IdentityId {
        &self.owner
    }

    /// Set a field, checking the value has the field's shape.
    pub fn set(&mut self, field: ProfileField, value: FieldValue) -> Result<()> {
        if !field.accepts(&value) {
            return Err(Error::InvalidFieldValue { field: field.to_string(), expected: field.expected_kind() });
        }
        if let FieldValue::Window(window) = &value {
            AvailabilityWindow::new(window.start, window.end)?;
        }
        if let FieldValue::TrackRecord(record) = &value {
            if record.successful > record.completed {
                return Err(Error::InvalidFieldValue {
                    field: field.to_string(),
                    expected: "successful <= completed",
                });
            }
        }
        self.fields.insert(field, value);
        Ok(())
    }

    pub fn with(mut self, field: ProfileField, value: FieldValue) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn remove(&mut self, field: ProfileField) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: ProfileField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub(super) fn fields(&self) -> impl Iterator<Item = (ProfileField, &FieldValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }
}

/// The subset of a profile a particular viewer is entitled to.
///
/// Only the privacy filter can build one, so holding a `PartialProfile` is
/// proof the data was filtered. It serializes for output but never
/// deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialProfile {
    owner: IdentityId,
    visible_up_to: DisclosureLevel,
    fields: BTreeMap<ProfileField, FieldValue>,
}

impl PartialProfile {
    pub(super) fn new(owner: IdentityId, visible_up_to: DisclosureLevel) -> Self {
        Self { owner, visible_up_to, fields: BTreeMap::new() }
    }

    pub(super) fn insert(&mut self, field: ProfileField, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn owner(&self) -> &IdentityId {
        &self.owner
    }

    /// The disclosure level this view was filtered at.
    pub fn visible_up_to(&self) -> DisclosureLevel {
        self.visible_up_to
    }

    pub fn get(&self, field: ProfileField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.fields.keys().copied()
    }

    fn tags(&self, field: ProfileField) -> &[String] {
        match self.fields.get(&field) {
            Some(FieldValue::Tags(tags)) => tags,
            _ => &[],
        }
    }

    pub fn skills(&self) -> &[String] {
        self.tags(ProfileField::Skills)
    }

    pub fn interests(&self) -> &[String] {
        self.tags(ProfileField::Interests)
    }

    pub fn resources(&self) -> &[String] {
        self.tags(ProfileField::Resources)
    }

    pub fn availability(&self) -> Option<AvailabilityWindow> {
        match self.fields.get(&ProfileField::Availability) {
            Some(FieldValue::Window(window)) => Some(*window),
            _ => None,
        }
    }

    pub fn track_record(&self) -> Option<TrackRecord> {
        match self.fields.get(&ProfileField::TrackRecord) {
            Some(FieldValue::TrackRecord(record)) => Some(*record),
            _ => None,
        }
    }
}
