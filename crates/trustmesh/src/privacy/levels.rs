//! Disclosure levels and connection tiers.
//!
//! Both enums are closed and totally ordered. A viewer's tier is never
//! compared with a field's level directly: [`effective_level`] maps the tier
//! first, and the comparison happens between two `DisclosureLevel`s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How far a profile field is disclosed. Higher is more restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "LevelOrName")]
pub enum DisclosureLevel {
    #[default]
    Public = 0,
    Network = 1,
    Connections = 2,
    Close = 3,
}

impl DisclosureLevel {
    pub const ALL: [DisclosureLevel; 4] = [Self::Public, Self::Network, Self::Connections, Self::Close];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Network => "network",
            Self::Connections => "connections",
            Self::Close => "close",
        }
    }
}

impl TryFrom<i64> for DisclosureLevel {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Public),
            1 => Ok(Self::Network),
            2 => Ok(Self::Connections),
            3 => Ok(Self::Close),
            other => Err(Error::InvalidDisclosureLevel(other.to_string())),
        }
    }
}

impl FromStr for DisclosureLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(n) = s.parse::<i64>() {
            return Self::try_from(n);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidDisclosureLevel(s.to_string()))
    }
}

impl fmt::Display for DisclosureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship of a viewer to a profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "LevelOrName")]
pub enum ConnectionTier {
    #[default]
    Unconnected,
    Network,
    Connection,
    CloseCollaborator,
}

impl ConnectionTier {
    pub const ALL: [ConnectionTier; 4] = [Self::Unconnected, Self::Network, Self::Connection, Self::CloseCollaborator];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconnected => "unconnected",
            Self::Network => "network",
            Self::Connection => "connection",
            Self::CloseCollaborator => "close_collaborator",
        }
    }
}

impl TryFrom<i64> for ConnectionTier {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| Error::InvalidConnectionTier(value.to_string()))
    }
}

impl FromStr for ConnectionTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(n) = s.parse::<i64>() {
            return Self::try_from(n);
        }
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidConnectionTier(s.to_string()))
    }
}

impl fmt::Display for ConnectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest disclosure level a viewer in `tier` may see.
pub const fn effective_level(tier: ConnectionTier) -> DisclosureLevel {
    match tier {
        ConnectionTier::Unconnected => DisclosureLevel::Public,
        ConnectionTier::Network => DisclosureLevel::Network,
        ConnectionTier::Connection => DisclosureLevel::Connections,
        ConnectionTier::CloseCollaborator => DisclosureLevel::Close,
    }
}

/// Accepts both `2` and `"connections"` on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelOrName {
    Number(i64),
    Name(String),
}

impl TryFrom<LevelOrName> for DisclosureLevel {
    type Error = Error;

    fn try_from(raw: LevelOrName) -> Result<Self> {
        match raw {
            LevelOrName::Number(n) => Self::try_from(n),
            LevelOrName::Name(s) => s.parse(),
        }
    }
}

impl TryFrom<LevelOrName> for ConnectionTier {
    type Error = Error;

    fn try_from(raw: LevelOrName) -> Result<Self> {
        match raw {
            LevelOrName::Number(n) => Self::try_from(n),
            LevelOrName::Name(s) => s.parse(),
        }
    }
}
