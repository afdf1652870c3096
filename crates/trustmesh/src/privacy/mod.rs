//! Tiered profile disclosure.
//!
//! Owners assign each [`ProfileField`] a [`DisclosureLevel`] and each
//! connection a [`ConnectionTier`]. The filter turns a [`Profile`] into the
//! [`PartialProfile`] a given viewer is entitled to; nothing downstream ever
//! sees an unfiltered profile.

pub mod filter;
pub mod levels;
pub mod profile;
pub mod service;
pub mod settings;

pub use filter::{filter, filter_for_viewer};
pub use levels::{effective_level, ConnectionTier, DisclosureLevel};
pub use profile::{AvailabilityWindow, FieldValue, PartialProfile, Profile, ProfileField, TrackRecord};
pub use service::PrivacyService;
pub use settings::PrivacySettings;
