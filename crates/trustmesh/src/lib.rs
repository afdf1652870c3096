//! trustmesh - secure identity and tiered disclosure
//!
//! This library provides:
//! - per-identity Ed25519/X25519 key lifecycle with an encrypted keyring
//! - a caching client for the public-key registry
//! - signed, hybrid-encrypted message envelopes
//! - a privacy filter for tiered profile disclosure
//! - weighted opportunity matching over filtered profiles

pub mod config;
pub mod crypto;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod matching;
pub mod privacy;

// Re-export main types
pub use config::Config;
pub use crypto::{KeyFormat, KeyPair, KeyRecord, KeyStore, PublicKey};
pub use directory::{HttpKeyRegistry, KeyDirectory, KeyRegistry, MemoryKeyRegistry};
pub use envelope::{EnvelopeCodec, MessageEnvelope, OpenedMessage, SignatureStatus};
pub use error::{Error, Result};
pub use identity::IdentityId;
pub use matching::{MatchResult, MatchService, MatchingEngine, Opportunity};
pub use privacy::{ConnectionTier, DisclosureLevel, PartialProfile, PrivacyService, PrivacySettings, Profile};
