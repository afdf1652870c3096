//! Error taxonomy for trustmesh.
//!
//! Cryptographic integrity failures (`DecryptionError`, `KeyNotFound`) always
//! surface as typed errors. A failed signature check is the one failure that
//! is recovered locally: it never appears here, it sets `verified = false`
//! on the opened message instead.

use std::io::Error as IoError;

use thiserror::Error;

use crate::identity::IdentityId;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("a current key already exists for {0}; rotate instead of regenerating")]
    CurrentKeyExists(IdentityId),

    #[error("no current key for {0}")]
    NoCurrentKey(IdentityId),

    #[error("no key with fingerprint {0}")]
    KeyNotFound(String),

    #[error("recipient {0} has no published key; refusing to send unencrypted")]
    RecipientKeyMissing(IdentityId),

    #[error("keyring could not be unlocked (wrong passphrase or corrupted file)")]
    KeyringLocked,

    #[error("key directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("invalid public key: {0}")]
    InvalidKeyFormat(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(String),

    #[error("invalid disclosure level: {0}")]
    InvalidDisclosureLevel(String),

    #[error("invalid connection tier: {0}")]
    InvalidConnectionTier(String),

    #[error("unknown profile field: {0}")]
    UnknownField(String),

    #[error("value for field {field} must be {expected}")]
    InvalidFieldValue { field: String, expected: &'static str },

    #[error("{actor} is not the owner of {resource}")]
    NotOwner { actor: IdentityId, resource: String },

    #[error("no profile for {0}")]
    ProfileNotFound(IdentityId),

    #[error("opportunity {0} not found")]
    OpportunityNotFound(String),

    #[error("opportunity {0} is closed")]
    OpportunityClosed(String),

    #[error("matching weights must sum to 1.0, got {0}")]
    InvalidWeights(f64),

    #[error("match service unavailable: {0}")]
    MatchServiceUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0:#}")]
    Io(#[from] IoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Transient failures the caller may retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DirectoryUnavailable(_) | Error::MatchServiceUnavailable(_))
    }
}
