//! Envelope wire types.

use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::{Error, Result};

/// Version written into every new envelope.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Major version this crate can open.
const SUPPORTED_MAJOR: &str = "1";

/// A signed, hybrid-encrypted message.
///
/// Serialized as camelCase JSON with base64 byte fields. Unknown fields are
/// ignored on input; every field below is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    #[serde(with = "base64_bytes")]
    pub encrypted_content: Vec<u8>,

    #[serde(with = "base64_bytes")]
    pub encrypted_key: Vec<u8>,

    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,

    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,

    /// Fingerprint of the sender key that produced `signature`
    #[serde(rename = "senderKeyHash")]
    pub sender_key_fingerprint: Fingerprint,

    /// Unix seconds
    pub timestamp: i64,

    pub version: String,
}

impl MessageEnvelope {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    /// The exact bytes covered by the sender's signature:
    /// `encrypted_content ‖ encrypted_key ‖ iv ‖ timestamp (big-endian i64)`.
    pub fn signed_payload(&self) -> Vec<u8> {
        signed_payload(&self.encrypted_content, &self.encrypted_key, &self.iv, self.timestamp)
    }

    pub(crate) fn check_version(&self) -> Result<()> {
        match self.version.split('.').next() {
            Some(SUPPORTED_MAJOR) => Ok(()),
            _ => Err(Error::UnsupportedVersion(self.version.clone())),
        }
    }
}

pub(crate) fn signed_payload(content: &[u8], wrapped_key: &[u8], iv: &[u8], timestamp: i64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(content.len() + wrapped_key.len() + iv.len() + 8);
    payload.extend_from_slice(content);
    payload.extend_from_slice(wrapped_key);
    payload.extend_from_slice(iv);
    payload.extend_from_slice(&timestamp.to_be_bytes());
    payload
}

/// Outcome of checking the sender's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Valid,
    /// The signing key was found but the signature does not match
    Invalid,
    /// No key with the envelope's fingerprint is known for the sender
    UnknownSigner,
}

/// Result of opening an envelope.
#[derive(Debug, Clone)]
pub struct OpenedMessage {
    pub plaintext: Vec<u8>,
    pub verified: bool,
    pub signature: SignatureStatus,
    pub signer_fingerprint: Fingerprint,
    pub timestamp: i64,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
