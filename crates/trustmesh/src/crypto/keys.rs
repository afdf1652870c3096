//! Ed25519 identity keys with X25519 derivation, fingerprints and PEM/JWK
//! encodings.
//!
//! A single 32-byte Ed25519 public key serves both signature verification and
//! key agreement: the X25519 secret is the Ed25519 expanded scalar and the
//! X25519 public key is the Montgomery form of the Edwards point.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, Zeroizing};

use crate::{Error, Result};

/// Bytes of SHA-256 kept in a fingerprint.
const FINGERPRINT_LEN: usize = 16;

/// Short stable identifier of a public key: hex of the first 16 bytes of
/// SHA-256 over the raw key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(public_key: &[u8; 32]) -> Self {
        let digest = Sha256::digest(public_key);
        Self(hex::encode(&digest[..FINGERPRINT_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Registration formats accepted by the key registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyFormat {
    Pem,
    Jwk,
}

impl FromStr for KeyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pem" => Ok(KeyFormat::Pem),
            "jwk" => Ok(KeyFormat::Jwk),
            other => Err(Error::InvalidKeyFormat(format!("unknown key format '{other}'"))),
        }
    }
}

/// JSON Web Key for an Ed25519 public key (RFC 8037).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// Validated Ed25519 public key with its cached X25519 form.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
    x25519: [u8; 32],
}

impl PublicKey {
    /// Validate raw key bytes (must decompress to a curve point).
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| Error::InvalidKeyFormat(format!("not an Ed25519 point: {e}")))?;
        Self::from_verifying_key(verifying_key)
    }

    fn from_verifying_key(verifying_key: VerifyingKey) -> Result<Self> {
        let edwards = CompressedEdwardsY(verifying_key.to_bytes())
            .decompress()
            .ok_or_else(|| Error::InvalidKeyFormat("not an Ed25519 point".into()))?;
        Ok(Self { verifying_key, x25519: edwards.to_montgomery().to_bytes() })
    }

    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded)
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeyFormat("expected 32 key bytes".into()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.to_bytes())
    }

    /// X25519 public key used to wrap content keys for this identity.
    pub fn x25519_bytes(&self) -> [u8; 32] {
        self.x25519
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// SubjectPublicKeyInfo PEM (`-----BEGIN PUBLIC KEY-----`).
    pub fn to_pem(&self) -> Result<String> {
        self.verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::InvalidKeyFormat(format!("PEM encoding failed: {e}")))
    }

    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: URL_SAFE_NO_PAD.encode(self.to_bytes()),
            kid: Some(self.fingerprint().to_string()),
        }
    }

    /// Encode as a registration document.
    pub fn encode(&self, format: KeyFormat) -> Result<String> {
        match format {
            KeyFormat::Pem => self.to_pem(),
            KeyFormat::Jwk => Ok(serde_json::to_string(&self.to_jwk())?),
        }
    }

    /// Parse and validate a registration document.
    pub fn parse(document: &str, format: KeyFormat) -> Result<Self> {
        match format {
            KeyFormat::Pem => {
                let verifying_key = VerifyingKey::from_public_key_pem(document.trim())
                    .map_err(|e| Error::InvalidKeyFormat(format!("invalid PEM: {e}")))?;
                Self::from_verifying_key(verifying_key)
            }
            KeyFormat::Jwk => {
                let jwk: Jwk = serde_json::from_str(document)
                    .map_err(|e| Error::InvalidKeyFormat(format!("invalid JWK: {e}")))?;
                Self::from_jwk(&jwk)
            }
        }
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "OKP" || jwk.crv != "Ed25519" {
            return Err(Error::InvalidKeyFormat(format!(
                "unsupported JWK type {}/{}",
                jwk.kty, jwk.crv
            )));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(jwk.x.trim_end_matches('='))
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid JWK x: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeyFormat("JWK x must be 32 bytes".into()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        PublicKey::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// An identity's key pair. Secret halves are only reachable inside the crate.
pub struct KeyPair {
    signing_key: SigningKey,
    x25519_secret: StaticSecret,
    public_key: PublicKey,
    created_at: i64,
}

impl KeyPair {
    /// Rebuild a pair from its 32-byte Ed25519 seed.
    pub(crate) fn from_seed(seed: &[u8; 32], created_at: i64) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(seed);
        let public_key = PublicKey::from_verifying_key(signing_key.verifying_key())
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;

        let mut expanded = Sha512::digest(seed);
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&expanded[..32]);
        expanded.as_mut_slice().zeroize();
        let x25519_secret = StaticSecret::from(*scalar);

        Ok(Self { signing_key, x25519_secret, public_key, created_at })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.public_key.fingerprint()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub(crate) fn x25519_secret(&self) -> &StaticSecret {
        &self.x25519_secret
    }

    pub(crate) fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Generate a new random key pair from the OS entropy source.
pub fn generate_keypair() -> Result<KeyPair> {
    let mut seed = Zeroizing::new([0u8; 32]);
    OsRng
        .try_fill_bytes(seed.as_mut_slice())
        .map_err(|e| Error::KeyGeneration(format!("entropy source failed: {e}")))?;
    KeyPair::from_seed(&seed, chrono::Utc::now().timestamp())
}
