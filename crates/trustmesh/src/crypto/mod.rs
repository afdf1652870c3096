//! Cryptographic building blocks.
//!
//! - Ed25519 identity keys with X25519 derivation, fingerprints, PEM/JWK
//! - The encrypted-at-rest keyring with rotation history
//! - Byte-level signing and verification
//! - Content encryption and content-key wrapping for envelopes

pub mod encryption;
pub mod keys;
pub mod keystore;
pub mod signing;
pub mod verification;

pub use keys::{generate_keypair, Fingerprint, Jwk, KeyFormat, KeyPair, PublicKey};
pub use keystore::{KeyRecord, KeyStore};
pub use signing::sign_bytes;
pub use verification::verify_signature;
