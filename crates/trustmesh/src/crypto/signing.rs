//! Ed25519 signing operations.
//!
//! Byte-level signing only. Envelope-specific payload construction lives in
//! the envelope module.

use ed25519_dalek::Signer;

use super::keys::KeyPair;

/// Sign raw bytes with a keypair. Returns a 64-byte Ed25519 signature.
pub fn sign_bytes(data: &[u8], keypair: &KeyPair) -> Vec<u8> {
    let signature = keypair.signing_key().sign(data);
    signature.to_bytes().to_vec()
}
