//! Ed25519 signature verification.

use ed25519_dalek::{Signature, Verifier};

use super::keys::PublicKey;

/// Verify an Ed25519 signature over raw bytes.
///
/// A signature of the wrong length is simply invalid; the key itself was
/// validated when the [`PublicKey`] was built.
pub fn verify_signature(data: &[u8], signature_bytes: &[u8], public_key: &PublicKey) -> bool {
    let Ok(sig_arr) = <[u8; 64]>::try_from(signature_bytes) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_arr);

    public_key.verifying_key().verify_strict(data, &signature).is_ok()
}
