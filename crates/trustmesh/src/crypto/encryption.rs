//! Hybrid encryption primitives for message envelopes.
//!
//! Content is encrypted under a fresh random key with XChaCha20-Poly1305.
//! That content key is wrapped for the recipient with ephemeral-static X25519,
//! HKDF-SHA256 and a second XChaCha20-Poly1305 pass. Nothing is reused across
//! messages: every call draws a new content key, IV, ephemeral key and nonce.
//!
//! Wrapped key layout: `ephemeral_pub (32) ‖ nonce (24) ‖ ciphertext+tag (48)`.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::{Error, Result};

/// XChaCha20 nonce length, used as the envelope IV.
pub const IV_LEN: usize = 24;

/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

/// Length of a wrapped content key.
pub const WRAPPED_KEY_LEN: usize = 32 + IV_LEN + 32 + TAG_LEN;

const KEY_WRAP_INFO: &[u8] = b"trustmesh/envelope/v1/content-key-wrap";

/// Per-message symmetric key. Zeroed on drop.
pub struct ContentKey(Zeroizing<[u8; 32]>);

impl ContentKey {
    pub fn generate() -> Result<Self> {
        Ok(Self(random_bytes::<32>()?))
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(self.0.as_slice()))
    }
}

fn random_bytes<const N: usize>() -> Result<Zeroizing<[u8; N]>> {
    let mut bytes = Zeroizing::new([0u8; N]);
    OsRng
        .try_fill_bytes(bytes.as_mut_slice())
        .map_err(|e| Error::KeyGeneration(format!("entropy source failed: {e}")))?;
    Ok(bytes)
}

/// Encrypt content under `key` with a fresh IV. Returns `(ciphertext, iv)`.
pub fn encrypt_content(plaintext: &[u8], key: &ContentKey) -> Result<(Vec<u8>, [u8; IV_LEN])> {
    let iv = *random_bytes::<IV_LEN>()?;
    let ciphertext = key
        .cipher()
        .encrypt(&XNonce::from(iv), plaintext)
        .map_err(|e| Error::Decryption(format!("content encryption failed: {e}")))?;
    Ok((ciphertext, iv))
}

/// Decrypt and authenticate content.
pub fn decrypt_content(ciphertext: &[u8], iv: &[u8], key: &ContentKey) -> Result<Vec<u8>> {
    let iv: [u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| Error::Decryption(format!("IV must be {IV_LEN} bytes")))?;
    key.cipher()
        .decrypt(&XNonce::from(iv), ciphertext)
        .map_err(|_| Error::Decryption("content authentication failed (tampered or wrong key)".into()))
}

fn key_wrapping_cipher(
    shared_secret: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<XChaCha20Poly1305> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient_public);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared_secret);
    let mut kek = Zeroizing::new([0u8; 32]);
    hkdf.expand(KEY_WRAP_INFO, kek.as_mut_slice())
        .map_err(|e| Error::Decryption(format!("key derivation failed: {e}")))?;
    Ok(XChaCha20Poly1305::new(Key::from_slice(kek.as_slice())))
}

/// Wrap `key` for the holder of the X25519 secret behind `recipient_public`.
pub fn wrap_content_key(key: &ContentKey, recipient_public: &[u8; 32]) -> Result<Vec<u8>> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let shared = ephemeral_secret.diffie_hellman(&PublicKey::from(*recipient_public));
    if !shared.was_contributory() {
        return Err(Error::InvalidKeyFormat("recipient key is a low-order point".into()));
    }

    let cipher = key_wrapping_cipher(shared.as_bytes(), ephemeral_public.as_bytes(), recipient_public)?;
    let nonce = *random_bytes::<IV_LEN>()?;
    let wrapped = cipher
        .encrypt(&XNonce::from(nonce), key.0.as_slice())
        .map_err(|e| Error::Decryption(format!("key wrapping failed: {e}")))?;

    let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&wrapped);
    Ok(out)
}

/// Unwrap a content key with one of our own X25519 secrets.
///
/// Fails with [`Error::Decryption`] when the key was wrapped for someone else
/// or the wrapped bytes were altered.
pub fn unwrap_content_key(
    wrapped: &[u8],
    own_secret: &StaticSecret,
    own_public: &[u8; 32],
) -> Result<ContentKey> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(Error::Decryption(format!(
            "wrapped key must be {WRAPPED_KEY_LEN} bytes, got {}",
            wrapped.len()
        )));
    }
    let (ephemeral, rest) = wrapped.split_at(32);
    let (nonce, ciphertext) = rest.split_at(IV_LEN);

    let mut ephemeral_public = [0u8; 32];
    ephemeral_public.copy_from_slice(ephemeral);
    let mut nonce_bytes = [0u8; IV_LEN];
    nonce_bytes.copy_from_slice(nonce);

    let shared = own_secret.diffie_hellman(&PublicKey::from(ephemeral_public));
    let cipher = key_wrapping_cipher(shared.as_bytes(), &ephemeral_public, own_public)?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(&XNonce::from(nonce_bytes), ciphertext)
            .map_err(|_| Error::Decryption("content key not wrapped for this key".into()))?,
    );

    let mut key = Zeroizing::new([0u8; 32]);
    if plaintext.len() != key.len() {
        return Err(Error::Decryption("unwrapped key has wrong length".into()));
    }
    key.copy_from_slice(&plaintext);
    Ok(ContentKey(key))
}
