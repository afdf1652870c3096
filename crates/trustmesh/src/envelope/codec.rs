//! Sealing and opening of message envelopes.

use std::sync::Arc;

use tracing::{debug, warn};

use super::types::{signed_payload, MessageEnvelope, OpenedMessage, SignatureStatus, ENVELOPE_VERSION};
use crate::crypto::encryption::{decrypt_content, encrypt_content, unwrap_content_key, wrap_content_key, ContentKey};
use crate::crypto::{sign_bytes, verify_signature, KeyPair, KeyRecord, KeyStore, PublicKey};
use crate::directory::KeyDirectory;
use crate::identity::IdentityId;
use crate::{Error, Result};

/// Progress through our own keys, most recent first, while unwrapping the
/// content key.
enum UnwrapState {
    Trying(usize),
    Decrypted(ContentKey),
    Exhausted,
}

/// Builds and opens envelopes. Holds no per-message state; one codec can be
/// shared across tasks.
#[derive(Clone)]
pub struct EnvelopeCodec {
    directory: Arc<KeyDirectory>,
}

impl EnvelopeCodec {
    pub fn new(directory: Arc<KeyDirectory>) -> Self {
        Self { directory }
    }

    /// Encrypt `plaintext` for `recipient` and sign it with the sender's
    /// current key.
    ///
    /// Fails with [`Error::RecipientKeyMissing`] when the recipient has no
    /// published key. There is no plaintext fallback.
    pub async fn seal(&self, plaintext: &[u8], recipient: &IdentityId, sender: &KeyStore) -> Result<MessageEnvelope> {
        let sender_pair = sender.current()?;
        let recipient_key = self.directory.resolve(recipient).await?;

        let envelope = seal_for(plaintext, &recipient_key.public_key, &sender_pair, chrono::Utc::now().timestamp())?;
        debug!(
            sender = %sender.identity(),
            recipient = %recipient,
            recipient_key = %recipient_key.fingerprint,
            bytes = plaintext.len(),
            "Sealed envelope"
        );
        Ok(envelope)
    }

    /// Verify and decrypt an envelope addressed to the owner of `own`.
    ///
    /// A bad or unattributable signature does not stop decryption; it is
    /// reported through [`OpenedMessage::verified`] and an audit event.
    pub async fn open(&self, envelope: &MessageEnvelope, own: &KeyStore, sender: &IdentityId) -> Result<OpenedMessage> {
        envelope.check_version()?;

        let signature = match self.signer_record(envelope, own, sender).await? {
            Some(record) if !record.was_valid_at(envelope.timestamp) => SignatureStatus::Invalid,
            Some(record) if verify_signature(&envelope.signed_payload(), &envelope.signature, &record.public_key) => {
                SignatureStatus::Valid
            }
            Some(_) => SignatureStatus::Invalid,
            None => SignatureStatus::UnknownSigner,
        };
        if signature != SignatureStatus::Valid {
            warn!(
                target: "trustmesh::audit",
                event = "signature_invalid",
                sender = %sender,
                fingerprint = %envelope.sender_key_fingerprint,
                timestamp = envelope.timestamp,
                status = ?signature,
                "Envelope signature did not verify; decrypting anyway"
            );
        }

        let content_key = unwrap_with_history(&envelope.encrypted_key, &own.decryption_candidates())?;
        let plaintext = decrypt_content(&envelope.encrypted_content, &envelope.iv, &content_key)?;

        Ok(OpenedMessage {
            plaintext,
            verified: signature == SignatureStatus::Valid,
            signature,
            signer_fingerprint: envelope.sender_key_fingerprint.clone(),
            timestamp: envelope.timestamp,
        })
    }

    /// The record of the key that claims to have signed `envelope`.
    ///
    /// `None` when it cannot be attributed, including when the directory is
    /// unreachable: decryption only needs our own keys.
    async fn signer_record(&self, envelope: &MessageEnvelope, own: &KeyStore, sender: &IdentityId) -> Result<Option<KeyRecord>> {
        let fingerprint = &envelope.sender_key_fingerprint;
        if sender == own.identity() {
            if let Ok(record) = own.record_for(fingerprint) {
                return Ok(Some(record));
            }
        }
        match self.directory.resolve_fingerprint(sender, fingerprint).await {
            Ok(record) => Ok(Some(record)),
            Err(Error::KeyNotFound(_)) => Ok(None),
            Err(Error::DirectoryUnavailable(reason)) => {
                warn!(
                    target: "trustmesh::audit",
                    event = "signer_unresolved",
                    sender = %sender,
                    fingerprint = %fingerprint,
                    %reason,
                    "Cannot reach the key directory to verify the sender"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Seal without touching the directory.
pub fn seal_for(plaintext: &[u8], recipient: &PublicKey, sender: &KeyPair, timestamp: i64) -> Result<MessageEnvelope> {
    let content_key = ContentKey::generate()?;
    let (encrypted_content, iv) = encrypt_content(plaintext, &content_key)?;
    let encrypted_key = wrap_content_key(&content_key, &recipient.x25519_bytes())?;

    let signature = sign_bytes(&signed_payload(&encrypted_content, &encrypted_key, &iv, timestamp), sender);

    Ok(MessageEnvelope {
        encrypted_content,
        encrypted_key,
        iv: iv.to_vec(),
        signature,
        sender_key_fingerprint: sender.fingerprint(),
        timestamp,
        version: ENVELOPE_VERSION.to_string(),
    })
}

fn unwrap_with_history(wrapped: &[u8], candidates: &[Arc<KeyPair>]) -> Result<ContentKey> {
    let mut state = UnwrapState::Trying(0);
    loop {
        state = match state {
            UnwrapState::Trying(i) => match candidates.get(i) {
                Some(pair) => {
                    match unwrap_content_key(wrapped, pair.x25519_secret(), &pair.public_key().x25519_bytes()) {
                        Ok(key) => {
                            if i > 0 {
                                debug!(fingerprint = %pair.fingerprint(), "Unwrapped with a historical key");
                            }
                            UnwrapState::Decrypted(key)
                        }
                        Err(_) => UnwrapState::Trying(i + 1),
                    }
                }
                None => UnwrapState::Exhausted,
            },
            UnwrapState::Decrypted(key) => return Ok(key),
            UnwrapState::Exhausted => {
                return Err(Error::Decryption(format!(
                    "content key was not wrapped for any of our {} keys",
                    candidates.len()
                )))
            }
        };
    }
}
