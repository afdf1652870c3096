//! Per-identity keyring: generation, rotation and encrypted-at-rest storage.
//!
//! The keyring is an append-only list of key pairs, oldest first. Exactly one
//! entry is current (`valid_until == None`). Rotation closes it and appends a
//! new one; old private keys are kept so envelopes addressed to them can still
//! be opened.
//!
//! On disk every seed is sealed with XChaCha20-Poly1305 under a key derived
//! from the owner's passphrase with Argon2id. The fingerprint of each entry is
//! bound as associated data so sealed seeds cannot be swapped between records.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::keys::{generate_keypair, Fingerprint, KeyPair, PublicKey};
use crate::config::KeyStoreConfig;
use crate::identity::IdentityId;
use crate::{Error, Result};

const KEYRING_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

/// One entry of an identity's key history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub identity: IdentityId,
    pub public_key: PublicKey,
    pub fingerprint: Fingerprint,
    pub valid_from: i64,
    /// `None` marks the current key
    pub valid_until: Option<i64>,
}

impl KeyRecord {
    pub fn new(identity: IdentityId, public_key: PublicKey, valid_from: i64) -> Self {
        Self {
            identity,
            fingerprint: public_key.fingerprint(),
            public_key,
            valid_from,
            valid_until: None,
        }
    }

    pub fn is_current(&self) -> bool {
        self.valid_until.is_none()
    }

    /// Whether the key was the active one at `timestamp`.
    ///
    /// Both ends are inclusive: timestamps are whole seconds, so the second
    /// of a rotation belongs to the outgoing and the incoming key.
    pub fn was_valid_at(&self, timestamp: i64) -> bool {
        timestamp >= self.valid_from && self.valid_until.map_or(true, |until| timestamp <= until)
    }
}

struct Entry {
    record: KeyRecord,
    pair: Arc<KeyPair>,
}

struct Persistence {
    path: PathBuf,
    salt: [u8; SALT_LEN],
    params: KeyStoreConfig,
    kek: Zeroizing<[u8; 32]>,
}

#[derive(Serialize, Deserialize)]
struct KeyringFile {
    version: u32,
    identity: IdentityId,
    kdf: KdfParams,
    keys: Vec<SealedKey>,
}

#[derive(Serialize, Deserialize)]
struct KdfParams {
    salt: String,
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

#[derive(Serialize, Deserialize)]
struct SealedKey {
    record: KeyRecord,
    created_at: i64,
    nonce: String,
    sealed_seed: String,
}

/// Key store for one identity.
///
/// Mutations take the write lock for their whole duration, so two rotations
/// for the same identity can never interleave.
pub struct KeyStore {
    identity: IdentityId,
    entries: RwLock<Vec<Entry>>,
    persistence: Option<Persistence>,
}

impl KeyStore {
    /// A store that lives only in memory.
    pub fn in_memory(identity: IdentityId) -> Self {
        Self { identity, entries: RwLock::new(Vec::new()), persistence: None }
    }

    /// Open (or create) the keyring file at `path`, unlocking it with `passphrase`.
    pub fn open(
        identity: IdentityId,
        path: impl AsRef<Path>,
        passphrase: &[u8],
        config: &KeyStoreConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!(identity = %identity, "Creating new keyring at {}", path.display());
            let mut salt = [0u8; SALT_LEN];
            OsRng
                .try_fill_bytes(&mut salt)
                .map_err(|e| Error::KeyGeneration(format!("entropy source failed: {e}")))?;
            let kek = derive_kek(passphrase, &salt, config)?;
            return Ok(Self {
                identity,
                entries: RwLock::new(Vec::new()),
                persistence: Some(Persistence { path, salt, params: config.clone(), kek }),
            });
        }

        info!(identity = %identity, "Loading keyring from {}", path.display());
        let raw = fs::read_to_string(&path)?;
        let file: KeyringFile = serde_json::from_str(&raw)?;
        if file.version != KEYRING_VERSION {
            return Err(Error::Config(format!("unsupported keyring version {}", file.version)));
        }
        if file.identity != identity {
            return Err(Error::Config(format!(
                "keyring at {} belongs to {}, not {}",
                path.display(),
                file.identity,
                identity
            )));
        }

        let salt: [u8; SALT_LEN] = hex::decode(&file.kdf.salt)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(Error::KeyringLocked)?;
        let params = KeyStoreConfig {
            argon2_memory_kib: file.kdf.memory_kib,
            argon2_iterations: file.kdf.iterations,
            argon2_parallelism: file.kdf.parallelism,
        };
        let kek = derive_kek(passphrase, &salt, &params)?;

        let mut entries = Vec::with_capacity(file.keys.len());
        for sealed in file.keys {
            let seed = open_seed(&sealed, &kek)?;
            let pair = KeyPair::from_seed(&seed, sealed.created_at)?;
            if pair.public_key() != &sealed.record.public_key {
                warn!(
                    target: "trustmesh::audit",
                    event = "keyring_mismatch",
                    fingerprint = %sealed.record.fingerprint,
                    "Sealed seed does not match its recorded public key"
                );
                return Err(Error::KeyringLocked);
            }
            entries.push(Entry { record: sealed.record, pair: Arc::new(pair) });
        }

        Ok(Self {
            identity,
            entries: RwLock::new(entries),
            persistence: Some(Persistence { path, salt, params, kek }),
        })
    }

    pub fn identity(&self) -> &IdentityId {
        &self.identity
    }

    /// Generate the identity's first key pair.
    ///
    /// Fails with [`Error::CurrentKeyExists`] if a current key is already
    /// present: keys are rotated, never silently regenerated.
    pub fn generate(&self) -> Result<Arc<KeyPair>> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.record.is_current()) {
            return Err(Error::CurrentKeyExists(self.identity.clone()));
        }

        let pair = Arc::new(generate_keypair()?);
        let record = KeyRecord::new(self.identity.clone(), *pair.public_key(), pair.created_at());
        entries.push(Entry { record, pair: Arc::clone(&pair) });

        if let Err(e) = self.persist(&entries) {
            entries.pop();
            return Err(e);
        }

        info!(identity = %self.identity, fingerprint = %pair.fingerprint(), "Generated key pair");
        Ok(pair)
    }

    /// Return the current key pair, generating one on first use.
    pub fn load_or_generate(&self) -> Result<Arc<KeyPair>> {
        match self.current() {
            Ok(pair) => Ok(pair),
            Err(Error::NoCurrentKey(_)) => self.generate(),
            Err(e) => Err(e),
        }
    }

    /// Close the current key and activate a freshly generated one.
    pub fn rotate(&self) -> Result<Arc<KeyPair>> {
        let mut entries = self.entries.write();
        let current_idx = entries
            .iter()
            .position(|e| e.record.is_current())
            .ok_or_else(|| Error::NoCurrentKey(self.identity.clone()))?;

        let pair = Arc::new(generate_keypair()?);
        // Never let a backwards clock produce an inverted interval.
        let boundary = pair.created_at().max(entries[current_idx].record.valid_from);

        entries[current_idx].record.valid_until = Some(boundary);
        let record = KeyRecord::new(self.identity.clone(), *pair.public_key(), boundary);
        entries.push(Entry { record, pair: Arc::clone(&pair) });

        if let Err(e) = self.persist(&entries) {
            entries.pop();
            entries[current_idx].record.valid_until = None;
            return Err(e);
        }

        info!(
            identity = %self.identity,
            previous = %entries[current_idx].record.fingerprint,
            current = %pair.fingerprint(),
            "Rotated key pair"
        );
        Ok(pair)
    }

    pub fn current(&self) -> Result<Arc<KeyPair>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.record.is_current())
            .map(|e| Arc::clone(&e.pair))
            .ok_or_else(|| Error::NoCurrentKey(self.identity.clone()))
    }

    pub fn current_public_key(&self) -> Result<PublicKey> {
        Ok(*self.current()?.public_key())
    }

    /// Look up one of our own key records, current or historical.
    pub fn record_for(&self, fingerprint: &Fingerprint) -> Result<KeyRecord> {
        self.entries
            .read()
            .iter()
            .find(|e| &e.record.fingerprint == fingerprint)
            .map(|e| e.record.clone())
            .ok_or_else(|| Error::KeyNotFound(fingerprint.to_string()))
    }

    /// Full key history, oldest first.
    pub fn records(&self) -> Vec<KeyRecord> {
        self.entries.read().iter().map(|e| e.record.clone()).collect()
    }

    /// Every private key we hold, most recent first.
    pub(crate) fn decryption_candidates(&self) -> Vec<Arc<KeyPair>> {
        self.entries.read().iter().rev().map(|e| Arc::clone(&e.pair)).collect()
    }

    fn persist(&self, entries: &[Entry]) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let keys = entries
            .iter()
            .map(|e| seal_seed(e, &persistence.kek))
            .collect::<Result<Vec<_>>>()?;
        let file = KeyringFile {
            version: KEYRING_VERSION,
            identity: self.identity.clone(),
            kdf: KdfParams {
                salt: hex::encode(persistence.salt),
                memory_kib: persistence.params.argon2_memory_kib,
                iterations: persistence.params.argon2_iterations,
                parallelism: persistence.params.argon2_parallelism,
            },
            keys,
        };

        if let Some(parent) = persistence.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = persistence.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&file)?)?;
        fs::rename(&tmp, &persistence.path)?;
        Ok(())
    }
}

fn derive_kek(passphrase: &[u8], salt: &[u8], config: &KeyStoreConfig) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
        config.argon2_parallelism,
        Some(32),
    )
    .map_err(|e| Error::Config(format!("invalid Argon2 parameters: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut kek = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, kek.as_mut_slice())
        .map_err(|e| Error::Config(format!("key derivation failed: {e}")))?;
    Ok(kek)
}

fn seal_seed(entry: &Entry, kek: &[u8; 32]) -> Result<SealedKey> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| Error::KeyGeneration(format!("entropy source failed: {e}")))?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(kek));
    let seed = entry.pair.seed();
    let sealed = cipher
        .encrypt(
            &XNonce::from(nonce),
            Payload { msg: seed.as_slice(), aad: entry.record.fingerprint.as_str().as_bytes() },
        )
        .map_err(|e| Error::KeyGeneration(format!("sealing key failed: {e}")))?;

    Ok(SealedKey {
        record: entry.record.clone(),
        created_at: entry.pair.created_at(),
        nonce: hex::encode(nonce),
        sealed_seed: hex::encode(sealed),
    })
}

fn open_seed(sealed: &SealedKey, kek: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
    let nonce: [u8; NONCE_LEN] = hex::decode(&sealed.nonce)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(Error::KeyringLocked)?;
    let ciphertext = hex::decode(&sealed.sealed_seed).map_err(|_| Error::KeyringLocked)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(kek));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                &XNonce::from(nonce),
                Payload { msg: &ciphertext, aad: sealed.record.fingerprint.as_str().as_bytes() },
            )
            .map_err(|_| Error::KeyringLocked)?,
    );

    let mut seed = Zeroizing::new([0u8; 32]);
    if plaintext.len() != seed.len() {
        return Err(Error::KeyringLocked);
    }
    seed.copy_from_slice(&plaintext);
    Ok(seed)
}
