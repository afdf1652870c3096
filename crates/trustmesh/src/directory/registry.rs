//! Key registry boundary.
//!
//! The registry itself is an external service. [`KeyRegistry`] is the
//! contract this crate consumes; [`MemoryKeyRegistry`] is an in-process
//! implementation used for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::crypto::{KeyFormat, KeyRecord, PublicKey};
use crate::identity::IdentityId;
use crate::{Error, Result};

/// Contract of the remote public-key registry.
///
/// Implementations must retain every key ever registered: rotation closes the
/// current record and appends a new one, it never deletes.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Register an identity's first key. The document is validated before
    /// anything is stored.
    async fn register(&self, identity: &IdentityId, document: &str, format: KeyFormat) -> Result<KeyRecord>;

    /// The identity's current record, `None` if nothing was ever registered.
    async fn get_current(&self, identity: &IdentityId) -> Result<Option<KeyRecord>>;

    /// All records for the identity, oldest first.
    async fn get_history(&self, identity: &IdentityId) -> Result<Vec<KeyRecord>>;

    /// Replace the current key, keeping the old one as history.
    async fn rotate(&self, identity: &IdentityId, document: &str, format: KeyFormat) -> Result<KeyRecord>;
}

/// Parse a registration document, auditing rejections.
pub(crate) fn validate_document(identity: &IdentityId, document: &str, format: KeyFormat) -> Result<PublicKey> {
    PublicKey::parse(document, format).inspect_err(|e| {
        warn!(
            target: "trustmesh::audit",
            event = "key_registration_rejected",
            identity = %identity,
            ?format,
            "Rejected key registration: {}",
            e
        );
    })
}

/// In-memory registry.
#[derive(Default)]
pub struct MemoryKeyRegistry {
    records: RwLock<HashMap<IdentityId, Vec<KeyRecord>>>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the registry being unreachable.
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Delay every call, to exercise caller timeouts. Saturates at
    /// `u64::MAX` milliseconds.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    async fn reachable(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::DirectoryUnavailable("registry offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyRegistry for MemoryKeyRegistry {
    async fn register(&self, identity: &IdentityId, document: &str, format: KeyFormat) -> Result<KeyRecord> {
        self.reachable().await?;
        let public_key = validate_document(identity, document, format)?;

        let mut records = self.records.write().await;
        let history = records.entry(identity.clone()).or_default();
        if let Some(current) = history.iter().find(|r| r.is_current()) {
            if current.public_key == public_key {
                return Ok(current.clone());
            }
            return Err(Error::CurrentKeyExists(identity.clone()));
        }

        let record = KeyRecord::new(identity.clone(), public_key, chrono::Utc::now().timestamp());
        history.push(record.clone());
        Ok(record)
    }

    async fn get_current(&self, identity: &IdentityId) -> Result<Option<KeyRecord>> {
        self.reachable().await?;
        let records = self.records.read().await;
        Ok(records
            .get(identity)
            .and_then(|history| history.iter().find(|r| r.is_current()).cloned()))
    }

    async fn get_history(&self, identity: &IdentityId) -> Result<Vec<KeyRecord>> {
        self.reachable().await?;
        let records = self.records.read().await;
        Ok(records.get(identity).cloned().unwrap_or_default())
    }

    async fn rotate(&self, identity: &IdentityId, document: &str, format: KeyFormat) -> Result<KeyRecord> {
        self.reachable().await?;
        let public_key = validate_document(identity, document, format)?;

        let mut records = self.records.write().await;
        let history = records
            .get_mut(identity)
            .ok_or_else(|| Error::NoCurrentKey(identity.clone()))?;
        if history.iter().any(|r| r.public_key == public_key) {
            if let Some(current) = history.iter().find(|r| r.is_current() && r.public_key == public_key) {
                return Ok(current.clone());
            }
            return Err(Error::InvalidKeyFormat("key was already used by this identity".into()));
        }
        let current = history
            .iter_mut()
            .find(|r| r.is_current())
            .ok_or_else(|| Error::NoCurrentKey(identity.clone()))?;

        let now = chrono::Utc::now().timestamp().max(current.valid_from);
        current.valid_until = Some(now);
        let record = KeyRecord::new(identity.clone(), public_key, now);
        history.push(record.clone());
        Ok(record)
    }
}
