//! Client-side key directory.
//!
//! A cache in front of the remote [`KeyRegistry`]. Per identity it keeps an
//! append-only log of every record ever seen (keyed by fingerprint, never
//! evicted) plus a single "current" pointer. Push updates only clear the
//! pointer; history stays, so verification of old envelopes keeps working
//! after the sender rotates.
//!
//! Every registry round trip is bounded by the configured timeout and
//! surfaces as [`Error::DirectoryUnavailable`] when it elapses.

pub mod http;
pub mod registry;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::DirectoryConfig;
use crate::crypto::{Fingerprint, KeyFormat, KeyRecord, PublicKey};
use crate::identity::IdentityId;
use crate::{Error, Result};

pub use http::HttpKeyRegistry;
pub use registry::{KeyRegistry, MemoryKeyRegistry};

#[derive(Default)]
struct KeyLog {
    records: BTreeMap<Fingerprint, KeyRecord>,
    current: Option<Fingerprint>,
}

impl KeyLog {
    /// Merge records from the registry. Existing entries only ever gain a
    /// `valid_until`; nothing is removed.
    fn absorb(&mut self, record: KeyRecord) {
        let fingerprint = record.fingerprint.clone();
        let is_current = record.is_current();
        match self.records.get_mut(&fingerprint) {
            Some(existing) => {
                if existing.valid_until.is_none() && record.valid_until.is_some() {
                    existing.valid_until = record.valid_until;
                    if self.current.as_ref() == Some(&fingerprint) {
                        self.current = None;
                    }
                }
            }
            None => {
                self.records.insert(fingerprint.clone(), record);
            }
        }
        let Some(since) = self.records.get(&fingerprint).filter(|r| r.is_current()).map(|r| r.valid_from) else {
            return;
        };
        if is_current {
            // At most one open record: a newer current key closes the rest.
            for (fp, other) in self.records.iter_mut() {
                if fp != &fingerprint && other.valid_until.is_none() && other.valid_from <= since {
                    other.valid_until = Some(since);
                }
            }
            self.current = Some(fingerprint);
        }
    }

    fn current_record(&self) -> Option<&KeyRecord> {
        self.current.as_ref().and_then(|fp| self.records.get(fp))
    }

    fn latest_record(&self) -> Option<&KeyRecord> {
        self.records.values().max_by_key(|r| r.valid_from)
    }
}

/// Cached view of the key registry. Share it behind an `Arc`.
pub struct KeyDirectory {
    registry: Arc<dyn KeyRegistry>,
    cache: RwLock<HashMap<IdentityId, KeyLog>>,
    timeout: Duration,
}

impl KeyDirectory {
    pub fn new(registry: Arc<dyn KeyRegistry>, config: &DirectoryConfig) -> Self {
        Self { registry, cache: RwLock::new(HashMap::new()), timeout: config.timeout() }
    }

    async fn bounded<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::DirectoryUnavailable(format!(
                "{operation} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Reject records the registry could not legitimately have produced: the
    /// wrong identity, a fingerprint that does not match the key, or an
    /// inverted interval.
    fn checked(identity: &IdentityId, record: KeyRecord) -> Result<KeyRecord> {
        let problem = if &record.identity != identity {
            Some("record belongs to another identity")
        } else if record.fingerprint != record.public_key.fingerprint() {
            Some("fingerprint does not match public key")
        } else if record.valid_until.is_some_and(|until| until < record.valid_from) {
            Some("validity interval is inverted")
        } else {
            None
        };
        match problem {
            None => Ok(record),
            Some(problem) => {
                warn!(
                    target: "trustmesh::audit",
                    event = "registry_record_rejected",
                    identity = %identity,
                    fingerprint = %record.fingerprint,
                    problem,
                    "Discarding inconsistent record from the key registry"
                );
                Err(Error::InvalidKeyFormat(format!("registry returned a bad record for {identity}: {problem}")))
            }
        }
    }

    async fn absorb(&self, identity: &IdentityId, records: impl IntoIterator<Item = KeyRecord>) {
        let mut cache = self.cache.write().await;
        let log = cache.entry(identity.clone()).or_default();
        for record in records {
            log.absorb(record);
        }
    }

    /// Publish `public_key` as the identity's current key.
    ///
    /// Registers on first use and rotates afterwards, so the previous key is
    /// kept by the registry as history.
    pub async fn publish(&self, identity: &IdentityId, public_key: &PublicKey, format: KeyFormat) -> Result<KeyRecord> {
        let document = public_key.encode(format)?;
        let existing = self
            .bounded("get_current", self.registry.get_current(identity))
            .await?
            .map(|record| Self::checked(identity, record))
            .transpose()?;

        let record = match existing {
            Some(current) if &current.public_key == public_key => current,
            Some(previous) => {
                let record = self
                    .bounded("rotate", self.registry.rotate(identity, &document, format))
                    .await
                    .and_then(|record| Self::checked(identity, record))?;
                // The registry closed the previous record; mirror that locally.
                let closed = KeyRecord { valid_until: Some(record.valid_from), ..previous };
                self.absorb(identity, [closed]).await;
                record
            }
            None => {
                self.bounded("register", self.registry.register(identity, &document, format))
                    .await
                    .and_then(|record| Self::checked(identity, record))?
            }
        };

        info!(identity = %identity, fingerprint = %record.fingerprint, "Published public key");
        self.absorb(identity, [record.clone()]).await;
        Ok(record)
    }

    /// Resolve the identity's current key.
    ///
    /// Served from cache while the current pointer is set. Otherwise the
    /// registry is asked; if it cannot be reached, the newest cached record is
    /// returned, and only with nothing cached does the call fail.
    pub async fn resolve(&self, identity: &IdentityId) -> Result<KeyRecord> {
        if let Some(record) = self.cache.read().await.get(identity).and_then(KeyLog::current_record) {
            debug!(identity = %identity, "Key directory cache hit");
            return Ok(record.clone());
        }

        debug!(identity = %identity, "Key directory cache miss");
        match self.bounded("get_current", self.registry.get_current(identity)).await {
            Ok(Some(record)) => {
                let record = Self::checked(identity, record)?;
                self.absorb(identity, [record.clone()]).await;
                Ok(record)
            }
            Ok(None) => Err(Error::RecipientKeyMissing(identity.clone())),
            Err(Error::DirectoryUnavailable(reason)) => {
                let cache = self.cache.read().await;
                match cache.get(identity).and_then(KeyLog::latest_record) {
                    Some(record) => {
                        warn!(identity = %identity, %reason, "Registry unavailable, serving cached key");
                        Ok(record.clone())
                    }
                    None => Err(Error::DirectoryUnavailable(reason)),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a specific (possibly historical) key of `identity`.
    pub async fn resolve_fingerprint(&self, identity: &IdentityId, fingerprint: &Fingerprint) -> Result<KeyRecord> {
        if let Some(record) = self.cache.read().await.get(identity).and_then(|log| log.records.get(fingerprint)) {
            return Ok(record.clone());
        }

        let history = self
            .bounded("get_history", self.registry.get_history(identity))
            .await?;
        let history: Vec<_> = history.into_iter().filter_map(|r| Self::checked(identity, r).ok()).collect();
        let found = history.iter().find(|r| &r.fingerprint == fingerprint).cloned();
        self.absorb(identity, history).await;
        found.ok_or_else(|| Error::KeyNotFound(fingerprint.to_string()))
    }

    /// Push-update hook: the identity rotated, forget which key is current.
    pub async fn invalidate_current(&self, identity: &IdentityId) {
        if let Some(log) = self.cache.write().await.get_mut(identity) {
            log.current = None;
        }
    }

    /// Everything cached for `identity`, oldest first.
    pub async fn cached_records(&self, identity: &IdentityId) -> Vec<KeyRecord> {
        let cache = self.cache.read().await;
        let mut records: Vec<_> = cache
            .get(identity)
            .map(|log| log.records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.valid_from);
        records
    }
}
