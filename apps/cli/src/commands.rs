//! Subcommand implementations. Each works on a [`Session`], so tests can
//! swap the HTTP registry for an in-memory one.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::DateTime;
use trustmesh::crypto::{KeyFormat, KeyRecord, KeyStore};
use trustmesh::directory::{KeyDirectory, KeyRegistry};
use trustmesh::envelope::{EnvelopeCodec, MessageEnvelope, OpenedMessage};
use trustmesh::IdentityId;

use crate::config::Settings;

/// An unlocked keyring plus a directory client for one identity.
pub struct Session {
    pub store: KeyStore,
    pub directory: Arc<KeyDirectory>,
}

impl Session {
    pub fn open(settings: &Settings, passphrase: &[u8], registry: Arc<dyn KeyRegistry>) -> Result<Self> {
        let identity = settings.identity()?;
        let store = KeyStore::open(identity, &settings.cli.keyring, passphrase, &settings.core.keystore)
            .with_context(|| format!("opening keyring {}", settings.cli.keyring.display()))?;
        let directory = Arc::new(KeyDirectory::new(registry, &settings.core.directory));
        Ok(Self { store, directory })
    }

    fn identity(&self) -> &IdentityId {
        self.store.identity()
    }

    fn codec(&self) -> EnvelopeCodec {
        EnvelopeCodec::new(Arc::clone(&self.directory))
    }

    pub fn keygen(&self) -> Result<String> {
        let pair = self.store.generate()?;
        Ok(format!("Generated key {} for {}", pair.fingerprint(), self.identity()))
    }

    pub async fn rotate(&self, publish: bool, format: KeyFormat) -> Result<String> {
        let pair = self.store.rotate()?;
        let mut out = format!("Rotated to key {}", pair.fingerprint());
        if publish {
            self.publish(format).await?;
            out.push_str(" (published)");
        }
        Ok(out)
    }

    pub fn export(&self, format: KeyFormat) -> Result<String> {
        Ok(self.store.current_public_key()?.encode(format)?)
    }

    pub fn history(&self) -> String {
        let mut out = String::new();
        for record in self.store.records() {
            let _ = writeln!(out, "{}", describe(&record));
        }
        out
    }

    pub async fn publish(&self, format: KeyFormat) -> Result<KeyRecord> {
        let public_key = self.store.current_public_key()?;
        let record = self
            .directory
            .publish(self.identity(), &public_key, format)
            .await
            .context("publishing public key")?;
        Ok(record)
    }

    pub async fn seal(&self, recipient: &IdentityId, plaintext: &[u8]) -> Result<String> {
        let envelope = self
            .codec()
            .seal(plaintext, recipient, &self.store)
            .await
            .with_context(|| format!("sealing message for {recipient}"))?;
        Ok(envelope.to_json()?)
    }

    pub async fn open_envelope(&self, sender: &IdentityId, raw: &str) -> Result<OpenedMessage> {
        let envelope = MessageEnvelope::from_json(raw)?;
        let opened = self
            .codec()
            .open(&envelope, &self.store, sender)
            .await
            .with_context(|| format!("opening message from {sender}"))?;
        Ok(opened)
    }
}

fn timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0).map_or_else(|| secs.to_string(), |t| t.to_rfc3339())
}

fn describe(record: &KeyRecord) -> String {
    let until = record.valid_until.map_or_else(|| "current".to_string(), timestamp);
    format!("{}  {} .. {}", record.fingerprint, timestamp(record.valid_from), until)
}

/// Read from `path`, or stdin when none is given.
pub fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Write to `path`, or stdout when none is given.
pub fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, data).with_context(|| format!("writing {}", path.display())),
        None => io::stdout().write_all(data).context("writing stdout"),
    }
}
