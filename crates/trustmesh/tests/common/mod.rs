use std::path::Path;
use std::sync::Arc;

use trustmesh::config::{DirectoryConfig, KeyStoreConfig};
use trustmesh::{KeyDirectory, KeyFormat, KeyStore, MemoryKeyRegistry};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One participant: their own key store and their own view of the registry.
pub struct User {
    pub keys: KeyStore,
    pub directory: Arc<KeyDirectory>,
}

impl User {
    pub fn codec(&self) -> trustmesh::EnvelopeCodec {
        trustmesh::EnvelopeCodec::new(Arc::clone(&self.directory))
    }

    /// Rotate locally and publish the new key.
    pub async fn rotate(&self) {
        let pair = self.keys.rotate().unwrap();
        self.directory
            .publish(self.keys.identity(), pair.public_key(), KeyFormat::Jwk)
            .await
            .unwrap();
    }
}

fn directory(registry: &Arc<MemoryKeyRegistry>) -> Arc<KeyDirectory> {
    Arc::new(KeyDirectory::new(
        Arc::clone(registry) as Arc<dyn trustmesh::KeyRegistry>,
        &DirectoryConfig { timeout_ms: 1000 },
    ))
}

async fn enroll(keys: KeyStore, registry: &Arc<MemoryKeyRegistry>) -> User {
    let pair = keys.load_or_generate().unwrap();
    let directory = directory(registry);
    directory.publish(keys.identity(), pair.public_key(), KeyFormat::Pem).await.unwrap();
    User { keys, directory }
}

pub async fn user(name: &str, registry: &Arc<MemoryKeyRegistry>) -> User {
    enroll(KeyStore::in_memory(name.into()), registry).await
}

pub async fn persisted_user(name: &str, dir: &Path, registry: &Arc<MemoryKeyRegistry>) -> User {
    let keys = KeyStore::open(
        name.into(),
        dir.join(format!("{name}.keyring.json")),
        format!("{name}-passphrase").as_bytes(),
        &KeyStoreConfig::insecure_for_tests(),
    )
    .unwrap();
    enroll(keys, registry).await
}
