//! Directory behaviour when the registry is slow or down.

use std::sync::Arc;
use std::time::Duration;

use trustmesh::config::DirectoryConfig;
use trustmesh::crypto::generate_keypair;
use trustmesh::{Error, KeyDirectory, KeyFormat, MemoryKeyRegistry};

fn directory(registry: &Arc<MemoryKeyRegistry>, timeout_ms: u64) -> KeyDirectory {
    KeyDirectory::new(Arc::clone(registry) as Arc<dyn trustmesh::KeyRegistry>, &DirectoryConfig { timeout_ms })
}

#[tokio::test]
async fn test_cold_cache_outage_is_unavailable() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let key = *generate_keypair().unwrap().public_key();
    directory(&registry, 500).publish(&"bob".into(), &key, KeyFormat::Pem).await.unwrap();

    let cold = directory(&registry, 500);
    registry.set_online(false);
    let err = cold.resolve(&"bob".into()).await.unwrap_err();
    assert!(matches!(err, Error::DirectoryUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_warm_cache_survives_outage() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let key = *generate_keypair().unwrap().public_key();
    directory(&registry, 500).publish(&"bob".into(), &key, KeyFormat::Pem).await.unwrap();

    let warm = directory(&registry, 500);
    warm.resolve(&"bob".into()).await.unwrap();
    registry.set_online(false);
    warm.invalidate_current(&"bob".into()).await;
    assert_eq!(warm.resolve(&"bob".into()).await.unwrap().public_key, key);
}

#[tokio::test]
async fn test_slow_registry_bounded_by_timeout() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    registry.set_latency(Duration::from_secs(5));
    let dir = directory(&registry, 50);

    let started = std::time::Instant::now();
    let result = dir.resolve(&"bob".into()).await;
    assert!(matches!(result, Err(Error::DirectoryUnavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_push_update_picks_up_rotation() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let publisher = directory(&registry, 500);
    let reader = directory(&registry, 500);
    let bob = "bob".into();
    let k1 = *generate_keypair().unwrap().public_key();
    let k2 = *generate_keypair().unwrap().public_key();

    publisher.publish(&bob, &k1, KeyFormat::Pem).await.unwrap();
    assert_eq!(reader.resolve(&bob).await.unwrap().public_key, k1);

    publisher.publish(&bob, &k2, KeyFormat::Jwk).await.unwrap();
    // Cached pointer still answers until the push arrives.
    assert_eq!(reader.resolve(&bob).await.unwrap().public_key, k1);
    reader.invalidate_current(&bob).await;
    assert_eq!(reader.resolve(&bob).await.unwrap().public_key, k2);

    // Both keys remain in the reader's log.
    assert_eq!(reader.resolve_fingerprint(&bob, &k1.fingerprint()).await.unwrap().public_key, k1);
    assert_eq!(reader.cached_records(&bob).await.len(), 2);
}
