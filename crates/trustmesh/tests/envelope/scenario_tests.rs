//! Alice and Bob end to end, with keyrings on disk.

use std::sync::Arc;

use trustmesh::config::KeyStoreConfig;
use trustmesh::{Error, KeyStore, MemoryKeyRegistry};

use crate::common::{init_tracing, persisted_user};

#[tokio::test]
async fn test_alice_and_bob() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = persisted_user("alice", dir.path(), &registry).await;
    let bob = persisted_user("bob", dir.path(), &registry).await;

    // 1. Plain exchange.
    let first = alice.codec().seal(b"hello bob", bob.keys.identity(), &alice.keys).await.unwrap();
    let opened = bob.codec().open(&first, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"hello bob");
    assert!(opened.verified);

    // 2. Both rotate; history stays usable.
    alice.rotate().await;
    bob.rotate().await;
    alice.directory.invalidate_current(bob.keys.identity()).await;
    let second = alice.codec().seal(b"after rotation", bob.keys.identity(), &alice.keys).await.unwrap();

    // 3. Bob restarts from disk and can still read both messages.
    let bob_keys = KeyStore::open(
        "bob".into(),
        dir.path().join("bob.keyring.json"),
        b"bob-passphrase",
        &KeyStoreConfig::insecure_for_tests(),
    )
    .unwrap();
    assert_eq!(bob_keys.records().len(), 2);
    for (envelope, expected) in [(&first, &b"hello bob"[..]), (&second, &b"after rotation"[..])] {
        let opened = bob.codec().open(envelope, &bob_keys, alice.keys.identity()).await.unwrap();
        assert!(opened.verified);
        assert_eq!(opened.plaintext, expected);
    }

    // 4. One flipped ciphertext byte is fatal, and also breaks the signature.
    let mut tampered = second.clone();
    tampered.encrypted_content[0] ^= 0x01;
    let result = bob.codec().open(&tampered, &bob_keys, alice.keys.identity()).await;
    assert!(matches!(result, Err(Error::Decryption(_))));

    let mut tampered = second.clone();
    let last = tampered.encrypted_key.len() - 1;
    tampered.encrypted_key[last] ^= 0x80;
    let result = bob.codec().open(&tampered, &bob_keys, alice.keys.identity()).await;
    assert!(matches!(result, Err(Error::Decryption(_))));

    let mut tampered = second;
    tampered.iv[0] ^= 0x01;
    let result = bob.codec().open(&tampered, &bob_keys, alice.keys.identity()).await;
    assert!(matches!(result, Err(Error::Decryption(_))));
}

#[tokio::test]
async fn test_wrong_passphrase_cannot_open_mail() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(MemoryKeyRegistry::new());
    let _bob = persisted_user("bob", dir.path(), &registry).await;

    let result = KeyStore::open(
        "bob".into(),
        dir.path().join("bob.keyring.json"),
        b"guess",
        &KeyStoreConfig::insecure_for_tests(),
    );
    assert!(matches!(result, Err(Error::KeyringLocked)));
}
