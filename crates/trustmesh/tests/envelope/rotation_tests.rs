//! Envelopes sealed before a rotation stay readable and verifiable after it.

use std::sync::Arc;

use trustmesh::envelope::seal_for;
use trustmesh::{MemoryKeyRegistry, SignatureStatus};

use crate::common::user;

#[tokio::test]
async fn test_sender_rotation_verifies_against_history() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    let before = alice.codec().seal(b"old key", bob.keys.identity(), &alice.keys).await.unwrap();
    alice.rotate().await;
    let after = alice.codec().seal(b"new key", bob.keys.identity(), &alice.keys).await.unwrap();
    assert_ne!(before.sender_key_fingerprint, after.sender_key_fingerprint);

    for (envelope, expected) in [(&before, &b"old key"[..]), (&after, &b"new key"[..])] {
        let opened = bob.codec().open(envelope, &bob.keys, alice.keys.identity()).await.unwrap();
        assert!(opened.verified);
        assert_eq!(opened.plaintext, expected);
    }
}

#[tokio::test]
async fn test_recipient_rotation_keeps_old_mail_readable() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    let before = alice.codec().seal(b"to old bob", bob.keys.identity(), &alice.keys).await.unwrap();
    bob.rotate().await;

    // Push update: alice's cached pointer for bob is stale.
    alice.directory.invalidate_current(bob.keys.identity()).await;
    let after = alice.codec().seal(b"to new bob", bob.keys.identity(), &alice.keys).await.unwrap();

    let opened = bob.codec().open(&before, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"to old bob");
    let opened = bob.codec().open(&after, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"to new bob");
}

#[tokio::test]
async fn test_stale_pointer_without_push_still_readable() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    // Warm alice's cache, then bob rotates without alice hearing about it.
    alice.codec().seal(b"warm", bob.keys.identity(), &alice.keys).await.unwrap();
    bob.rotate().await;

    // Sealed to bob's previous key; he still holds it.
    let envelope = alice.codec().seal(b"late", bob.keys.identity(), &alice.keys).await.unwrap();
    let opened = bob.codec().open(&envelope, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"late");
}

#[tokio::test]
async fn test_retired_key_cannot_sign_after_rotation() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    let old_pair = alice.keys.current().unwrap();
    alice.rotate().await;
    let retired_at = alice.keys.records()[0].valid_until.unwrap();

    // Signed with the old key but dated an hour after it was retired.
    let bob_key = bob.keys.current_public_key().unwrap();
    let late = seal_for(b"backdated key", &bob_key, &old_pair, retired_at + 3600).unwrap();

    let opened = bob.codec().open(&late, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"backdated key");
    assert!(!opened.verified);
    assert_eq!(opened.signature, SignatureStatus::Invalid);
}
