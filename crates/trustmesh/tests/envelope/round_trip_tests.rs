//! Sealing and opening between two users.

use std::sync::Arc;

use trustmesh::envelope::seal_for;
use trustmesh::{Error, MemoryKeyRegistry, MessageEnvelope, SignatureStatus};

use crate::common::{init_tracing, user};

#[tokio::test]
async fn test_round_trip_verified() {
    init_tracing();
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    for plaintext in [&b""[..], &b"hi"[..], &[0xAB; 64 * 1024][..]] {
        let envelope = alice.codec().seal(plaintext, bob.keys.identity(), &alice.keys).await.unwrap();
        let opened = bob.codec().open(&envelope, &bob.keys, alice.keys.identity()).await.unwrap();
        assert_eq!(opened.plaintext, plaintext);
        assert!(opened.verified);
    }
}

#[tokio::test]
async fn test_round_trip_over_the_wire() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    let envelope = alice.codec().seal(b"json me", bob.keys.identity(), &alice.keys).await.unwrap();
    let wire = envelope.to_json().unwrap();
    let parsed = MessageEnvelope::from_json(&wire).unwrap();
    assert_eq!(parsed, envelope);

    let opened = bob.codec().open(&parsed, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"json me");
}

#[tokio::test]
async fn test_each_seal_is_fresh() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    let a = alice.codec().seal(b"same", bob.keys.identity(), &alice.keys).await.unwrap();
    let b = alice.codec().seal(b"same", bob.keys.identity(), &alice.keys).await.unwrap();
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.encrypted_key, b.encrypted_key);
    assert_ne!(a.encrypted_content, b.encrypted_content);
}

#[tokio::test]
async fn test_wrong_sender_key_is_unverified_but_readable() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;
    let eve = user("eve", &registry).await;

    // Eve signs with her own key but the message claims to be from alice.
    let bob_key = bob.keys.current_public_key().unwrap();
    let now = chrono::Utc::now().timestamp();
    let mut envelope = seal_for(b"from alice, honest", &bob_key, &eve.keys.current().unwrap(), now).unwrap();
    envelope.sender_key_fingerprint = alice.keys.current().unwrap().fingerprint();

    let opened = bob.codec().open(&envelope, &bob.keys, alice.keys.identity()).await.unwrap();
    assert!(!opened.verified);
    assert_eq!(opened.signature, SignatureStatus::Invalid);
    assert_eq!(opened.plaintext, b"from alice, honest");

    // Attributed to eve it verifies fine.
    envelope.sender_key_fingerprint = eve.keys.current().unwrap().fingerprint();
    let opened = bob.codec().open(&envelope, &bob.keys, eve.keys.identity()).await.unwrap();
    assert!(opened.verified);
}

#[tokio::test]
async fn test_no_plaintext_fallback() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;

    let result = alice.codec().seal(b"secret", &"nobody".into(), &alice.keys).await;
    assert!(matches!(result, Err(Error::RecipientKeyMissing(_))));
}

#[tokio::test]
async fn test_directory_outage_leaves_message_readable() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    let alice = user("alice", &registry).await;
    let bob = user("bob", &registry).await;

    let envelope = alice.codec().seal(b"still here", bob.keys.identity(), &alice.keys).await.unwrap();

    // Bob has never looked alice up, so verifying needs the registry.
    registry.set_online(false);
    let opened = bob.codec().open(&envelope, &bob.keys, alice.keys.identity()).await.unwrap();
    assert_eq!(opened.plaintext, b"still here");
    assert!(!opened.verified);
    assert_eq!(opened.signature, SignatureStatus::UnknownSigner);

    // Once the registry is back the same envelope verifies.
    registry.set_online(true);
    let opened = bob.codec().open(&envelope, &bob.keys, alice.keys.identity()).await.unwrap();
    assert!(opened.verified);
}
