//! Registration accepts well-formed PEM and JWK documents only.

use trustmesh::crypto::generate_keypair;
use trustmesh::{Error, KeyFormat, KeyRegistry, MemoryKeyRegistry, PublicKey};

const MALFORMED: &[(&str, KeyFormat)] = &[
    ("", KeyFormat::Pem),
    ("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n", KeyFormat::Pem),
    // RSA-style header
    ("-----BEGIN RSA PUBLIC KEY-----\nMAo=\n-----END RSA PUBLIC KEY-----\n", KeyFormat::Pem),
    ("{}", KeyFormat::Jwk),
    (r#"{"kty":"RSA","crv":"Ed25519","x":"AAAA"}"#, KeyFormat::Jwk),
    (r#"{"kty":"OKP","crv":"Ed25519","x":"not*base64"}"#, KeyFormat::Jwk),
    (r#"{"kty":"OKP","crv":"Ed25519","x":"AAAA"}"#, KeyFormat::Jwk),
];

#[tokio::test]
async fn test_malformed_documents_store_nothing() {
    let registry = MemoryKeyRegistry::new();
    let alice = "alice".into();

    for (document, format) in MALFORMED {
        let result = registry.register(&alice, document, *format).await;
        assert!(
            matches!(result, Err(Error::InvalidKeyFormat(_))),
            "{format:?} document {document:?} was accepted"
        );
    }
    assert!(registry.get_current(&alice).await.unwrap().is_none());
    assert!(registry.get_history(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_document_in_wrong_format_rejected() {
    let registry = MemoryKeyRegistry::new();
    let key = *generate_keypair().unwrap().public_key();

    let pem = key.encode(KeyFormat::Pem).unwrap();
    let result = registry.register(&"alice".into(), &pem, KeyFormat::Jwk).await;
    assert!(matches!(result, Err(Error::InvalidKeyFormat(_))));
}

#[tokio::test]
async fn test_both_formats_resolve_to_same_key() {
    let registry = MemoryKeyRegistry::new();
    let key = *generate_keypair().unwrap().public_key();

    let pem = key.encode(KeyFormat::Pem).unwrap();
    let jwk = key.encode(KeyFormat::Jwk).unwrap();
    assert_eq!(PublicKey::parse(&pem, KeyFormat::Pem).unwrap(), key);
    assert_eq!(PublicKey::parse(&jwk, KeyFormat::Jwk).unwrap(), key);

    let by_pem = registry.register(&"alice".into(), &pem, KeyFormat::Pem).await.unwrap();
    let by_jwk = registry.register(&"bob".into(), &jwk, KeyFormat::Jwk).await.unwrap();
    assert_eq!(by_pem.fingerprint, by_jwk.fingerprint);
}

#[tokio::test]
async fn test_rotation_after_rejected_document_keeps_current() {
    let registry = MemoryKeyRegistry::new();
    let alice = "alice".into();
    let key = *generate_keypair().unwrap().public_key();
    registry.register(&alice, &key.to_pem().unwrap(), KeyFormat::Pem).await.unwrap();

    let result = registry.rotate(&alice, "garbage", KeyFormat::Pem).await;
    assert!(matches!(result, Err(Error::InvalidKeyFormat(_))));
    let history = registry.get_history(&alice).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_current());
}
