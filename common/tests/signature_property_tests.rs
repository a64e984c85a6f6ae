// Property-based tests for request signing

use chrono::{TimeZone, Utc};
use common::errors::AuthError;
use common::signature::RequestAuthenticator;
use proptest::prelude::*;

const NOW: i64 = 1_700_000_000;

fn now() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(NOW, 0).unwrap()
}

// ============================================================================
// Authenticator
// ============================================================================

// Any body signed with the shared secret inside the freshness window verifies.
#[test]
fn property_signed_requests_within_window_verify() {
    proptest!(|(
        secret in "[a-zA-Z0-9]{8,40}",
        body in prop::collection::vec(any::<u8>(), 0..512),
        skew in -300i64..=300,
    )| {
        let authenticator = RequestAuthenticator::new(secret.as_str());
        let timestamp = (NOW + skew).to_string();
        let signature = authenticator.sign(&timestamp, &body).unwrap();

        prop_assert!(authenticator
            .verify_at(&body, Some(&timestamp), Some(&signature), now())
            .is_ok());
    });
}

// Changing a single byte of the body invalidates the signature.
#[test]
fn property_mutated_body_fails() {
    proptest!(|(
        body in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    )| {
        let authenticator = RequestAuthenticator::new("shared-secret");
        let timestamp = NOW.to_string();
        let signature = authenticator.sign(&timestamp, &body).unwrap();

        let mut tampered = body.clone();
        let i = index.index(tampered.len());
        tampered[i] ^= flip;

        prop_assert_eq!(
            authenticator.verify_at(&tampered, Some(&timestamp), Some(&signature), now()),
            Err(AuthError::InvalidSignature)
        );
    });
}

// A timestamp outside the window fails even when the signature is correct.
#[test]
fn property_stale_timestamps_fail() {
    proptest!(|(
        skew in prop_oneof![301i64..100_000, -100_000i64..-300],
        body in "[a-z=&%0-9]{0,120}",
    )| {
        let authenticator = RequestAuthenticator::new("shared-secret");
        let timestamp = (NOW - skew).to_string();
        let signature = authenticator.sign(&timestamp, body.as_bytes()).unwrap();

        let result =
            authenticator.verify_at(body.as_bytes(), Some(&timestamp), Some(&signature), now());
        prop_assert!(
            matches!(result, Err(AuthError::StaleTimestamp { .. })),
            "unexpected result {:?}",
            result
        );
    });
}

// A different secret never verifies.
#[test]
fn property_wrong_secret_fails() {
    proptest!(|(
        secret in "[a-z]{8,16}",
        other in "[A-Z]{8,16}",
        body in "[a-z0-9]{0,64}",
    )| {
        let timestamp = NOW.to_string();
        let signature = RequestAuthenticator::new(secret.as_str())
            .sign(&timestamp, body.as_bytes())
            .unwrap();

        let result = RequestAuthenticator::new(other.as_str())
            .verify_at(body.as_bytes(), Some(&timestamp), Some(&signature), now());
        prop_assert_eq!(result, Err(AuthError::InvalidSignature));
    });
}

#[test]
fn test_missing_headers_fail_before_signature_check() {
    let authenticator = RequestAuthenticator::new("shared-secret");
    let timestamp = NOW.to_string();

    assert!(matches!(
        authenticator.verify_at(b"", None, Some("v0=00"), now()),
        Err(AuthError::MissingHeader(_))
    ));
    assert!(matches!(
        authenticator.verify_at(b"", Some(&timestamp), None, now()),
        Err(AuthError::MissingHeader(_))
    ));
}
