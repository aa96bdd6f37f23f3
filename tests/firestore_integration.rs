// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running and
//! FIRESTORE_EMULATOR_HOST to point at it.
//!
//! The emulator provides a clean state for each test run.

use silo_bridge::db::AccountStore;
use silo_bridge::models::{Account, AuthRef, Credential, CredentialKind, Feature};

mod common;
use common::test_db;

/// Generate a unique username for test isolation.
fn unique_username() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("user_{}", nanos)
}

/// Helper to create a basic test account
fn test_account(key: &str) -> Account {
    Account {
        silo: "instagram".to_string(),
        key: key.to_string(),
        silo_user_id: "420973239".to_string(),
        auth_ref: AuthRef {
            kind: CredentialKind::IndieAuth,
            id: "snarfed.org".to_string(),
        },
        display_name: "Test User".to_string(),
        picture_url: None,
        profile_url: format!("https://www.instagram.com/{}/", key),
        linked_domains: vec!["snarfed.org".to_string()],
        features: vec![Feature::Listen],
        created_at: "2026-01-15T10:00:00+00:00".to_string(),
        updated_at: "2026-01-15T10:00:00+00:00".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ACCOUNT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_account_create_and_get() {
    require_emulator!();

    let db = test_db().await;
    let key = unique_username();

    // Initially, account should not exist
    let before = db.get_account("instagram", &key).await.unwrap();
    assert!(before.is_none(), "Account should not exist before creation");

    let account = test_account(&key);
    db.put_account(&account).await.unwrap();

    let fetched = db
        .get_account("instagram", &key)
        .await
        .unwrap()
        .expect("Account should exist after creation");
    assert_eq!(fetched, account);

    println!("✓ Account created and verified: {}", account.document_id());
}

#[tokio::test]
async fn test_account_overwrite_keeps_one_document() {
    require_emulator!();

    let db = test_db().await;
    let key = unique_username();

    db.put_account(&test_account(&key)).await.unwrap();

    let mut updated = test_account(&key);
    updated.display_name = "Renamed".to_string();
    updated.features = vec![Feature::Listen, Feature::Publish];
    updated.updated_at = "2026-02-01T00:00:00+00:00".to_string();
    db.put_account(&updated).await.unwrap();

    let fetched = db.get_account("instagram", &key).await.unwrap().unwrap();
    assert_eq!(fetched.display_name, "Renamed");
    assert_eq!(fetched.features, vec![Feature::Listen, Feature::Publish]);
    assert_eq!(fetched.created_at, "2026-01-15T10:00:00+00:00");
}

// ═══════════════════════════════════════════════════════════════════════════
// CREDENTIAL TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_credential_roundtrip() {
    require_emulator!();

    let db = test_db().await;
    let did = format!("did:plc:{}", unique_username());

    let credential = Credential {
        auth_ref: AuthRef {
            kind: CredentialKind::Bluesky,
            id: did.clone(),
        },
        identity: "alice.bsky.social".to_string(),
        rel_me_links: vec![],
        access_jwt: Some("access".to_string()),
        refresh_jwt: Some("refresh".to_string()),
        updated_at: "2026-01-15T10:00:00+00:00".to_string(),
    };
    db.put_credential(&credential).await.unwrap();

    let fetched = db
        .get_credential(CredentialKind::Bluesky, &did)
        .await
        .unwrap()
        .expect("Credential should exist");
    assert_eq!(fetched.identity, "alice.bsky.social");
    assert_eq!(fetched.refresh_jwt.as_deref(), Some("refresh"));

    let missing = db
        .get_credential(CredentialKind::IndieAuth, &did)
        .await
        .unwrap();
    assert!(missing.is_none());
}
