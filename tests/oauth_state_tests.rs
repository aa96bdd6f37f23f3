// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth state encoding/decoding tests.
//!
//! These tests verify that the authorization endpoint, claimed site and
//! signup parameters survive the round trip through the state parameter,
//! and that tokens we didn't issue are refused.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use silo_bridge::models::Feature;
use silo_bridge::services::{OAuthState, SignupState, StateCodec, StateError};
use std::time::Duration;

fn codec() -> StateCodec {
    StateCodec::new(b"test_state_key_32_bytes_minimum!", Duration::from_secs(3600))
}

fn oauth(state: Option<String>) -> OAuthState {
    OAuthState {
        endpoint: "https://indieauth.com/auth".to_string(),
        me: "http://snarfed.org".to_string(),
        state,
    }
}

#[test]
fn test_oauth_state_roundtrip_with_signup() {
    let signup = SignupState {
        callback: Some("http://my.site/call-back?x=1&y=2".to_string()),
        feature: Some("listen,publish".to_string()),
        operation: Some("add".to_string()),
        user_url: Some("http://snarfed.org".to_string()),
    };
    let original = oauth(Some(signup.encode().unwrap()));

    let codec = codec();
    let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();
    assert_eq!(decoded, original);

    let inner = SignupState::decode(decoded.state.as_deref());
    assert_eq!(inner, signup);
    assert_eq!(inner.features(), vec![Feature::Listen, Feature::Publish]);
}

#[test]
fn test_oauth_state_roundtrip_zero() {
    let codec = codec();
    let original = oauth(Some("0".to_string()));
    let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();

    assert_eq!(decoded.state.as_deref(), Some("0"));
    assert!(SignupState::decode(decoded.state.as_deref()).is_empty());
}

#[test]
fn test_oauth_state_roundtrip_without_nested_state() {
    let codec = codec();
    let original = oauth(None);
    assert_eq!(codec.decode(&codec.encode(&original).unwrap()).unwrap(), original);
}

#[test]
fn test_oauth_state_url_safe() {
    // Verify the token needs no escaping in a query string
    let token = codec()
        .encode(&oauth(Some(r#"{"callback":"http://a/?b=c+d"}"#.to_string())))
        .unwrap();

    assert!(!token.contains('+'), "State should not contain '+'");
    assert!(!token.contains('/'), "State should not contain '/'");
    assert!(!token.contains('='), "State should not contain '=' padding");
}

#[test]
fn test_oauth_state_unknown_version() {
    let payload = br#"{"v":2,"endpoint":"https://indieauth.com/auth","me":"http://snarfed.org","iat":0}"#;
    let token = signed(payload);
    assert_eq!(codec().decode(&token), Err(StateError::UnsupportedVersion(2)));
}

#[test]
fn test_oauth_state_decode_invalid() {
    let codec = codec();
    assert_eq!(codec.decode("not-valid-base64!!!"), Err(StateError::Malformed));
    assert_eq!(codec.decode(""), Err(StateError::Malformed));
}

/// Sign an arbitrary payload with the test key.
fn signed(payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(b"test_state_key_32_bytes_minimum!").unwrap();
    mac.update(payload);
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload),
        hex::encode(mac.finalize().into_bytes())
    )
}
