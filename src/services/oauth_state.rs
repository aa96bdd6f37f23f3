// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth state tokens.
//!
//! The outer token carries the authorization endpoint and claimed site
//! through the redirect round trip; it is `base64url(json).hex(hmac)`.
//! Signup API parameters ride inside it as a nested JSON string.

use crate::models::Feature;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Current outer token format.
pub const STATE_VERSION: u8 = 1;

/// State carried through the IndieAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub endpoint: String,
    pub me: String,
    /// Opaque nested state, usually an encoded [`SignupState`]
    pub state: Option<String>,
}

/// Wire form of [`OAuthState`].
#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    endpoint: String,
    me: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    iat: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("malformed state token")]
    Malformed,

    #[error("state token signature mismatch")]
    BadSignature,

    #[error("unsupported state token version {0}")]
    UnsupportedVersion(u8),

    #[error("state token expired")]
    Expired,

    #[error("failed to encode state: {0}")]
    Encode(String),
}

/// Encodes and verifies state tokens with one HMAC key.
#[derive(Clone)]
pub struct StateCodec {
    key: Vec<u8>,
    max_age: Duration,
}

impl StateCodec {
    pub fn new(key: &[u8], max_age: Duration) -> Self {
        Self {
            key: key.to_vec(),
            max_age,
        }
    }

    pub fn encode(&self, state: &OAuthState) -> Result<String, StateError> {
        self.encode_issued_at(state, Utc::now().timestamp())
    }

    /// Encode with an explicit issue time (Unix seconds).
    pub fn encode_issued_at(&self, state: &OAuthState, iat: i64) -> Result<String, StateError> {
        let envelope = Envelope {
            v: STATE_VERSION,
            endpoint: state.endpoint.clone(),
            me: state.me.clone(),
            state: state.state.clone(),
            iat,
        };
        let payload =
            serde_json::to_vec(&envelope).map_err(|e| StateError::Encode(e.to_string()))?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            hex::encode(signature)
        ))
    }

    pub fn decode(&self, token: &str) -> Result<OAuthState, StateError> {
        let (payload_b64, signature_hex) =
            token.trim().split_once('.').ok_or(StateError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| StateError::Malformed)?;
        let signature = hex::decode(signature_hex).map_err(|_| StateError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        if mac.verify_slice(&signature).is_err() {
            tracing::error!("OAuth state signature mismatch! Potential tampering.");
            return Err(StateError::BadSignature);
        }

        let envelope: Envelope =
            serde_json::from_slice(&payload).map_err(|_| StateError::Malformed)?;
        if envelope.v != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(envelope.v));
        }

        let age = Utc::now().timestamp() - envelope.iat;
        if age < 0 || age as u64 > self.max_age.as_secs() {
            return Err(StateError::Expired);
        }

        Ok(OAuthState {
            endpoint: envelope.endpoint,
            me: envelope.me,
            state: envelope.state,
        })
    }

    fn mac(&self) -> Result<HmacSha256, StateError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| StateError::Encode(e.to_string()))
    }
}

/// Signup API parameters echoed through the login round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    /// Comma-separated feature names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_url: Option<String>,
}

impl SignupState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn encode(&self) -> Result<String, StateError> {
        serde_json::to_string(self).map_err(|e| StateError::Encode(e.to_string()))
    }

    /// Decode a nested state value. Anything that isn't a JSON object,
    /// such as the literal `0`, is empty signup state.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        if !raw.starts_with('{') {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring undecodable signup state");
            Self::default()
        })
    }

    /// Explicitly requested features, if any.
    pub fn features(&self) -> Vec<Feature> {
        self.feature
            .as_deref()
            .map(Feature::parse_list)
            .unwrap_or_default()
    }

    /// Signup API callback, if one was supplied.
    pub fn callback(&self) -> Option<&str> {
        self.callback
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
