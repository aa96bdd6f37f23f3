// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! IndieAuth authorization-code checks.
//!
//! The handshake itself lives with the user's authorization endpoint; we only
//! build the redirect to it and confirm the returned code.

use crate::services::canonicalize::UrlCanonicalizer;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Parameters for confirming an authorization code.
#[derive(Debug, Clone)]
pub struct CodeCheck {
    pub endpoint: String,
    pub code: String,
    pub me: String,
    pub state: String,
    pub client_id: String,
    pub redirect_uri: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization request failed: {0}")]
    Request(String),

    #[error("Authorization endpoint rejected the code (HTTP {0})")]
    Rejected(u16),

    #[error("Authorization response did not include a verified identity")]
    MissingIdentity,
}

/// Confirms authorization codes, returning the verified `me` URL.
#[async_trait]
pub trait AuthCodeVerifier: Send + Sync {
    async fn verify_code(&self, check: &CodeCheck) -> Result<String, AuthError>;
}

/// Build the URL that starts login at `endpoint`.
pub fn authorization_url(
    endpoint: &str,
    me: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut()
        .append_pair("me", me)
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state);
    Ok(url.to_string())
}

/// Whether the identity an endpoint confirmed is the one the login started
/// for. The endpoint is named by the claimed site, so it may only vouch for
/// that site.
pub fn same_identity(claimed: &str, confirmed: &str) -> bool {
    let canonicalizer = UrlCanonicalizer::default();
    match (
        canonicalizer.canonicalize(claimed),
        canonicalizer.canonicalize(confirmed),
    ) {
        (Some(claimed), Some(confirmed)) => claimed == confirmed,
        _ => false,
    }
}

#[derive(Deserialize)]
struct JsonIdentity {
    me: Option<String>,
}

/// IndieAuth client confirming codes against the user's endpoint.
#[derive(Clone)]
pub struct IndieAuthClient {
    http: reqwest::Client,
}

impl IndieAuthClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AuthCodeVerifier for IndieAuthClient {
    async fn verify_code(&self, check: &CodeCheck) -> Result<String, AuthError> {
        let response = self
            .http
            .post(&check.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("me", check.me.as_str()),
                ("state", check.state.as_str()),
                ("code", check.code.as_str()),
                ("client_id", check.client_id.as_str()),
                ("redirect_uri", check.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Authorization code rejected");
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        parse_identity(&body, is_json).ok_or(AuthError::MissingIdentity)
    }
}

/// Pull `me` out of a JSON or form-encoded response body.
fn parse_identity(body: &str, is_json: bool) -> Option<String> {
    let me = if is_json {
        serde_json::from_str::<JsonIdentity>(body).ok()?.me
    } else {
        url::form_urlencoded::parse(body.trim().as_bytes())
            .find(|(key, _)| key == "me")
            .map(|(_, value)| value.into_owned())
    };
    me.filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let url = authorization_url(
            "https://indieauth.com/auth",
            "http://snarfed.org",
            "http://localhost",
            "http://localhost/instagram/callback",
            "abc.def",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://indieauth.com/auth?me=http%3A%2F%2Fsnarfed.org&client_id=http%3A%2F%2Flocalhost\
             &redirect_uri=http%3A%2F%2Flocalhost%2Finstagram%2Fcallback&state=abc.def"
        );
    }

    #[test]
    fn test_parse_identity() {
        assert_eq!(
            parse_identity("me=http%3A%2F%2Fsnarfed.org&scope=", false).as_deref(),
            Some("http://snarfed.org")
        );
        assert_eq!(
            parse_identity(r#"{"me": "https://snarfed.org/"}"#, true).as_deref(),
            Some("https://snarfed.org/")
        );
        assert_eq!(parse_identity("error=invalid_grant", false), None);
        assert_eq!(parse_identity(r#"{"me": ""}"#, true), None);
    }

    #[test]
    fn test_same_identity() {
        assert!(same_identity("http://snarfed.org", "https://snarfed.org/"));
        assert!(same_identity("https://Snarfed.org/", "http://snarfed.org"));
        assert!(!same_identity("https://evil.example", "http://snarfed.org"));
        assert!(!same_identity("https://host.example/~alice", "https://host.example/~bob"));
        assert!(!same_identity("https://snarfed.org", "not a url"));
    }
}
