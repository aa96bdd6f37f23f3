// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bluesky login and profile lookups over XRPC.
//!
//! Accounts log in with a handle and app password; the PDS checking those is
//! the proof of ownership, so there is no backlink step. Accounts are keyed by
//! DID since handles can change.

use crate::models::SiloProfile;
use crate::services::canonicalize::UrlCanonicalizer;
use crate::services::instagram::urls_in_text;
use crate::services::silo::{AppPasswordSession, FetchError, LoginError, LoginFlow, SiloProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const POST_URL_PATTERN: &str = r"https://bsky\.app/profile/[^/]+/post/[^/]+";

/// Bluesky silo provider.
#[derive(Clone)]
pub struct BlueskyProvider {
    http: reqwest::Client,
    pds_url: String,
    appview_url: String,
    canonicalizer: UrlCanonicalizer,
}

impl BlueskyProvider {
    pub fn new(pds_url: &str, appview_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let canonicalizer = UrlCanonicalizer::new()
            .domain("bsky.app")
            .approve(POST_URL_PATTERN)?;

        Ok(Self {
            http,
            pds_url: pds_url.trim_end_matches('/').to_string(),
            appview_url: appview_url.trim_end_matches('/').to_string(),
            canonicalizer,
        })
    }
}

#[async_trait]
impl SiloProvider for BlueskyProvider {
    fn name(&self) -> &'static str {
        "bluesky"
    }

    fn label(&self) -> &'static str {
        "Bluesky"
    }

    fn domain(&self) -> &'static str {
        "bsky.app"
    }

    fn login_flow(&self) -> LoginFlow {
        LoginFlow::AppPassword
    }

    fn canonicalizer(&self) -> &UrlCanonicalizer {
        &self.canonicalizer
    }

    fn user_url(&self, handle: &str) -> String {
        format!("https://bsky.app/profile/{}", handle)
    }

    /// `/profile/{handle}` → handle
    fn username_from_link(&self, link: &Url) -> Option<String> {
        let mut segments = link.path_segments()?;
        match (segments.next(), segments.next()) {
            (Some("profile"), Some(handle)) if !handle.is_empty() => Some(handle.to_string()),
            _ => None,
        }
    }

    fn account_key(&self, profile: &SiloProfile) -> String {
        profile.silo_user_id.to_lowercase()
    }

    async fn fetch_profile(&self, actor: &str) -> Result<SiloProfile, FetchError> {
        let url = format!("{}/xrpc/app.bsky.actor.getProfile", self.appview_url);

        let response = self
            .http
            .get(&url)
            .query(&[("actor", actor)])
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200..=299 => {}
            // the AppView answers 400 InvalidRequest for unknown actors
            400 | 404 => return Err(FetchError::NotFound(actor.to_string())),
            429 | 503 => {
                tracing::warn!(actor, status, "Bluesky rate limit hit");
                return Err(FetchError::RateLimited(status));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Transient(format!("HTTP {}: {}", status, body)));
            }
        }

        let profile: ProfileView = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(format!("JSON parse error: {}", e)))?;

        Ok(profile.into_profile())
    }

    async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AppPasswordSession, LoginError> {
        let url = format!("{}/xrpc/com.atproto.server.createSession", self.pds_url);

        let response = self
            .http
            .post(&url)
            .json(&CreateSessionRequest {
                identifier,
                password,
            })
            .send()
            .await
            .map_err(|e| LoginError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200..=299 => {}
            400 | 401 => {
                tracing::info!(identifier, status, "Bluesky rejected app password login");
                return Err(LoginError::Rejected);
            }
            429 | 503 => return Err(LoginError::RateLimited(status)),
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(LoginError::Transient(format!("HTTP {}: {}", status, body)));
            }
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| LoginError::Transient(format!("JSON parse error: {}", e)))?;

        Ok(AppPasswordSession {
            user_id: session.did,
            handle: session.handle,
            access_jwt: session.access_jwt,
            refresh_jwt: session.refresh_jwt,
        })
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
    refresh_jwt: String,
}

/// `app.bsky.actor.defs#profileViewDetailed`, the parts we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    did: String,
    handle: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ProfileView {
    fn into_profile(self) -> SiloProfile {
        let bio_links = self
            .description
            .as_deref()
            .map(urls_in_text)
            .unwrap_or_default();

        SiloProfile {
            silo_user_id: self.did,
            username: self.handle.clone(),
            display_name: self.handle,
            image_url: self.avatar,
            bio_links,
            is_public: true,
        }
    }
}
