// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instagram profile lookups.
//!
//! Handles:
//! - Public profile fetches by username
//! - Rate limit and login-wall detection
//! - Post URL canonicalization
//!
//! Instagram usernames may have ASCII letters (case insensitive), numbers,
//! periods, and underscores, so the lowercase username is the account key.

use crate::models::SiloProfile;
use crate::services::canonicalize::{TrailingSlash, UrlCanonicalizer};
use crate::services::silo::{FetchError, SiloProvider};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// Statuses Instagram uses when it is throttling or blocking us.
pub const RATE_LIMIT_HTTP_CODES: [u16; 3] = [401, 429, 503];

/// App ID the Instagram web client sends with profile requests.
const WEB_APP_ID: &str = "936619743392459";

const POST_URL_PATTERN: &str = r"https://www\.instagram\.com/p/[^/?]+/";

static BIO_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("static regex"));

/// Instagram silo provider.
#[derive(Clone)]
pub struct InstagramProvider {
    http: reqwest::Client,
    base_url: String,
    canonicalizer: UrlCanonicalizer,
}

impl InstagramProvider {
    /// Create a provider fetching profiles from `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // A redirect means a login wall, so redirects are never followed.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            canonicalizer: Self::post_canonicalizer()?,
        })
    }

    /// Canonicalizer for Instagram post permalinks.
    pub fn post_canonicalizer() -> anyhow::Result<UrlCanonicalizer> {
        // no reject pattern; non-public post URLs just 404
        Ok(UrlCanonicalizer::new()
            .domain("instagram.com")
            .subdomain("www")
            .trailing_slash(TrailingSlash::Add)
            .follow_redirects(true)
            .approve(POST_URL_PATTERN)?)
    }
}

#[async_trait]
impl SiloProvider for InstagramProvider {
    fn name(&self) -> &'static str {
        "instagram"
    }

    fn label(&self) -> &'static str {
        "Instagram"
    }

    fn domain(&self) -> &'static str {
        "instagram.com"
    }

    fn canonicalizer(&self) -> &UrlCanonicalizer {
        &self.canonicalizer
    }

    fn user_url(&self, username: &str) -> String {
        format!("https://www.instagram.com/{}/", username)
    }

    async fn fetch_profile(&self, username: &str) -> Result<SiloProfile, FetchError> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("username", username)])
            .header("x-ig-app-id", WEB_APP_ID)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_redirection() || RATE_LIMIT_HTTP_CODES.contains(&status.as_u16()) {
            tracing::warn!(username, status = %status, "Instagram rate limit or login wall");
            return Err(FetchError::RateLimited(status.as_u16()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(username.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Transient(format!("HTTP {}: {}", status, body)));
        }

        let body: WebProfileResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(format!("JSON parse error: {}", e)))?;

        body.data
            .user
            .map(InstagramUser::into_profile)
            .ok_or_else(|| FetchError::NotFound(username.to_string()))
    }
}

/// Web profile endpoint response.
#[derive(Debug, Deserialize)]
struct WebProfileResponse {
    data: WebProfileData,
}

#[derive(Debug, Deserialize)]
struct WebProfileData {
    user: Option<InstagramUser>,
}

/// Profile fields we use.
#[derive(Debug, Deserialize)]
struct InstagramUser {
    id: String,
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    biography: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
    #[serde(default)]
    profile_pic_url: Option<String>,
    #[serde(default)]
    is_private: bool,
}

impl InstagramUser {
    fn into_profile(self) -> SiloProfile {
        let mut bio_links: Vec<String> = self
            .external_url
            .into_iter()
            .filter(|u| !u.trim().is_empty())
            .collect();
        if let Some(bio) = &self.biography {
            bio_links.extend(urls_in_text(bio));
        }

        let display_name = self
            .full_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.username.clone());

        SiloProfile {
            silo_user_id: self.id,
            username: self.username,
            display_name,
            image_url: self.profile_pic_url,
            bio_links,
            is_public: !self.is_private,
        }
    }
}

/// http(s) URLs in free text, trailing punctuation trimmed.
pub fn urls_in_text(text: &str) -> Vec<String> {
    BIO_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', ')', '!', '?']))
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> InstagramProvider {
        InstagramProvider::new("https://www.instagram.com", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_canonicalize_post_urls() {
        let ig = provider();
        for url in [
            "http://www.instagram.com/p/abcd",
            "https://www.instagram.com/p/abcd",
            "https://www.instagram.com/p/abcd/",
            "https://instagram.com/p/abcd",
        ] {
            assert_eq!(
                ig.canonicalize_url(url).as_deref(),
                Some("https://www.instagram.com/p/abcd/"),
                "{url}"
            );
        }
        assert_eq!(ig.canonicalize_url("https://www.foo.com/p/abcd/"), None);
    }

    #[test]
    fn test_approve_checks_full_url() {
        let ig = provider();
        assert_eq!(
            ig.canonicalize_url("https://www.instagram.com/p/abcd/123"),
            None
        );
        assert_eq!(ig.canonicalize_url("https://www.instagram.com/snarfed/"), None);
    }

    #[test]
    fn test_user_url() {
        assert_eq!(provider().user_url("snarfed"), "https://www.instagram.com/snarfed/");
    }

    #[test]
    fn test_urls_in_text() {
        assert_eq!(
            urls_in_text("Photos. http://a/ https://b, and (https://c.com/x)."),
            vec!["http://a/", "https://b", "https://c.com/x"]
        );
        assert!(urls_in_text("no links here").is_empty());
    }

    #[test]
    fn test_into_profile_orders_website_first() {
        let user = InstagramUser {
            id: "420973239".to_string(),
            username: "snarfed".to_string(),
            full_name: Some("".to_string()),
            biography: Some("http://a/ https://b".to_string()),
            external_url: Some("https://snarfed.org".to_string()),
            profile_pic_url: None,
            is_private: true,
        };
        let profile = user.into_profile();
        assert_eq!(profile.bio_links, vec!["https://snarfed.org", "http://a/", "https://b"]);
        assert_eq!(profile.display_name, "snarfed");
        assert!(!profile.is_public);
    }
}
