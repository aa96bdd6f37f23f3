// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Personal web site fetching.
//!
//! One fetch of the user's home page yields both the IndieAuth
//! `authorization_endpoint` (at login start) and its `rel="me"` links
//! (at callback).

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static REL_ME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[rel~="me"][href], link[rel~="me"][href]"#).expect("static selector")
});

static AUTHORIZATION_ENDPOINT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="authorization_endpoint"][href]"#).expect("static selector")
});

/// What we need from a personal site's home page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePage {
    /// Final URL after redirects
    pub url: String,
    /// Absolute rel-me link targets, in page order, deduplicated
    pub rel_me: Vec<String>,
    pub authorization_endpoint: Option<String>,
}

/// Site fetch errors. The display string is shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum SiteFetchError {
    #[error("{0}")]
    Connection(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Invalid web site URL: {0}")]
    InvalidUrl(String),
}

/// Fetches a personal site and extracts identity links.
#[async_trait]
pub trait SiteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<SitePage, SiteFetchError>;
}

/// reqwest-backed site fetcher.
#[derive(Clone)]
pub struct HttpSiteFetcher {
    http: reqwest::Client,
}

impl HttpSiteFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("silo-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl SiteFetcher for HttpSiteFetcher {
    async fn fetch(&self, url: &str) -> Result<SitePage, SiteFetchError> {
        let parsed = Url::parse(url.trim()).map_err(|_| SiteFetchError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SiteFetchError::InvalidUrl(url.to_string()));
        }

        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| SiteFetchError::Connection(e.to_string()))?;

        let status = response.status();
        let final_url = response.url().clone();
        if !status.is_success() {
            return Err(SiteFetchError::Http {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SiteFetchError::Connection(e.to_string()))?;

        let page = parse_site(&body, &final_url);
        tracing::info!(
            url = %page.url,
            rel_me = ?page.rel_me,
            endpoint = ?page.authorization_endpoint,
            "Fetched personal site"
        );
        Ok(page)
    }
}

/// Extract rel-me links and the authorization endpoint from a page.
pub fn parse_site(html: &str, base: &Url) -> SitePage {
    let document = Html::parse_document(html);

    let mut rel_me: Vec<String> = Vec::new();
    for element in document.select(&REL_ME) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        let resolved = resolved.to_string();
        if !rel_me.contains(&resolved) {
            rel_me.push(resolved);
        }
    }

    let authorization_endpoint = document
        .select(&AUTHORIZATION_ENDPOINT)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| base.join(href.trim()).ok())
        .map(|u| u.to_string());

    SitePage {
        url: base.to_string(),
        rel_me,
        authorization_endpoint,
    }
}
