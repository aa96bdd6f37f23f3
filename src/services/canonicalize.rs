// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! URL canonicalization.
//!
//! Normalizes URLs into a comparable form: scheme forced (https by default),
//! host lowercased, query and fragment dropped, trailing slash added or
//! stripped. Silo-specific canonicalizers also pin the domain and gate the
//! result through approve/reject patterns that must match the whole string.

use crate::models::profile::domain_matches;
use regex::Regex;
use url::Url;

/// What to do with a trailing slash on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingSlash {
    Add,
    Strip,
    Keep,
}

/// Errors building a canonicalizer.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalizerError {
    #[error("Invalid {kind} pattern: {source}")]
    Pattern {
        kind: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Configurable URL canonicalizer.
#[derive(Debug, Clone)]
pub struct UrlCanonicalizer {
    domain: Option<String>,
    subdomain: Option<String>,
    scheme: Option<String>,
    approve: Option<Regex>,
    reject: Option<Regex>,
    trailing_slash: TrailingSlash,
    keep_query: bool,
    keep_fragment: bool,
    follow_redirects: bool,
}

impl Default for UrlCanonicalizer {
    /// https, trailing slash stripped, no domain restriction, no redirects.
    fn default() -> Self {
        Self {
            domain: None,
            subdomain: None,
            scheme: Some("https".to_string()),
            approve: None,
            reject: None,
            trailing_slash: TrailingSlash::Strip,
            keep_query: false,
            keep_fragment: false,
            follow_redirects: false,
        }
    }
}

impl UrlCanonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept URLs on `domain` or its subdomains.
    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_ascii_lowercase());
        self
    }

    /// Rewrite the bare domain to `{subdomain}.{domain}`.
    pub fn subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = Some(subdomain.to_ascii_lowercase());
        self
    }

    /// Force a scheme, or keep the input's with `None`.
    pub fn scheme(mut self, scheme: Option<&str>) -> Self {
        self.scheme = scheme.map(str::to_string);
        self
    }

    pub fn trailing_slash(mut self, policy: TrailingSlash) -> Self {
        self.trailing_slash = policy;
        self
    }

    pub fn keep_query(mut self, keep: bool) -> Self {
        self.keep_query = keep;
        self
    }

    pub fn keep_fragment(mut self, keep: bool) -> Self {
        self.keep_fragment = keep;
        self
    }

    /// Resolve redirects in [`UrlCanonicalizer::resolve`].
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Canonical URLs must match `pattern` in full.
    pub fn approve(mut self, pattern: &str) -> Result<Self, CanonicalizerError> {
        self.approve = Some(anchored(pattern, "approve")?);
        Ok(self)
    }

    /// Canonical URLs matching `pattern` in full are rejected.
    pub fn reject(mut self, pattern: &str) -> Result<Self, CanonicalizerError> {
        self.reject = Some(anchored(pattern, "reject")?);
        Ok(self)
    }

    /// Canonicalize without any network access.
    ///
    /// Returns `None` for unparseable or non-http(s) URLs, URLs outside the
    /// configured domain, and URLs failing the approve/reject patterns.
    pub fn canonicalize(&self, raw: &str) -> Option<String> {
        let parsed = Url::parse(raw.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        let mut host = parsed.host_str()?.to_ascii_lowercase();
        if let Some(domain) = &self.domain {
            if !domain_matches(&host, domain) {
                return None;
            }
            if let Some(subdomain) = &self.subdomain {
                if host == *domain {
                    host = format!("{subdomain}.{domain}");
                }
            }
        }

        let scheme = self.scheme.as_deref().unwrap_or(parsed.scheme());
        let port = parsed
            .port()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();

        let mut path = parsed.path().to_string();
        match self.trailing_slash {
            TrailingSlash::Add => {
                if !path.ends_with('/') {
                    path.push('/');
                }
            }
            TrailingSlash::Strip => {
                while path.ends_with('/') {
                    path.pop();
                }
            }
            TrailingSlash::Keep => {}
        }

        let mut canonical = format!("{scheme}://{host}{port}{path}");
        if self.keep_query {
            if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
                canonical.push('?');
                canonical.push_str(query);
            }
        }
        if self.keep_fragment {
            if let Some(fragment) = parsed.fragment().filter(|f| !f.is_empty()) {
                canonical.push('#');
                canonical.push_str(fragment);
            }
        }

        if let Some(approve) = &self.approve {
            if !approve.is_match(&canonical) {
                return None;
            }
        }
        if let Some(reject) = &self.reject {
            if reject.is_match(&canonical) {
                return None;
            }
        }

        Some(canonical)
    }

    /// Canonicalize, following HTTP redirects first when configured to.
    ///
    /// A failed redirect lookup falls back to the non-redirected form.
    pub async fn resolve(&self, http: &reqwest::Client, raw: &str) -> Option<String> {
        let canonical = self.canonicalize(raw)?;
        if !self.follow_redirects {
            return Some(canonical);
        }

        match http.head(&canonical).send().await {
            Ok(response) if response.url().as_str() != canonical => {
                let resolved = response.url().to_string();
                tracing::debug!(from = %canonical, to = %resolved, "Followed redirect");
                self.canonicalize(&resolved)
            }
            Ok(_) => Some(canonical),
            Err(e) => {
                tracing::debug!(url = %canonical, error = %e, "Redirect lookup failed");
                Some(canonical)
            }
        }
    }
}

fn anchored(pattern: &str, kind: &'static str) -> Result<Regex, CanonicalizerError> {
    Regex::new(&format!(r"\A(?:{pattern})\z"))
        .map_err(|source| CanonicalizerError::Pattern { kind, source })
}
