// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Silo providers and the registry routes resolve them through.

use crate::models::{AuthClaim, SiloProfile, VerifiedProfile};
use crate::services::canonicalize::UrlCanonicalizer;
use crate::services::verifier::{self, VerificationFailure};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Profile fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("profile {0} not found")]
    NotFound(String),

    #[error("rate limited by upstream (HTTP {0})")]
    RateLimited(u16),

    #[error("profile fetch failed: {0}")]
    Transient(String),
}

/// App password login failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("credentials rejected")]
    Rejected,

    #[error("rate limited by upstream (HTTP {0})")]
    RateLimited(u16),

    #[error("login failed: {0}")]
    Transient(String),

    #[error("app password login is not supported")]
    Unsupported,
}

/// How users prove ownership of an account on a silo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFlow {
    /// Personal site login plus rel-me backlink check
    IndieAuth,
    /// Handle and app password checked by the silo itself
    AppPassword,
}

/// A session opened with an app password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPasswordSession {
    pub user_id: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

/// One supported silo.
#[async_trait]
pub trait SiloProvider: Send + Sync {
    /// Route tag, e.g. `instagram`.
    fn name(&self) -> &'static str;

    /// Human-readable name, e.g. `Instagram`.
    fn label(&self) -> &'static str;

    fn domain(&self) -> &'static str;

    fn login_flow(&self) -> LoginFlow {
        LoginFlow::IndieAuth
    }

    /// Canonicalizer for this silo's post URLs.
    fn canonicalizer(&self) -> &UrlCanonicalizer;

    fn canonicalize_url(&self, url: &str) -> Option<String> {
        self.canonicalizer().canonicalize(url)
    }

    /// Public profile URL for a username.
    fn user_url(&self, username: &str) -> String;

    /// Username named by a profile link, e.g. `/snarfed/` → `snarfed`.
    fn username_from_link(&self, link: &Url) -> Option<String> {
        let username = link.path().trim_matches('/');
        if username.is_empty() {
            None
        } else {
            Some(username.to_string())
        }
    }

    /// Storage key for a verified profile.
    fn account_key(&self, profile: &SiloProfile) -> String {
        profile.username.to_lowercase()
    }

    async fn fetch_profile(&self, username: &str) -> Result<SiloProfile, FetchError>;

    async fn create_session(
        &self,
        _identifier: &str,
        _password: &str,
    ) -> Result<AppPasswordSession, LoginError> {
        Err(LoginError::Unsupported)
    }
}

impl<'a> dyn SiloProvider + 'a {
    /// Decide whether `claim` proves ownership of an account on this silo.
    pub async fn verify_ownership(
        &self,
        claim: &AuthClaim,
    ) -> Result<VerifiedProfile, VerificationFailure> {
        verifier::verify(self, claim).await
    }
}

/// Silo name → provider, built once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn SiloProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn SiloProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn register(&mut self, provider: Arc<dyn SiloProvider>) {
        tracing::debug!(silo = provider.name(), "Registering silo provider");
        self.providers.insert(provider.name(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SiloProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(UrlCanonicalizer);

    #[async_trait]
    impl SiloProvider for Dummy {
        fn name(&self) -> &'static str {
            "dummy"
        }
        fn label(&self) -> &'static str {
            "Dummy"
        }
        fn domain(&self) -> &'static str {
            "dummy.example"
        }
        fn canonicalizer(&self) -> &UrlCanonicalizer {
            &self.0
        }
        fn user_url(&self, username: &str) -> String {
            format!("https://dummy.example/{username}")
        }
        async fn fetch_profile(&self, username: &str) -> Result<SiloProfile, FetchError> {
            Err(FetchError::NotFound(username.to_string()))
        }
    }

    #[tokio::test]
    async fn test_registry_lookup_and_defaults() {
        let registry = ProviderRegistry::new().with(Arc::new(Dummy(UrlCanonicalizer::default())));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["dummy"]);
        assert!(registry.get("instagram").is_none());

        let provider = registry.get("dummy").unwrap();
        assert_eq!(provider.login_flow(), LoginFlow::IndieAuth);
        assert_eq!(
            provider.username_from_link(&Url::parse("http://dummy.example/Snarfed/").unwrap()),
            Some("Snarfed".to_string())
        );
        assert_eq!(
            provider.username_from_link(&Url::parse("http://dummy.example/").unwrap()),
            None
        );
        assert_eq!(
            provider.create_session("a", "b").await,
            Err(LoginError::Unsupported)
        );
    }
}
