// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use silo_bridge::config::Config;
use silo_bridge::db::{AccountStore, FirestoreDb, MemoryStore};
use silo_bridge::models::SiloProfile;
use silo_bridge::routes::create_router;
use silo_bridge::services::indieauth::{AuthCodeVerifier, AuthError, CodeCheck};
use silo_bridge::services::site::{SiteFetchError, SiteFetcher, SitePage};
use silo_bridge::services::{
    AccountService, CallbackOrchestrator, FetchError, OAuthState, ProviderRegistry, SignupState,
    SiloProvider, StateCodec, UrlCanonicalizer,
};
use silo_bridge::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fakes ───────────────────────────────────────────────────────────

/// Personal sites served from memory. Unknown URLs fail to connect.
#[derive(Default)]
pub struct FakeSiteFetcher {
    pages: Mutex<HashMap<String, SitePage>>,
}

#[allow(dead_code)]
impl FakeSiteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, rel_me: &[&str], endpoint: Option<&str>) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            SitePage {
                url: url.to_string(),
                rel_me: rel_me.iter().map(|s| s.to_string()).collect(),
                authorization_endpoint: endpoint.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl SiteFetcher for FakeSiteFetcher {
    async fn fetch(&self, url: &str) -> Result<SitePage, SiteFetchError> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SiteFetchError::Connection("Connection refused".to_string()))
    }
}

/// Accepts every code except `bad`. Confirms the claimed `me` unless built
/// with [`FakeAuthVerifier::confirming`].
#[derive(Default)]
pub struct FakeAuthVerifier {
    identity: Option<String>,
}

#[allow(dead_code)]
impl FakeAuthVerifier {
    /// Confirm `me` whatever identity the login claimed.
    pub fn confirming(me: &str) -> Self {
        Self {
            identity: Some(me.to_string()),
        }
    }
}

#[async_trait]
impl AuthCodeVerifier for FakeAuthVerifier {
    async fn verify_code(&self, check: &CodeCheck) -> Result<String, AuthError> {
        if check.code == "bad" {
            Err(AuthError::Rejected(400))
        } else {
            Ok(self.identity.clone().unwrap_or_else(|| check.me.clone()))
        }
    }
}

/// Instagram-shaped provider returning a canned profile and counting fetches.
pub struct StubProvider {
    result: Result<SiloProfile, FetchError>,
    canonicalizer: UrlCanonicalizer,
    pub fetches: AtomicUsize,
}

#[allow(dead_code)]
impl StubProvider {
    pub fn new(result: Result<SiloProfile, FetchError>) -> Self {
        Self {
            result,
            canonicalizer: UrlCanonicalizer::default(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiloProvider for StubProvider {
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

    async fn fetch_profile(&self, _username: &str) -> Result<SiloProfile, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// The profile most tests log in as.
#[allow(dead_code)]
pub fn snarfed_profile() -> SiloProfile {
    SiloProfile {
        silo_user_id: "420973239".to_string(),
        username: "snarfed".to_string(),
        display_name: "Ryan Barrett".to_string(),
        image_url: Some("http://pic".to_string()),
        bio_links: vec![
            "https://snarfed.org".to_string(),
            "http://a/".to_string(),
            "https://b".to_string(),
        ],
        is_public: true,
    }
}

// ─── App construction ────────────────────────────────────────────────

/// A router wired to in-memory collaborators, with its store in reach.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
}

/// A router over a store the caller already holds.
#[allow(dead_code)]
pub struct StoreBackedApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
}

/// Create a test app with the given silo providers and personal sites.
#[allow(dead_code)]
pub fn create_test_app(providers: Vec<Arc<dyn SiloProvider>>, sites: FakeSiteFetcher) -> TestApp {
    create_test_app_with_verifier(providers, sites, FakeAuthVerifier::default())
}

/// Create a test app whose authorization endpoint answers via `verifier`.
#[allow(dead_code)]
pub fn create_test_app_with_verifier(
    providers: Vec<Arc<dyn SiloProvider>>,
    sites: FakeSiteFetcher,
    verifier: FakeAuthVerifier,
) -> TestApp {
    let store = MemoryStore::new();
    let state = build_state(providers, sites, Arc::new(store.clone()), verifier);
    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

/// Create a test app backed by an arbitrary store.
#[allow(dead_code)]
pub fn create_test_app_with_store(
    providers: Vec<Arc<dyn SiloProvider>>,
    sites: FakeSiteFetcher,
    store: Arc<dyn AccountStore>,
) -> StoreBackedApp {
    let state = build_state(providers, sites, store, FakeAuthVerifier::default());
    StoreBackedApp {
        router: create_router(state.clone()),
        state,
    }
}

#[allow(dead_code)]
fn build_state(
    providers: Vec<Arc<dyn SiloProvider>>,
    sites: FakeSiteFetcher,
    store: Arc<dyn AccountStore>,
    verifier: FakeAuthVerifier,
) -> Arc<AppState> {
    let config = Config::test_default();

    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }

    let accounts = AccountService::new(store);
    let sites: Arc<dyn SiteFetcher> = Arc::new(sites);
    let state_codec = StateCodec::new(&config.oauth_state_key, config.state_max_age);
    let orchestrator = CallbackOrchestrator::new(sites.clone(), accounts.clone(), &config.public_url);

    Arc::new(AppState {
        config,
        providers: registry,
        accounts,
        sites,
        auth_verifier: Arc::new(verifier),
        state_codec,
        orchestrator,
    })
}

/// Signed state token as `POST /{silo}/start` would have issued it.
#[allow(dead_code)]
pub fn state_token(state: &AppState, me: &str, signup: Option<&SignupState>) -> String {
    let inner = match signup {
        Some(signup) => signup.encode().unwrap(),
        None => "0".to_string(),
    };
    state
        .state_codec
        .encode(&OAuthState {
            endpoint: "https://indieauth.com/auth".to_string(),
            me: me.to_string(),
            state: Some(inner),
        })
        .unwrap()
}

/// Build a form POST request.
#[allow(dead_code)]
pub fn form_post(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Build a callback GET request carrying `code` and `state`.
#[allow(dead_code)]
pub fn callback_get(silo: &str, code: &str, token: &str) -> Request<Body> {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .append_pair("state", token)
        .finish();
    Request::builder()
        .uri(format!("/{}/callback?{}", silo, query))
        .body(Body::empty())
        .unwrap()
}

/// `Location` header of a response.
#[allow(dead_code)]
pub fn location<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response should redirect")
        .to_str()
        .unwrap()
        .to_string()
}

/// Decoded `#!` message of a failure redirect.
#[allow(dead_code)]
pub fn fragment_message(location: &str) -> String {
    let (_, encoded) = location
        .split_once("#!")
        .expect("redirect should carry a message");
    urlencoding::decode(encoded).unwrap().into_owned()
}
