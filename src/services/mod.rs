// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod bluesky;
pub mod canonicalize;
pub mod indieauth;
pub mod instagram;
pub mod oauth_state;
pub mod orchestrator;
pub mod silo;
pub mod site;
pub mod verifier;

pub use accounts::AccountService;
pub use bluesky::BlueskyProvider;
pub use canonicalize::{TrailingSlash, UrlCanonicalizer};
pub use indieauth::{AuthCodeVerifier, AuthError, CodeCheck, IndieAuthClient};
pub use instagram::InstagramProvider;
pub use oauth_state::{OAuthState, SignupState, StateCodec, StateError};
pub use orchestrator::{CallbackOrchestrator, Outcome, Stage};
pub use silo::{FetchError, LoginError, LoginFlow, ProviderRegistry, SiloProvider};
pub use site::{HttpSiteFetcher, SiteFetchError, SiteFetcher, SitePage};
pub use verifier::VerificationFailure;
