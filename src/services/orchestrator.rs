// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login callback orchestration.
//!
//! Sequences site fetch, ownership verification and account upsert for one
//! callback, and turns whatever happened into a single redirect. Nothing in
//! here returns an error to the HTTP layer: every failure becomes a
//! user-facing message.
//!
//! ```text
//! Start → SiteFetch → LinkDiscovery → ProfileFetch → BacklinkCheck → PrivacyCheck → (Success | Failure)
//! ```

use crate::models::profile::domain_from_link;
use crate::models::{Account, AuthClaim, AuthRef, Credential, CredentialKind, VerifiedProfile};
use crate::services::accounts::AccountService;
use crate::services::oauth_state::SignupState;
use crate::services::silo::{LoginError, SiloProvider};
use crate::services::site::SiteFetcher;
use crate::services::verifier::{fetch_failure, VerificationFailure};
use std::sync::Arc;
use url::Url;

/// Shown when the state token can't be trusted.
pub const INVALID_STATE_MESSAGE: &str =
    "Your login session was invalid or expired. Please try again.";

/// Shown when the user or their authorization endpoint declined the login.
pub const DECLINED_MESSAGE: &str = "Login was declined or failed. Please try again.";

/// Shown when storing the account fails.
pub const STORAGE_FAILURE_MESSAGE: &str =
    "Sorry, we couldn't save your account. Please try again later.";

/// Callback pipeline stage, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SiteFetch,
    LinkDiscovery,
    ProfileFetch,
    BacklinkCheck,
    PrivacyCheck,
    Login,
    Upsert,
}

impl Stage {
    /// Stage a verification failure came from.
    pub fn of(failure: &VerificationFailure) -> Self {
        match failure {
            VerificationFailure::NoProfileLinkFound { .. } => Stage::LinkDiscovery,
            VerificationFailure::UpstreamBlocked { .. }
            | VerificationFailure::ProfileNotFound { .. }
            | VerificationFailure::ProfileUnavailable { .. } => Stage::ProfileFetch,
            VerificationFailure::BacklinkMissing { .. } => Stage::BacklinkCheck,
            VerificationFailure::AccountPrivate { .. } => Stage::PrivacyCheck,
        }
    }
}

/// Terminal state of one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { account: Account, redirect: String },
    Failure { message: String, redirect: String },
}

impl Outcome {
    /// Where the browser goes next.
    pub fn redirect(&self) -> &str {
        match self {
            Outcome::Success { redirect, .. } | Outcome::Failure { redirect, .. } => redirect,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Runs login callbacks to completion.
#[derive(Clone)]
pub struct CallbackOrchestrator {
    sites: Arc<dyn SiteFetcher>,
    accounts: AccountService,
    public_url: String,
}

impl CallbackOrchestrator {
    pub fn new(sites: Arc<dyn SiteFetcher>, accounts: AccountService, public_url: &str) -> Self {
        Self {
            sites,
            accounts,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Finish a personal-site login whose identity `me` has been confirmed.
    pub async fn complete_indieauth(
        &self,
        provider: &dyn SiloProvider,
        me: &str,
        signup: &SignupState,
    ) -> Outcome {
        let silo = provider.name();

        let page = match self.sites.fetch(me).await {
            Ok(page) => page,
            Err(e) => {
                let message = format!("Couldn't fetch your web site: {}", e);
                tracing::warn!(silo, me, stage = ?Stage::SiteFetch, error = %e, "Login failed");
                return self.local_failure(message);
            }
        };

        let claim = AuthClaim::new(me, page.rel_me.clone());
        let verified = match provider.verify_ownership(&claim).await {
            Ok(verified) => verified,
            Err(failure) => {
                tracing::warn!(
                    silo,
                    me,
                    stage = ?Stage::of(&failure),
                    failure = %failure,
                    "Login failed"
                );
                return self.local_failure(failure.to_string());
            }
        };

        let credential = Credential {
            auth_ref: AuthRef {
                kind: CredentialKind::IndieAuth,
                id: domain_from_link(me).unwrap_or_else(|| me.to_string()),
            },
            identity: me.to_string(),
            rel_me_links: page.rel_me,
            access_jwt: None,
            refresh_jwt: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let landing = format!("{}/", self.public_url);
        self.store(provider, &verified, &credential, signup, &landing)
            .await
    }

    /// Finish an app password login. Failures go back to the silo's start page.
    pub async fn complete_app_password(
        &self,
        provider: &dyn SiloProvider,
        identifier: &str,
        password: &str,
        signup: &SignupState,
    ) -> Outcome {
        let silo = provider.name();
        let label = provider.label();
        let start_page = format!("{}/{}/start", self.public_url, silo);

        let session = match provider.create_session(identifier.trim(), password).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(silo, identifier, stage = ?Stage::Login, error = %e, "Login failed");
                let message = match e {
                    LoginError::RateLimited(_) => {
                        VerificationFailure::UpstreamBlocked { silo: label }.to_string()
                    }
                    _ => format!(
                        "Failed to log in to {}. Are your credentials correct?",
                        label
                    ),
                };
                return failure_at(&start_page, message);
            }
        };

        let profile = match provider.fetch_profile(&session.user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                let failure = fetch_failure(label, &session.handle, e);
                tracing::warn!(
                    silo,
                    handle = %session.handle,
                    stage = ?Stage::ProfileFetch,
                    failure = %failure,
                    "Login failed"
                );
                return failure_at(&start_page, failure.to_string());
            }
        };

        let credential = Credential {
            auth_ref: AuthRef {
                kind: CredentialKind::Bluesky,
                id: session.user_id.clone(),
            },
            identity: session.handle.clone(),
            rel_me_links: Vec::new(),
            access_jwt: Some(session.access_jwt),
            refresh_jwt: Some(session.refresh_jwt),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        let verified = VerifiedProfile {
            profile,
            username: session.handle,
        };

        self.store(provider, &verified, &credential, signup, &start_page)
            .await
    }

    /// The login was declined before we could verify anything.
    pub fn declined(&self, signup: &SignupState) -> Outcome {
        match signup.callback() {
            Some(callback) => Outcome::Failure {
                message: DECLINED_MESSAGE.to_string(),
                redirect: with_query(
                    callback,
                    &[("result", "failure"), ("error", DECLINED_MESSAGE)],
                ),
            },
            None => self.local_failure(DECLINED_MESSAGE),
        }
    }

    /// Failure shown on the landing page.
    pub fn local_failure(&self, message: impl Into<String>) -> Outcome {
        failure_at(&format!("{}/", self.public_url), message)
    }

    async fn store(
        &self,
        provider: &dyn SiloProvider,
        verified: &VerifiedProfile,
        credential: &Credential,
        signup: &SignupState,
        failure_page: &str,
    ) -> Outcome {
        let account = match self
            .accounts
            .upsert(provider, verified, credential, &signup.features())
            .await
        {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(
                    silo = provider.name(),
                    username = %verified.username,
                    stage = ?Stage::Upsert,
                    error = %e,
                    "Failed to store account"
                );
                return failure_at(failure_page, STORAGE_FAILURE_MESSAGE);
            }
        };

        let redirect = self.success_redirect(&account, signup);
        tracing::info!(
            account = %account.label(provider.label()),
            operation = ?signup.operation,
            redirect = %redirect,
            "Login succeeded"
        );
        Outcome::Success { account, redirect }
    }

    fn success_redirect(&self, account: &Account, signup: &SignupState) -> String {
        let user_page = format!("{}{}", self.public_url, account.local_path());
        match signup.callback() {
            Some(callback) => with_query(
                callback,
                &[
                    ("result", "success"),
                    ("user", &user_page),
                    ("key", &account.opaque_key()),
                ],
            ),
            None => user_page,
        }
    }
}

/// Failure redirect to `page`, message in the `#!` fragment.
fn failure_at(page: &str, message: impl Into<String>) -> Outcome {
    let message = message.into();
    let redirect = format!("{}#!{}", page, urlencoding::encode(&message));
    Outcome::Failure { message, redirect }
}

/// Append query parameters to a caller-supplied URL.
fn with_query(base: &str, pairs: &[(&str, &str)]) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(pairs);
            url.to_string()
        }
        Err(_) => {
            let query: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            let sep = if base.contains('?') { '&' } else { '?' };
            format!("{}{}{}", base, sep, query.join("&"))
        }
    }
}
