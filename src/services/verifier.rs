// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ownership verification for rel-me silo logins.
//!
//! A login proves ownership of a silo account only when both directions link:
//! the personal site has a rel-me link to the profile, and the profile's
//! website or bio links back to the site. Checks run cheapest first and stop
//! at the first failure.

use crate::models::{AuthClaim, VerifiedProfile};
use crate::services::canonicalize::UrlCanonicalizer;
use crate::services::silo::{FetchError, SiloProvider};
use std::collections::HashSet;

/// Why a login was not accepted. The display strings are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("No {silo} profile found. Please add an {silo} rel-me link, then try again.")]
    NoProfileLinkFound { silo: &'static str },

    #[error("Apologies, {silo} is temporarily blocking us. Please try again later!")]
    UpstreamBlocked { silo: &'static str },

    #[error("Couldn't find {silo} user '{username}'. Please check your site's rel-me link and your {silo} account.")]
    ProfileNotFound { silo: &'static str, username: String },

    #[error("Please add {website} to your {silo} profile's website or bio field and try again.")]
    BacklinkMissing { silo: &'static str, website: String },

    #[error("Your {silo} account is private. Bridgy only supports public accounts.")]
    AccountPrivate { silo: &'static str },

    #[error("Couldn't fetch {silo} user '{username}': {reason}. Please try again later.")]
    ProfileUnavailable {
        silo: &'static str,
        username: String,
        reason: String,
    },
}

/// Map a profile fetch error to the failure the user sees.
pub fn fetch_failure(silo: &'static str, username: &str, err: FetchError) -> VerificationFailure {
    match err {
        FetchError::RateLimited(status) => {
            tracing::warn!(silo, username, status, "Upstream is blocking profile fetches");
            VerificationFailure::UpstreamBlocked { silo }
        }
        FetchError::NotFound(_) => VerificationFailure::ProfileNotFound {
            silo,
            username: username.to_string(),
        },
        FetchError::Transient(reason) => VerificationFailure::ProfileUnavailable {
            silo,
            username: username.to_string(),
            reason,
        },
    }
}

/// Verify that `claim` proves ownership of an account on `provider`.
pub async fn verify(
    provider: &dyn SiloProvider,
    claim: &AuthClaim,
) -> Result<VerifiedProfile, VerificationFailure> {
    let silo = provider.label();

    // rel-me link from the site to the silo
    tracing::info!(rel_me = ?claim.rel_me_links, "Looking for profile link");
    let username = claim
        .links_to_domain(provider.domain())
        .next()
        .and_then(|link| provider.username_from_link(&link))
        .ok_or(VerificationFailure::NoProfileLinkFound { silo })?;

    let profile = provider
        .fetch_profile(&username)
        .await
        .map_err(|e| fetch_failure(silo, &username, e))?;

    // link back from the profile to the site
    let canonicalize = UrlCanonicalizer::default();
    let website = canonicalize
        .canonicalize(&claim.personal_site_url)
        .unwrap_or_else(|| claim.personal_site_url.trim().to_string());
    let urls: HashSet<String> = profile
        .bio_links
        .iter()
        .filter_map(|link| canonicalize.canonicalize(link))
        .collect();
    tracing::info!(website = %website, urls = ?urls, "Looking for website in profile links");
    if !urls.contains(&website) {
        return Err(VerificationFailure::BacklinkMissing { silo, website });
    }

    if !profile.is_public {
        return Err(VerificationFailure::AccountPrivate { silo });
    }

    Ok(VerifiedProfile { profile, username })
}
