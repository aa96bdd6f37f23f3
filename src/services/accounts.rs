// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account creation and update from verified profiles.

use crate::db::AccountStore;
use crate::error::AppError;
use crate::models::profile::domain_from_link;
use crate::models::{Account, Credential, Feature, VerifiedProfile};
use crate::services::silo::SiloProvider;
use std::sync::Arc;

/// Creates or refreshes accounts in the store.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Store the credential, then create or update the account it unlocks.
    ///
    /// `features` are the explicitly requested ones; an empty slice means
    /// "no preference".
    pub async fn upsert(
        &self,
        provider: &dyn SiloProvider,
        verified: &VerifiedProfile,
        credential: &Credential,
        features: &[Feature],
    ) -> Result<Account, AppError> {
        self.store.put_credential(credential).await?;

        let key = provider.account_key(&verified.profile);
        let existing = self.store.get_account(provider.name(), &key).await?;
        let is_new = existing.is_none();

        let account = merge_account(
            existing,
            provider,
            key,
            verified,
            credential,
            features,
            chrono::Utc::now().to_rfc3339(),
        );
        self.store.put_account(&account).await?;

        tracing::info!(
            silo = %account.silo,
            key = %account.key,
            is_new,
            features = ?account.features,
            "Account stored"
        );
        Ok(account)
    }
}

/// Build the stored form of an account from a verified profile.
///
/// On update the key, creation time and existing features survive; display
/// fields, credential reference and linked domains are recomputed.
pub fn merge_account(
    existing: Option<Account>,
    provider: &dyn SiloProvider,
    key: String,
    verified: &VerifiedProfile,
    credential: &Credential,
    features: &[Feature],
    now: String,
) -> Account {
    let profile = &verified.profile;

    let features = match &existing {
        Some(account) => {
            let mut merged = account.features.clone();
            for feature in features {
                if !merged.contains(feature) {
                    merged.push(*feature);
                }
            }
            merged
        }
        None if features.is_empty() => vec![Feature::Listen],
        None => features.to_vec(),
    };

    Account {
        silo: provider.name().to_string(),
        key,
        silo_user_id: profile.silo_user_id.clone(),
        auth_ref: credential.auth_ref.clone(),
        display_name: profile.display_name.clone(),
        picture_url: profile.image_url.clone(),
        profile_url: provider.user_url(&verified.username),
        linked_domains: linked_domains(&profile.bio_links),
        features,
        created_at: existing
            .map(|account| account.created_at)
            .unwrap_or_else(|| now.clone()),
        updated_at: now,
    }
}

/// Domains of `links`, deduplicated in first-seen order.
pub fn linked_domains(links: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    for domain in links.iter().filter_map(|link| domain_from_link(link)) {
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    domains
}
