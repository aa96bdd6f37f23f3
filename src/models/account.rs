// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model for storage and API.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What an account has signed up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Listen,
    Publish,
}

impl Feature {
    /// Parse a comma-separated feature list, skipping unknown names.
    pub fn parse_list(raw: &str) -> Vec<Feature> {
        let mut features = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let feature = match name {
                "listen" => Feature::Listen,
                "publish" => Feature::Publish,
                other => {
                    tracing::warn!(feature = %other, "Ignoring unknown feature");
                    continue;
                }
            };
            if !features.contains(&feature) {
                features.push(feature);
            }
        }
        features
    }
}

/// Kind of stored login credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    IndieAuth,
    Bluesky,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::IndieAuth => "indieauth",
            CredentialKind::Bluesky => "bluesky",
        }
    }
}

/// Reference from an account to its stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRef {
    pub kind: CredentialKind,
    pub id: String,
}

impl AuthRef {
    /// Document ID of the referenced credential.
    pub fn document_id(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.id)
    }
}

/// Login credential kept so later polling can re-authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub auth_ref: AuthRef,
    /// Verified identity (personal site URL, Bluesky handle)
    pub identity: String,
    /// rel-me links seen on the personal site at login
    #[serde(default)]
    pub rel_me_links: Vec<String>,
    /// Bluesky session tokens
    #[serde(default)]
    pub access_jwt: Option<String>,
    #[serde(default)]
    pub refresh_jwt: Option<String>,
    pub updated_at: String,
}

/// A linked silo account, stored under `{silo}:{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Silo short name, e.g. `instagram`
    pub silo: String,
    /// Lowercase username (DID for Bluesky); stable across logins
    pub key: String,
    /// Silo's own user ID
    pub silo_user_id: String,
    pub auth_ref: AuthRef,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub profile_url: String,
    /// Domains from the profile's links, first-seen order
    pub linked_domains: Vec<String>,
    pub features: Vec<Feature>,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    /// Storage document ID.
    pub fn document_id(&self) -> String {
        document_id(&self.silo, &self.key)
    }

    /// Opaque key handed to signup API callers.
    pub fn opaque_key(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.document_id())
    }

    /// Path of this account's local page.
    pub fn local_path(&self) -> String {
        format!("/account/{}/{}", self.silo, self.key)
    }

    /// Tag URI of the silo user, e.g. `tag:instagram.com,2013:420973239`.
    pub fn user_tag_id(&self, silo_domain: &str) -> String {
        format!("tag:{},2013:{}", silo_domain, self.silo_user_id)
    }

    /// Human label, e.g. `snarfed (Instagram)`.
    pub fn label(&self, silo_label: &str) -> String {
        format!("{} ({})", self.key, silo_label)
    }
}

/// Storage document ID for an account.
pub fn document_id(silo: &str, key: &str) -> String {
    format!("{silo}:{key}")
}

/// Account as exposed by the JSON API.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AccountResponse {
    pub silo: String,
    pub key: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub profile_url: String,
    pub linked_domains: Vec<String>,
    pub features: Vec<Feature>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            silo: account.silo,
            key: account.key,
            display_name: account.display_name,
            picture_url: account.picture_url,
            profile_url: account.profile_url,
            linked_domains: account.linked_domains,
            features: account.features,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
