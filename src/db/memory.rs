// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process account store.

use super::AccountStore;
use crate::error::AppError;
use crate::models::account::document_id;
use crate::models::{Account, AuthRef, Credential, CredentialKind};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Account store backed by concurrent maps. Contents vanish on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<DashMap<String, Account>>,
    credentials: Arc<DashMap<String, Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, silo: &str, key: &str) -> Result<Option<Account>, AppError> {
        Ok(self
            .accounts
            .get(&document_id(silo, key))
            .map(|entry| entry.value().clone()))
    }

    async fn put_account(&self, account: &Account) -> Result<(), AppError> {
        self.accounts.insert(account.document_id(), account.clone());
        Ok(())
    }

    async fn get_credential(
        &self,
        kind: CredentialKind,
        id: &str,
    ) -> Result<Option<Credential>, AppError> {
        let auth_ref = AuthRef {
            kind,
            id: id.to_string(),
        };
        Ok(self
            .credentials
            .get(&auth_ref.document_id())
            .map(|entry| entry.value().clone()))
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), AppError> {
        self.credentials
            .insert(credential.auth_ref.document_id(), credential.clone());
        Ok(())
    }
}
