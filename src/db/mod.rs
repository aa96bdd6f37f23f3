// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, or in-memory for development and tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Account, Credential, CredentialKind};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Linked silo accounts (keyed by `{silo}:{key}`)
    pub const ACCOUNTS: &str = "accounts";
    /// Login credentials (keyed by `{kind}:{id}`)
    pub const CREDENTIALS: &str = "credentials";
}

/// Persistence for accounts and their credentials.
///
/// Writes are whole-document and last-write-wins per key.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, silo: &str, key: &str) -> Result<Option<Account>, AppError>;

    async fn put_account(&self, account: &Account) -> Result<(), AppError>;

    async fn get_credential(
        &self,
        kind: CredentialKind,
        id: &str,
    ) -> Result<Option<Credential>, AppError>;

    async fn put_credential(&self, credential: &Credential) -> Result<(), AppError>;
}
