// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod account;
pub mod profile;

pub use account::{Account, AccountResponse, AuthRef, Credential, CredentialKind, Feature};
pub use profile::{AuthClaim, SiloProfile, VerifiedProfile};
