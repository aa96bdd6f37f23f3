// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Silo-Bridge: link Instagram and Bluesky accounts to personal web sites
//!
//! This crate verifies that a person logging in with their own web site owns
//! a silo account (rel-me links in both directions, or an app password), and
//! creates or refreshes the linked account record.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{
    AccountService, AuthCodeVerifier, CallbackOrchestrator, ProviderRegistry, SiteFetcher,
    StateCodec,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub providers: ProviderRegistry,
    pub accounts: AccountService,
    pub sites: Arc<dyn SiteFetcher>,
    pub auth_verifier: Arc<dyn AuthCodeVerifier>,
    pub state_codec: StateCodec,
    pub orchestrator: CallbackOrchestrator,
}
