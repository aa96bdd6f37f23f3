// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Silo-Bridge API Server
//!
//! Links Instagram and Bluesky accounts to the personal web sites of the
//! people who own them.

use silo_bridge::{
    config::Config,
    db::{AccountStore, FirestoreDb, MemoryStore},
    services::{
        AccountService, BlueskyProvider, CallbackOrchestrator, HttpSiteFetcher, IndieAuthClient,
        InstagramProvider, ProviderRegistry, StateCodec,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, public_url = %config.public_url, "Starting Silo-Bridge");

    // Account storage: Firestore in production, in-process otherwise
    let store: Arc<dyn AccountStore> = match &config.gcp_project_id {
        Some(project_id) => Arc::new(FirestoreDb::new(project_id).await?),
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, keeping accounts in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let accounts = AccountService::new(store);

    let providers = ProviderRegistry::new()
        .with(Arc::new(InstagramProvider::new(
            &config.instagram_base_url,
            config.http_timeout,
        )?))
        .with(Arc::new(BlueskyProvider::new(
            &config.bluesky_pds_url,
            &config.bluesky_appview_url,
            config.http_timeout,
        )?));
    tracing::info!(
        silos = ?providers.names().collect::<Vec<_>>(),
        "Silo providers registered"
    );

    let sites = Arc::new(HttpSiteFetcher::new(config.http_timeout)?);
    let auth_verifier = Arc::new(IndieAuthClient::new(config.http_timeout)?);
    let state_codec = StateCodec::new(&config.oauth_state_key, config.state_max_age);
    let orchestrator = CallbackOrchestrator::new(sites.clone(), accounts.clone(), &config.public_url);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        providers,
        accounts,
        sites,
        auth_verifier,
        state_codec,
        orchestrator,
    });

    // Build router
    let app = silo_bridge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("silo_bridge=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
