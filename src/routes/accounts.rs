// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked account pages.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::AccountResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/account/{silo}/{key}", get(get_account))
}

/// Get a linked account.
async fn get_account(
    State(state): State<Arc<AppState>>,
    Path((silo, key)): Path<(String, String)>,
) -> Result<Json<AccountResponse>> {
    if state.providers.get(&silo).is_none() {
        return Err(AppError::NotFound(format!("Unknown silo: {}", silo)));
    }

    let account = state
        .accounts
        .store()
        .get_account(&silo, &key.to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {}:{}", silo, key)))?;

    Ok(Json(AccountResponse::from(account)))
}
