// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Silo login routes: start forms, IndieAuth redirect and login callbacks.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::services::indieauth::{authorization_url, same_identity, CodeCheck};
use crate::services::orchestrator::INVALID_STATE_MESSAGE;
use crate::services::{LoginFlow, OAuthState, SignupState, SiloProvider, SiteFetchError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{silo}/start", get(start_page).post(start))
        .route("/{silo}/callback", get(callback_get).post(callback_post))
}

/// Signup API parameters accepted by the start form.
#[derive(Debug, Default, Deserialize)]
pub struct SignupParams {
    #[serde(default)]
    callback: Option<String>,
    #[serde(default)]
    feature: Option<String>,
    #[serde(default)]
    operation: Option<String>,
}

/// Personal site login form.
#[derive(Debug, Deserialize, Validate)]
pub struct StartForm {
    #[serde(default)]
    #[validate(url)]
    user_url: String,
    #[serde(default)]
    callback: Option<String>,
    #[serde(default)]
    feature: Option<String>,
    #[serde(default)]
    operation: Option<String>,
}

impl StartForm {
    fn signup(&self) -> SignupState {
        SignupState {
            callback: self.callback.clone(),
            feature: self.feature.clone(),
            operation: self.operation.clone(),
            user_url: Some(self.user_url.trim().to_string()),
        }
    }
}

/// Everything a callback may carry: IndieAuth redirect parameters, or an
/// app password form with its signup fields.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    callback: Option<String>,
    #[serde(default)]
    feature: Option<String>,
    #[serde(default)]
    operation: Option<String>,
}

fn provider(state: &AppState, silo: &str) -> Result<Arc<dyn SiloProvider>> {
    state
        .providers
        .get(silo)
        .ok_or_else(|| AppError::NotFound(format!("Unknown silo: {}", silo)))
}

/// 302 to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Login form for a silo.
async fn start_page(
    State(state): State<Arc<AppState>>,
    Path(silo): Path<String>,
    Query(params): Query<SignupParams>,
) -> Result<Html<String>> {
    let provider = provider(&state, &silo)?;
    Ok(Html(render_start_form(provider.as_ref(), &params)))
}

/// Begin a personal site login: discover the authorization endpoint and
/// redirect to it with a signed state token.
async fn start(
    State(state): State<Arc<AppState>>,
    Path(silo): Path<String>,
    Form(form): Form<StartForm>,
) -> Result<Response> {
    let provider = provider(&state, &silo)?;

    // The signup API posts here for every silo; app password silos answer
    // with their own form.
    if provider.login_flow() == LoginFlow::AppPassword {
        let params = SignupParams {
            callback: form.callback,
            feature: form.feature,
            operation: form.operation,
        };
        return Ok(Html(render_start_form(provider.as_ref(), &params)).into_response());
    }

    let me = form.user_url.trim().to_string();
    if form.validate().is_err() {
        let message = format!(
            "Couldn't fetch your web site: {}",
            SiteFetchError::InvalidUrl(me.clone())
        );
        return Ok(found(state.orchestrator.local_failure(message).redirect()));
    }

    let page = match state.sites.fetch(&me).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(silo = %silo, me = %me, error = %e, "Couldn't fetch personal site");
            let message = format!("Couldn't fetch your web site: {}", e);
            return Ok(found(state.orchestrator.local_failure(message).redirect()));
        }
    };

    let endpoint = page
        .authorization_endpoint
        .unwrap_or_else(|| state.config.indieauth_endpoint.clone());

    let signup = form.signup();
    let inner = signup
        .encode()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Signup state encoding failed: {}", e)))?;
    let token = state
        .state_codec
        .encode(&OAuthState {
            endpoint: endpoint.clone(),
            me: me.clone(),
            state: Some(inner),
        })
        .map_err(|e| AppError::Internal(anyhow::anyhow!("State encoding failed: {}", e)))?;

    let auth_url = authorization_url(
        &endpoint,
        &me,
        &state.config.public_url,
        &state.config.callback_url(&silo),
        &token,
    )
    .map_err(|e| AppError::BadRequest(format!("Invalid authorization endpoint {}: {}", endpoint, e)))?;

    tracing::info!(
        silo = %silo,
        me = %me,
        endpoint = %endpoint,
        "Starting IndieAuth login"
    );

    Ok(found(&auth_url))
}

/// IndieAuth redirect target. App passwords are only accepted by POST so
/// they never appear in a URL.
async fn callback_get(
    State(state): State<Arc<AppState>>,
    Path(silo): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if provider(&state, &silo)?.login_flow() == LoginFlow::AppPassword {
        tracing::warn!(silo = %silo, "Rejected app password login over GET");
        return Ok((StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")]).into_response());
    }
    handle_callback(&state, &silo, params).await
}

async fn callback_post(
    State(state): State<Arc<AppState>>,
    Path(silo): Path<String>,
    Form(params): Form<CallbackParams>,
) -> Result<Response> {
    handle_callback(&state, &silo, params).await
}

/// Complete a login. Every outcome, good or bad, is a 302.
async fn handle_callback(state: &AppState, silo: &str, params: CallbackParams) -> Result<Response> {
    let provider = provider(state, silo)?;
    let orchestrator = &state.orchestrator;

    let outcome = match provider.login_flow() {
        LoginFlow::AppPassword => {
            let signup = SignupState {
                callback: params.callback,
                feature: params.feature,
                operation: params.operation,
                user_url: None,
            };
            let handle = params.handle.unwrap_or_default();
            let password = params.password.unwrap_or_default();
            orchestrator
                .complete_app_password(provider.as_ref(), &handle, &password, &signup)
                .await
        }
        LoginFlow::IndieAuth => {
            let Some(token) = params.state.filter(|s| !s.trim().is_empty()) else {
                tracing::warn!(silo, "Callback without state");
                return Ok(found(orchestrator.local_failure(INVALID_STATE_MESSAGE).redirect()));
            };
            let oauth = match state.state_codec.decode(&token) {
                Ok(oauth) => oauth,
                Err(e) => {
                    tracing::warn!(silo, error = %e, "Invalid OAuth state");
                    return Ok(found(orchestrator.local_failure(INVALID_STATE_MESSAGE).redirect()));
                }
            };
            let signup = SignupState::decode(oauth.state.as_deref());

            match (params.error, params.code) {
                (None, Some(code)) => {
                    let check = CodeCheck {
                        endpoint: oauth.endpoint,
                        code,
                        me: oauth.me,
                        state: token,
                        client_id: state.config.public_url.clone(),
                        redirect_uri: state.config.callback_url(silo),
                    };
                    match state.auth_verifier.verify_code(&check).await {
                        Ok(me) if same_identity(&check.me, &me) => {
                            orchestrator
                                .complete_indieauth(provider.as_ref(), &check.me, &signup)
                                .await
                        }
                        Ok(me) => {
                            tracing::warn!(
                                silo,
                                claimed = %check.me,
                                confirmed = %me,
                                endpoint = %check.endpoint,
                                "Authorization endpoint confirmed a different identity"
                            );
                            orchestrator.declined(&signup)
                        }
                        Err(e) => {
                            tracing::warn!(silo, me = %check.me, error = %e, "Authorization code not accepted");
                            orchestrator.declined(&signup)
                        }
                    }
                }
                (error, _) => {
                    tracing::info!(silo, error = ?error, "Login declined");
                    orchestrator.declined(&signup)
                }
            }
        }
    };

    Ok(found(outcome.redirect()))
}

fn render_start_form(provider: &dyn SiloProvider, params: &SignupParams) -> String {
    let silo = provider.name();
    let label = escape_html(provider.label());
    let hidden = [
        ("callback", &params.callback),
        ("feature", &params.feature),
        ("operation", &params.operation),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value.as_deref().map(|v| {
            format!(
                r#"<input type="hidden" name="{}" value="{}">"#,
                name,
                escape_html(v)
            )
        })
    })
    .collect::<Vec<_>>()
    .join("\n    ");

    let fields = match provider.login_flow() {
        LoginFlow::IndieAuth => format!(
            r#"<form method="post" action="/{silo}/start">
    <label>Your web site <input type="url" name="user_url" required placeholder="https://example.com/"></label>
    {hidden}
    <button type="submit">Connect {label}</button>
  </form>
  <p>Your site needs a rel="me" link to your {label} profile, and your {label} profile needs a link back to your site.</p>"#
        ),
        LoginFlow::AppPassword => format!(
            r#"<form method="post" action="/{silo}/callback">
    <label>Handle <input type="text" name="handle" required placeholder="you.bsky.social"></label>
    <label>App password <input type="password" name="password" required></label>
    {hidden}
    <button type="submit">Connect {label}</button>
  </form>"#
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Connect {label}</title></head>
<body>
  <h1>Connect {label}</h1>
  {fields}
</body>
</html>
"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
