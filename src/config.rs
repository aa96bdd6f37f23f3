// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; the HMAC key for OAuth state tokens is
//! the only required secret.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Public base URL of this service, used for local redirects and as the
    /// IndieAuth client ID.
    pub public_url: String,
    /// Server port
    pub port: u16,
    /// IndieAuth authorization endpoint used when a site advertises none
    pub indieauth_endpoint: String,
    /// Base URL for Instagram profile lookups
    pub instagram_base_url: String,
    /// Bluesky PDS used for app password logins
    pub bluesky_pds_url: String,
    /// Bluesky AppView used for public profile lookups
    pub bluesky_appview_url: String,
    /// GCP project ID; accounts are kept in memory when unset
    pub gcp_project_id: Option<String>,
    /// Timeout for every outbound HTTP request
    pub http_timeout: Duration,
    /// Maximum age of an OAuth state token
    pub state_max_age: Duration,

    // --- Secrets ---
    /// HMAC key for OAuth state tokens (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            public_url: "http://localhost".to_string(),
            port: 8080,
            indieauth_endpoint: "https://indieauth.com/auth".to_string(),
            instagram_base_url: "https://www.instagram.com".to_string(),
            bluesky_pds_url: "https://bsky.social".to_string(),
            bluesky_appview_url: "https://public.api.bsky.app".to_string(),
            gcp_project_id: None,
            http_timeout: Duration::from_secs(10),
            state_max_age: Duration::from_secs(3600),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }
}

impl Config {
    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            public_url: env::var("PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            port: parse_or("PORT", 8080)?,
            indieauth_endpoint: env::var("INDIEAUTH_ENDPOINT")
                .unwrap_or_else(|_| "https://indieauth.com/auth".to_string()),
            instagram_base_url: env::var("INSTAGRAM_BASE_URL")
                .unwrap_or_else(|_| "https://www.instagram.com".to_string()),
            bluesky_pds_url: env::var("BLUESKY_PDS_URL")
                .unwrap_or_else(|_| "https://bsky.social".to_string()),
            bluesky_appview_url: env::var("BLUESKY_APPVIEW_URL")
                .unwrap_or_else(|_| "https://public.api.bsky.app".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").ok().filter(|v| !v.is_empty()),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)?),
            state_max_age: Duration::from_secs(parse_or("STATE_MAX_AGE_SECS", 3600)?),

            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map(|v| v.trim().as_bytes().to_vec())
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?,
        })
    }

    /// Redirect URI registered with IndieAuth for the given silo.
    pub fn callback_url(&self, silo: &str) -> String {
        format!("{}/{}/callback", self.public_url, silo)
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("OAUTH_STATE_KEY", " test_state_key ");
        env::set_var("PUBLIC_URL", "https://brid.gy/");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.oauth_state_key, b"test_state_key".to_vec());
        assert_eq!(config.public_url, "https://brid.gy");
        assert_eq!(config.port, 8080);
        assert_eq!(config.callback_url("instagram"), "https://brid.gy/instagram/callback");
    }
}
