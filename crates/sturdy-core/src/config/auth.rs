//! Authentication and token storage configuration.

use serde::{Deserialize, Serialize};

/// Settings for the token manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Full URL of the refresh endpoint. The refresh credential itself is
    /// carried by the HTTP client's cookie store and never configured here.
    #[serde(default = "default_refresh_url")]
    pub refresh_url: String,
    /// Path of the file mirroring the in-memory access token.
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_url: default_refresh_url(),
            token_path: default_token_path(),
        }
    }
}

fn default_refresh_url() -> String {
    "http://localhost:4000/auth/refresh".to_string()
}

fn default_token_path() -> String {
    "data/auth/access_token".to_string()
}
