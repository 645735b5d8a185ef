//! Platform API configuration.

use serde::{Deserialize, Serialize};

/// Settings for the authenticated request client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform REST API. Overridable via the
    /// `STURDY__API__BASE_URL` environment variable; falls back to the
    /// local development default.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000/api".to_string()
}
