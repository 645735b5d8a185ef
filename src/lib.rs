//! CodeSturdy client — token management, authenticated API access, and
//! durable draft storage for the coding-education platform.
//!
//! The crates are wired here into one context object constructed at
//! startup and threaded through the application; none of the components
//! hold global state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

pub use sturdy_api::{ApiClient, FilePart, UploadForm};
pub use sturdy_auth::{RefreshResponse, TokenManager, TokenObserver, TokenStatus};
pub use sturdy_core::config::AppConfig;
pub use sturdy_core::{AppError, AppResult};
pub use sturdy_drafts::{DraftRecord, DraftStore, DraftSweeper};

/// The assembled client context: one instance per application run.
#[derive(Debug)]
pub struct CodeSturdy {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Access credential manager.
    pub auth: Arc<TokenManager>,
    /// Authenticated request client.
    pub api: ApiClient,
    /// Durable draft store.
    pub drafts: Arc<DraftStore>,
}

impl CodeSturdy {
    /// Builds every component from configuration.
    ///
    /// Restores any persisted access token, opens the draft store, and runs
    /// one opportunistic retention sweep. Draft-store failures degrade to a
    /// logged warning rather than failing startup; the editor falls back to
    /// default content.
    pub async fn initialize(config: AppConfig) -> AppResult<Self> {
        // One cookie-carrying client shared by the token manager and the
        // request client, so the refresh credential rides along untouched.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        let auth = Arc::new(TokenManager::new(&config.auth, http.clone()));
        match auth.restore_auth() {
            Ok(Some(_)) => tracing::info!("Restored authenticated session"),
            Ok(None) => tracing::debug!("No usable persisted token, starting logged out"),
            Err(e) => tracing::warn!(error = %e, "Token restore failed, starting logged out"),
        }

        let api = ApiClient::new(&config.api, Arc::clone(&auth), http);

        let drafts = Arc::new(DraftStore::new(&config.drafts));
        if let Err(e) = drafts.init().await {
            tracing::warn!(error = %e, "Draft store unavailable, editor will use defaults");
        } else {
            match drafts.cleanup_old_data().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Startup draft cleanup complete"),
                Err(e) => tracing::warn!(error = %e, "Startup draft cleanup failed"),
            }
        }

        Ok(Self {
            config,
            auth,
            api,
            drafts,
        })
    }

    /// Spawns the background draft sweeper. Returns the cancel handle; send
    /// `true` to stop it.
    pub fn spawn_draft_sweeper(&self) -> watch::Sender<bool> {
        let sweeper = DraftSweeper::new(Arc::clone(&self.drafts), &self.config.drafts);
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move { sweeper.run(rx).await });
        tx
    }
}

/// Initialize tracing/logging from configuration.
pub fn init_logging(config: &sturdy_core::config::logging::LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}
