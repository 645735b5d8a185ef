//! Token manager: the single source of truth for the access credential.
//!
//! Wraps the write-through [`TokenStore`] with the refresh exchange against
//! the platform. The refresh credential itself is an http-only cookie
//! carried by the shared HTTP client's cookie store; this code never sees
//! it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use futures::FutureExt;
use futures::future::Shared;
use reqwest::header::CONTENT_TYPE;

use sturdy_core::config::auth::AuthConfig;
use sturdy_core::error::{AppError, ErrorKind};
use sturdy_core::result::AppResult;

use crate::claims::{self, TokenStatus};
use crate::observer::TokenObserver;
use crate::store::TokenStore;

/// Payload returned by a successful refresh exchange.
///
/// The platform guarantees at least `accessToken`; anything else it sends
/// (user profile, role) is passed through to the registered observer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RefreshResponse {
    /// The freshly minted access token.
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Remaining fields of the server payload.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

type RefreshFuture = Pin<Box<dyn Future<Output = Result<RefreshResponse, AppError>> + Send>>;
type SharedRefresh = Shared<RefreshFuture>;

/// Manages the access credential: storage, validity, and refresh.
pub struct TokenManager {
    /// Write-through token storage.
    store: TokenStore,
    /// Cookie-carrying HTTP client shared with the request client.
    http: reqwest::Client,
    /// Full URL of the refresh endpoint.
    refresh_url: String,
    /// Registered lifecycle observer, if any.
    observer: RwLock<Option<Arc<dyn TokenObserver>>>,
    /// In-flight refresh slot. Concurrent refresh attempts share the one
    /// pending exchange instead of each issuing their own.
    pending_refresh: Mutex<Option<SharedRefresh>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("refresh_url", &self.refresh_url)
            .finish()
    }
}

impl TokenManager {
    /// Creates a manager from auth configuration and the shared HTTP client.
    ///
    /// The client must have been built with a cookie store, otherwise the
    /// refresh credential is never sent.
    pub fn new(config: &AuthConfig, http: reqwest::Client) -> Self {
        Self {
            store: TokenStore::new(config),
            http,
            refresh_url: config.refresh_url.clone(),
            observer: RwLock::new(None),
            pending_refresh: Mutex::new(None),
        }
    }

    /// Registers the lifecycle observer, replacing any previous one.
    pub fn set_observer(&self, observer: Arc<dyn TokenObserver>) {
        *self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(observer);
    }

    /// Stores a token (memory + disk); `None` clears both.
    pub fn set_access_token(&self, token: Option<&str>) -> AppResult<()> {
        self.store.set(token)
    }

    /// Returns the in-memory access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.store.get()
    }

    /// Clears the stored access token everywhere.
    pub fn clear_tokens(&self) -> AppResult<()> {
        self.store.set(None)
    }

    /// True iff a token is held and its expiry is strictly in the future.
    pub fn is_token_valid(&self) -> bool {
        self.store
            .get()
            .is_some_and(|token| matches!(claims::inspect(&token), TokenStatus::Valid { .. }))
    }

    /// Adopts a persisted token on startup.
    ///
    /// Returns the token iff one was persisted and is still valid; an
    /// expired or unreadable persisted token leaves the manager logged out.
    /// This is the only path by which a restarted client regains an
    /// authenticated state without a fresh login.
    pub fn restore_auth(&self) -> AppResult<Option<String>> {
        let Some(token) = self.store.load_persisted()? else {
            return Ok(None);
        };
        match claims::inspect(&token) {
            TokenStatus::Valid { expires_at } => {
                self.store.set(Some(&token))?;
                tracing::debug!(%expires_at, "Restored persisted access token");
                Ok(Some(token))
            }
            status => {
                tracing::debug!(?status, "Persisted access token is unusable, ignoring");
                Ok(None)
            }
        }
    }

    /// Exchanges the cookie-borne refresh credential for a new access token.
    ///
    /// On success the new token is stored and the observer's `on_refreshed`
    /// fires. On any failure the stored token is cleared, `on_expired`
    /// fires, and the error propagates to the caller.
    ///
    /// Concurrent callers are coalesced: whoever finds a refresh already in
    /// flight awaits its shared outcome instead of issuing a second
    /// exchange.
    pub async fn refresh_token(&self) -> AppResult<RefreshResponse> {
        let fut = {
            let mut slot = self.pending_slot();
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let fut: RefreshFuture = Self::perform_refresh(
                        self.http.clone(),
                        self.refresh_url.clone(),
                        self.store.clone(),
                        self.current_observer(),
                    )
                    .boxed();
                    let shared = fut.shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        let result = fut.clone().await;

        // Only the slot that produced this outcome is cleared; a newer
        // in-flight refresh started by someone else stays put.
        let mut slot = self.pending_slot();
        if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&fut)) {
            *slot = None;
        }

        result
    }

    async fn perform_refresh(
        http: reqwest::Client,
        refresh_url: String,
        store: TokenStore,
        observer: Option<Arc<dyn TokenObserver>>,
    ) -> Result<RefreshResponse, AppError> {
        // No bearer header here: the whole point is that the access token
        // may be gone, and the cookie store carries the refresh credential.
        let outcome = async {
            let response = http
                .post(&refresh_url)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Authentication, "Refresh request failed", e)
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::authentication(format!(
                    "Refresh rejected with status {status}"
                )));
            }

            response.json::<RefreshResponse>().await.map_err(|e| {
                AppError::with_source(ErrorKind::Authentication, "Malformed refresh response", e)
            })
        }
        .await;

        match outcome {
            Ok(payload) => {
                store.set(Some(&payload.access_token))?;
                tracing::debug!("Access token refreshed");
                if let Some(observer) = observer {
                    observer.on_refreshed(&payload);
                }
                Ok(payload)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing credentials");
                if let Err(clear_err) = store.set(None) {
                    tracing::warn!(error = %clear_err, "Failed to clear token after refresh failure");
                }
                if let Some(observer) = observer {
                    observer.on_expired();
                }
                Err(e)
            }
        }
    }

    fn current_observer(&self) -> Option<Arc<dyn TokenObserver>> {
        self.observer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn pending_slot(&self) -> std::sync::MutexGuard<'_, Option<SharedRefresh>> {
        self.pending_refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn make_manager(dir: &tempfile::TempDir) -> TokenManager {
        let config = AuthConfig {
            // Nothing listens here; connection attempts fail fast.
            refresh_url: "http://127.0.0.1:9/auth/refresh".to_string(),
            token_path: dir
                .path()
                .join("access_token")
                .to_string_lossy()
                .into_owned(),
        };
        TokenManager::new(&config, reqwest::Client::new())
    }

    fn token_with_exp(exp: i64) -> String {
        let claims = serde_json::json!({ "sub": "student-1", "exp": exp });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[derive(Default)]
    struct RecordingObserver {
        refreshed: AtomicBool,
        expired: AtomicBool,
    }

    impl TokenObserver for RecordingObserver {
        fn on_refreshed(&self, _response: &RefreshResponse) {
            self.refreshed.store(true, Ordering::SeqCst);
        }
        fn on_expired(&self) {
            self.expired.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_is_token_valid_tracks_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(&dir);

        assert!(!manager.is_token_valid());

        let fresh = token_with_exp(Utc::now().timestamp() + 600);
        manager.set_access_token(Some(&fresh)).unwrap();
        assert!(manager.is_token_valid());

        let stale = token_with_exp(Utc::now().timestamp() - 600);
        manager.set_access_token(Some(&stale)).unwrap();
        assert!(!manager.is_token_valid());
    }

    #[test]
    fn test_restore_auth_adopts_valid_token() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = token_with_exp(Utc::now().timestamp() + 600);

        {
            let manager = make_manager(&dir);
            manager.set_access_token(Some(&fresh)).unwrap();
        }

        let manager = make_manager(&dir);
        assert_eq!(manager.access_token(), None);
        let restored = manager.restore_auth().unwrap();
        assert_eq!(restored, Some(fresh.clone()));
        assert_eq!(manager.access_token(), Some(fresh));
    }

    #[test]
    fn test_restore_auth_ignores_expired_token() {
        let dir = tempfile::tempdir().unwrap();
        let stale = token_with_exp(Utc::now().timestamp() - 600);

        {
            let manager = make_manager(&dir);
            manager.set_access_token(Some(&stale)).unwrap();
        }

        let manager = make_manager(&dir);
        assert_eq!(manager.restore_auth().unwrap(), None);
        assert_eq!(manager.access_token(), None);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_state_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager(&dir);
        let observer = Arc::new(RecordingObserver::default());
        manager.set_observer(observer.clone());

        let fresh = token_with_exp(Utc::now().timestamp() + 600);
        manager.set_access_token(Some(&fresh)).unwrap();

        let result = manager.refresh_token().await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind, ErrorKind::Authentication);
        assert_eq!(manager.access_token(), None);
        assert!(observer.expired.load(Ordering::SeqCst));
        assert!(!observer.refreshed.load(Ordering::SeqCst));
    }
}
