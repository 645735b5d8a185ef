//! Shared test helpers: an in-process platform API stub and client wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::json;

use codesturdy::{ApiClient, TokenManager};
use sturdy_core::config::api::ApiConfig;
use sturdy_core::config::auth::AuthConfig;

/// Token the stub server accepts after a refresh.
pub const GOOD_TOKEN: &str = "fresh-token";

/// A running API stub with request counters.
pub struct TestServer {
    pub addr: SocketAddr,
    pub api_calls: Arc<AtomicUsize>,
    pub refresh_calls: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct ServerState {
    api_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    refresh_ok: bool,
    refresh_delay: Duration,
}

impl TestServer {
    /// Spawns the stub. `refresh_ok` controls whether the refresh endpoint
    /// mints a new token or rejects; `refresh_delay` widens the in-flight
    /// window for coalescing tests.
    pub async fn spawn(refresh_ok: bool, refresh_delay: Duration) -> Self {
        let api_calls = Arc::new(AtomicUsize::new(0));
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let state = ServerState {
            api_calls: Arc::clone(&api_calls),
            refresh_calls: Arc::clone(&refresh_calls),
            refresh_ok,
            refresh_delay,
        };

        let app = Router::new()
            .route("/api/judge/results", get(judge_results))
            .route("/api/submissions", post(submit))
            .route("/api/next-id", get(next_id))
            .route("/api/missing", get(missing))
            .route("/auth/refresh", post(refresh))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            api_calls,
            refresh_calls,
        }
    }

    /// Builds a token manager and API client pointed at this stub, with
    /// token persistence under `dir`.
    pub fn client(&self, dir: &tempfile::TempDir) -> (Arc<TokenManager>, ApiClient) {
        let http = reqwest::Client::builder().cookie_store(true).build().unwrap();

        let auth_config = AuthConfig {
            refresh_url: format!("http://{}/auth/refresh", self.addr),
            token_path: dir
                .path()
                .join("access_token")
                .to_string_lossy()
                .into_owned(),
        };
        let api_config = ApiConfig {
            base_url: format!("http://{}/api", self.addr),
        };

        let auth = Arc::new(TokenManager::new(&auth_config, http.clone()));
        let api = ApiClient::new(&api_config, Arc::clone(&auth), http);
        (auth, api)
    }

    pub fn api_call_count(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_call_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Unauthorized"})),
    )
        .into_response()
}

async fn judge_results(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers) != Some(GOOD_TOKEN) {
        return unauthorized();
    }
    Json(json!({"verdict": "AC", "runtimeMs": 12})).into_response()
}

async fn submit(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers) != Some(GOOD_TOKEN) {
        return unauthorized();
    }
    Json(json!({"submissionId": 512, "status": "queued"})).into_response()
}

async fn next_id(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers) != Some(GOOD_TOKEN) {
        return unauthorized();
    }
    // Plain-text numeric identifier, as a few platform endpoints return.
    ([("content-type", "text/plain")], "1234").into_response()
}

async fn missing(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers) != Some(GOOD_TOKEN) {
        return unauthorized();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Problem not found"})),
    )
        .into_response()
}

async fn refresh(State(state): State<ServerState>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.refresh_delay).await;
    if state.refresh_ok {
        Json(json!({
            "accessToken": GOOD_TOKEN,
            "user": {"id": 9, "username": "student"},
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Refresh token invalid"})),
        )
            .into_response()
    }
}
