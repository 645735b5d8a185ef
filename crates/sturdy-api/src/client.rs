//! The authenticated request client.
//!
//! Wraps outgoing calls to the platform API: attaches the current bearer
//! token, and on a 401 performs exactly one refresh-and-retry cycle before
//! surfacing failure. Callers redirect to the login flow on an
//! authentication error; no further automatic retries happen here.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use sturdy_auth::TokenManager;
use sturdy_core::config::api::ApiConfig;
use sturdy_core::error::{AppError, ErrorKind};
use sturdy_core::result::AppResult;

use crate::multipart::UploadForm;
use crate::response;

const AUTH_EXPIRED: &str = "Authentication expired, please log in again";

/// Performs HTTP calls against the platform API with transparent
/// credential attachment and a bounded retry-on-expiry policy.
#[derive(Clone)]
pub struct ApiClient {
    /// Shared HTTP client (same cookie store as the token manager).
    http: reqwest::Client,
    /// Base URL every path is appended to.
    base_url: String,
    /// Token manager consulted for the bearer token and refreshes.
    auth: Arc<TokenManager>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client from API configuration, the token manager, and the
    /// shared HTTP client.
    pub fn new(config: &ApiConfig, auth: Arc<TokenManager>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Issues a JSON request and interprets the response body.
    ///
    /// A 401 triggers one refresh; on refresh success the call is retried
    /// once with the new token and that outcome is final. On refresh
    /// failure the stored credentials are already cleared and an
    /// authentication error is returned.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> AppResult<Value> {
        let response = self
            .send_json(method.clone(), path, body, self.auth.access_token())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::handle_response(response).await;
        }

        tracing::debug!(path, "Received 401, attempting token refresh");
        let refreshed = match self.auth.refresh_token().await {
            Ok(refreshed) => refreshed,
            Err(_) => return Err(AppError::authentication(AUTH_EXPIRED)),
        };

        let retried = self
            .send_json(method, path, body, Some(refreshed.access_token))
            .await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::authentication(AUTH_EXPIRED));
        }
        Self::handle_response(retried).await
    }

    /// `GET` convenience wrapper.
    pub async fn get(&self, path: &str) -> AppResult<Value> {
        self.request(Method::GET, path, None).await
    }

    /// `POST` convenience wrapper.
    pub async fn post(&self, path: &str, body: &Value) -> AppResult<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// `PUT` convenience wrapper.
    pub async fn put(&self, path: &str, body: &Value) -> AppResult<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// `DELETE` convenience wrapper.
    pub async fn delete(&self, path: &str) -> AppResult<Value> {
        self.request(Method::DELETE, path, None).await
    }

    /// Issues a request and deserializes the response into a typed value.
    pub async fn request_as<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> AppResult<T> {
        let value = self.request(method, path, body).await?;
        serde_json::from_value(value).map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Unexpected response shape", e)
        })
    }

    /// Submits a multipart form (file upload) under the same token-attach
    /// and single-refresh-retry contract as [`request`](Self::request).
    ///
    /// No JSON content type is set; the transport chooses the multipart
    /// boundary.
    pub async fn upload(&self, path: &str, form: &UploadForm) -> AppResult<Value> {
        let response = self
            .send_multipart(path, form, self.auth.access_token())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::handle_response(response).await;
        }

        tracing::debug!(path, "Upload received 401, attempting token refresh");
        let refreshed = match self.auth.refresh_token().await {
            Ok(refreshed) => refreshed,
            Err(_) => return Err(AppError::authentication(AUTH_EXPIRED)),
        };

        let retried = self
            .send_multipart(path, form, Some(refreshed.access_token))
            .await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::authentication(AUTH_EXPIRED));
        }
        Self::handle_response(retried).await
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<String>,
    ) -> AppResult<reqwest::Response> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Http, "Request failed", e))
    }

    async fn send_multipart(
        &self,
        path: &str,
        form: &UploadForm,
        token: Option<String>,
    ) -> AppResult<reqwest::Response> {
        let mut request = self.http.post(self.url(path)).multipart(form.to_form()?);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Http, "Upload failed", e))
    }

    async fn handle_response(response: reqwest::Response) -> AppResult<Value> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response
            .text()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Http, "Failed to read response body", e))?;

        if !status.is_success() {
            return Err(AppError::http(response::error_message(status, &text)));
        }

        response::parse_success_body(content_type.as_deref(), &text)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
