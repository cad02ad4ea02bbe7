//! REST API Client
//!
//! HTTP client for the out-pass backend. All paths are relative to
//! `<backend>/api`. The client holds an injected [`Session`] and reads
//! the bearer token from it on every authenticated call, so a login in
//! one component is immediately visible to all others.
//!
//! A 401 on an authenticated call means the stored token is no longer
//! valid: the client clears the session (subscribers observe the logout)
//! and surfaces [`ClientError::SessionExpired`]. A 401 on `login` or
//! `register` is a plain credential failure and leaves the session alone.

pub mod dto;
pub mod error;

pub use dto::{
    ApiStatus, ErrorDetail, LoginCredentials, OutPassDraft, OutPassRequest, PassStatus,
    RegisterProfile, TokenResponse,
};
pub use error::{ClientError, ClientResult};

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::session::Session;

/// Out-pass backend client
pub struct ApiClient {
    client: reqwest::Client,
    /// Base URL including the `/api` prefix
    base_url: String,
    session: Session,
    config: ClientConfig,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin (e.g. "http://localhost:8000"), without `/api`
    pub backend_url: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ApiClient {
    /// Create a new client with the given configuration and session
    pub fn new(config: ClientConfig, session: Session) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let base_url = format!("{}/api", config.backend_url.trim_end_matches('/'));

        Ok(Self {
            client,
            base_url,
            session,
            config,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session this client reads its token from
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Exchange credentials for a token
    ///
    /// The caller decides whether to persist the token in the session;
    /// the client itself never writes on success.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        let body = LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json("/auth/login", &body, false).await
    }

    /// Create an account and receive a token
    pub async fn register(&self, profile: &RegisterProfile) -> ClientResult<TokenResponse> {
        self.post_json("/auth/register", profile, false).await
    }

    /// Submit a new out-pass request
    ///
    /// The draft is validated locally first; a blank field fails without
    /// anything going over the wire.
    pub async fn create_request(&self, draft: &OutPassDraft) -> ClientResult<OutPassRequest> {
        draft.validate()?;
        self.post_json("/outpass/create", draft, true).await
    }

    /// Fetch the caller's requests, newest first as ordered by the backend
    pub async fn list_my_requests(&self) -> ClientResult<Vec<OutPassRequest>> {
        self.get_json("/outpass/myrequests").await
    }

    /// Backend root banner, used as a reachability probe
    pub async fn health(&self) -> ClientResult<ApiStatus> {
        self.get_json("/").await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, attach_token: bool) -> ClientResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        tracing::debug!(path, "POST");
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);

        let mut authenticated = false;
        if attach_token {
            if let Some(token) = self.session.token() {
                request = request.bearer_auth(token.as_str());
                authenticated = true;
            }
        }

        let response = request.send().await.map_err(error::from_transport)?;
        self.read_json(response, authenticated).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        tracing::debug!(path, "GET");
        let mut request = self.client.get(format!("{}{}", self.base_url, path));

        let mut authenticated = false;
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token.as_str());
            authenticated = true;
        }

        let response = request.send().await.map_err(error::from_transport)?;
        self.read_json(response, authenticated).await
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
        authenticated: bool,
    ) -> ClientResult<T> {
        if response.status().is_success() {
            response.json().await.map_err(error::from_transport)
        } else {
            Err(self.error_from(response, authenticated).await)
        }
    }

    /// Map a non-success response to a client error
    ///
    /// A 401 on a request that carried the stored token invalidates the
    /// session so every subscriber falls back to the login state.
    async fn error_from(&self, response: Response, authenticated: bool) -> ClientError {
        let status = response.status();
        let detail = parse_detail(response).await;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            if authenticated {
                if let Err(e) = self.session.clear() {
                    tracing::warn!(error = %e, "Failed to clear invalidated session");
                }
                tracing::info!("Backend rejected the stored token, session cleared");
                return ClientError::SessionExpired;
            }
            return ClientError::Auth(detail);
        }

        ClientError::Api {
            status: status.as_u16(),
            detail,
        }
    }
}

/// Extract the FastAPI-style `detail` message, falling back to the raw
/// body or the status reason
async fn parse_detail(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorDetail>(&text) {
        Ok(body) => body.detail,
        Err(_) => {
            if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text
            }
        }
    }
}
