//! Client Error Types
//!
//! Maps transport failures and backend error responses into a typed
//! taxonomy. Auth failures are split in two: bad credentials on login
//! (`Auth`) versus a rejected stored token (`SessionExpired`), which
//! also invalidates the session store.

use thiserror::Error;

use crate::session::SessionError;

/// Errors that can occur when talking to the out-pass backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// Credentials rejected (401 on an unauthenticated call)
    #[error("{0}")]
    Auth(String),

    /// The stored token was rejected; the session has been cleared
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Request rejected locally before anything was sent
    #[error("{0}")]
    Validation(String),

    /// Backend returned a non-success status
    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Backend unreachable
    #[error("Backend unavailable")]
    Unavailable,

    /// Other transport failure
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Response payload could not be decoded
    #[error("Malformed response payload: {0}")]
    Decode(String),

    /// Session store failure
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Classify a reqwest error
pub(crate) fn from_transport(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else if e.is_connect() {
        ClientError::Unavailable
    } else if e.is_decode() {
        ClientError::Decode(e.to_string())
    } else {
        ClientError::Network(e)
    }
}
