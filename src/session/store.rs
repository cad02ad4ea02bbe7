//! Durable Session Store
//!
//! Persists the auth token as a single `token` file inside the state
//! directory and notifies subscribers on every change. Writes go through
//! a temp file and rename so a crash never leaves a half-written token.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use super::token::Token;

const TOKEN_FILE: &str = "token";

/// Session store for one client context
///
/// Cheap to clone; all clones share the same underlying state and
/// notification channel.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    /// Path of the persisted token file; `None` for ephemeral sessions
    path: Option<PathBuf>,
    /// Current token, observable by subscribers
    tx: watch::Sender<Option<Token>>,
}

impl Session {
    /// Open a session backed by the given state directory
    ///
    /// Creates the directory if needed and loads any previously persisted
    /// token, so a login survives process restarts.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SessionError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| SessionError::Io {
            path: dir.to_path_buf(),
            error: e.to_string(),
        })?;

        let path = dir.join(TOKEN_FILE);
        let initial = read_token(&path)?;
        let (tx, _) = watch::channel(initial);

        Ok(Self {
            inner: Arc::new(SessionInner {
                path: Some(path),
                tx,
            }),
        })
    }

    /// Create a memory-only session that never touches the filesystem
    pub fn ephemeral() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner { path: None, tx }),
        }
    }

    /// The current token, if authenticated
    pub fn token(&self) -> Option<Token> {
        self.inner.tx.borrow().clone()
    }

    /// Whether a token is present
    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().is_some()
    }

    /// Store a token, persisting it before notifying subscribers
    pub fn set(&self, token: Token) -> Result<(), SessionError> {
        if let Some(path) = &self.inner.path {
            write_token(path, &token)?;
        }
        self.inner.tx.send_replace(Some(token));
        tracing::debug!("Session token stored");
        Ok(())
    }

    /// Drop the token and delete the persisted copy
    ///
    /// Used by logout and by the API client when the backend rejects the
    /// token with a 401.
    pub fn clear(&self) -> Result<(), SessionError> {
        if let Some(path) = &self.inner.path {
            match std::fs::remove_file(path) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SessionError::Io {
                        path: path.clone(),
                        error: e.to_string(),
                    })
                }
            }
        }
        self.inner.tx.send_replace(None);
        tracing::debug!("Session token cleared");
        Ok(())
    }

    /// Subscribe to token changes
    ///
    /// The receiver observes every login, logout, and 401-triggered
    /// invalidation. Route guards and the live-sync channel use this to
    /// react without polling.
    pub fn subscribe(&self) -> watch::Receiver<Option<Token>> {
        self.inner.tx.subscribe()
    }
}

fn read_token(path: &Path) -> Result<Option<Token>, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Token::new(trimmed)))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SessionError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
    }
}

fn write_token(path: &Path, token: &Token) -> Result<(), SessionError> {
    let tmp = path.with_extension("tmp");
    let io_err = |e: std::io::Error| SessionError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    std::fs::write(&tmp, token.as_str()).map_err(io_err)?;

    // Owner-only: the token grants account access
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }

    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Session store errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage error at {path:?}: {error}")]
    Io { path: PathBuf, error: String },
}
