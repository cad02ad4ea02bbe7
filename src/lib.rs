//! # Outpass
//!
//! Student out-pass portal client - durable sessions, a typed REST client
//! for the out-pass backend, and a live-sync channel that keeps the
//! request list current, plus a self-contained reference backend for
//! development and tests.
//!
//! ## Features
//!
//! - **Durable sessions**: Token persisted per profile directory, shared through watch channels
//! - **Typed REST client**: Login, registration, request submission and listing
//! - **Live-sync**: WebSocket pushes with exponential-backoff reconnect and poll fallback
//! - **Race-free refreshes**: Sequence-numbered fetches, only the newest result lands
//! - **Reference backend**: In-memory Axum server mirroring the production API
//!
//! ## Modules
//!
//! - [`session`]: Durable token store
//! - [`client`]: REST API client and wire types
//! - [`livesync`]: WebSocket change notifications
//! - [`feed`]: Watchable request list
//! - [`guard`]: Route access decisions
//! - [`server`]: Reference backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outpass::client::{ApiClient, ClientConfig};
//! use outpass::feed::RequestFeed;
//! use outpass::livesync::{LiveSyncChannel, LiveSyncConfig};
//! use outpass::session::{Session, Token};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open("./outpass_state")?;
//!     let client = ApiClient::new(ClientConfig::default(), session.clone())?;
//!
//!     let token = client.login("asha@hitam.org", "secret").await?;
//!     session.set(Token::new(token.access_token))?;
//!
//!     let feed = RequestFeed::new(client);
//!     let channel = LiveSyncChannel::new(LiveSyncConfig::default(), session);
//!     let (handle, events) = channel.start();
//!
//!     let mut snapshots = feed.subscribe();
//!     tokio::spawn({
//!         let feed = feed.clone();
//!         async move { feed.run(events).await }
//!     });
//!
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow_and_update().clone();
//!         println!("{} request(s)", snapshot.items.len());
//!     }
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod feed;
pub mod guard;
pub mod livesync;
pub mod server;
pub mod session;

// Re-export top-level types for convenience
pub use session::{Session, SessionError, Token};

pub use client::{
    ApiClient, ApiStatus, ClientConfig, ClientError, ClientResult, LoginCredentials, OutPassDraft,
    OutPassRequest, PassStatus, RegisterProfile, TokenResponse,
};

pub use livesync::{
    LiveSyncChannel, LiveSyncConfig, LiveSyncError, LiveSyncHandle, RefreshSource, SyncEvent,
};

pub use feed::{FeedSnapshot, RequestFeed};

pub use guard::{Access, AuthState, Route, RouteGuard};

pub use server::{build_router, serve, ApiError, AppState};

pub use config::{
    BackendConfig, Config, ConfigError, LiveSyncConfig as ConfigLiveSyncConfig, LoggingConfig,
    ServerConfig, StateConfig,
};
