//! Live-Sync Channel
//!
//! Real-time change notifications from the backend, with graceful
//! degradation when the network misbehaves.
//!
//! # Architecture
//!
//! - **Channel** (`channel.rs`): Owns the WebSocket connection lifecycle.
//!   Reconnects with exponential backoff, polls while disconnected, and
//!   follows session token changes.
//! - **Messages** (`messages.rs`): Wire frame types and the events the
//!   channel emits to its consumer.
//!
//! # Example
//!
//! ```rust,no_run
//! use outpass::livesync::{LiveSyncChannel, LiveSyncConfig, SyncEvent};
//! use outpass::session::Session;
//!
//! # async fn example() {
//! let session = Session::ephemeral();
//! let channel = LiveSyncChannel::new(LiveSyncConfig::default(), session);
//! let (handle, mut events) = channel.start();
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SyncEvent::Refresh(_) => { /* re-fetch the request list */ }
//!         SyncEvent::SessionEnded => break,
//!         _ => {}
//!     }
//! }
//! handle.stop().await;
//! # }
//! ```

mod channel;
mod messages;

pub use channel::{LiveSyncChannel, LiveSyncConfig, LiveSyncError, LiveSyncHandle};
pub use messages::{ClientFrame, RefreshSource, ServerFrame, SyncEvent};
