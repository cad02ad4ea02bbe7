//! Session Store
//!
//! Holds the auth token for one client context and persists it across
//! process restarts.
//!
//! ## Architecture
//!
//! - **Token**: Opaque bearer credential (redacted in debug output)
//! - **Session**: Durable store with watch-based change notification
//!
//! A session is scoped to a state directory; separate directories are
//! independent sign-ins, like separate browser profiles. Consumers that
//! need to react to login/logout (route guards, the live-sync channel)
//! subscribe to changes instead of polling.
//!
//! ## Example
//!
//! ```rust,no_run
//! use outpass::session::{Session, Token};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open("~/.local/share/outpass")?;
//!
//!     session.set(Token::new("eyJhbGciOi..."))?;
//!     assert!(session.token().is_some());
//!
//!     session.clear()?;
//!     assert!(session.token().is_none());
//!     Ok(())
//! }
//! ```

mod store;
mod token;

pub use store::{Session, SessionError};
pub use token::Token;
