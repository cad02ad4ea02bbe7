//! Live-Sync Message Types
//!
//! Wire frames for the `/api/ws` push channel and the events the channel
//! surfaces to its consumer. The server's only meaningful frame is
//! `{"type": "refresh"}`; everything else is dropped without complaint so
//! a newer backend can add frame types freely.

use serde::{Deserialize, Serialize};

/// Frames pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// The caller's data changed; re-fetch it
    Refresh,
}

/// Frames sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Keepalive
    Ping,
}

/// Where a refresh signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource {
    /// Server push frame
    Push,
    /// Fallback poll while the channel is down
    Poll,
}

/// Events surfaced to the channel consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// Re-fetch the request list; at most one per frame or poll tick
    Refresh(RefreshSource),
    /// Connection established
    ChannelUp,
    /// Connection lost; polling covers the gap until it is back
    ChannelDown,
    /// The session was cleared; the channel has shut down
    SessionEnded,
}

/// Map a received text frame to an event
///
/// Unknown types, missing types, and invalid JSON all yield `None`.
pub(crate) fn frame_event(text: &str) -> Option<SyncEvent> {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Refresh) => Some(SyncEvent::Refresh(RefreshSource::Push)),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unrecognized live-sync frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_frame_yields_one_event() {
        let event = frame_event(r#"{"type": "refresh"}"#);
        assert_eq!(event, Some(SyncEvent::Refresh(RefreshSource::Push)));
    }

    #[test]
    fn test_refresh_frame_tolerates_extra_fields() {
        let event = frame_event(r#"{"type": "refresh", "reason": "approved"}"#);
        assert_eq!(event, Some(SyncEvent::Refresh(RefreshSource::Push)));
    }

    #[test]
    fn test_unknown_type_is_dropped() {
        assert_eq!(frame_event(r#"{"type": "noop"}"#), None);
    }

    #[test]
    fn test_missing_type_is_dropped() {
        assert_eq!(frame_event(r#"{"data": 1}"#), None);
    }

    #[test]
    fn test_invalid_json_is_dropped() {
        assert_eq!(frame_event("not json"), None);
        assert_eq!(frame_event(""), None);
    }

    #[test]
    fn test_ping_serializes_with_type_tag() {
        let json = serde_json::to_string(&ClientFrame::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }
}
