//! WebSocket Endpoint
//!
//! Upgrades `/api/ws?token=...` connections, authenticates them, and wires
//! them into the hub. Connections with a bad token are closed with code
//! 4401 so clients can tell auth failure from network failure.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::livesync::ClientFrame;
use crate::server::state::AppState;

/// Close code for authentication failure
const CLOSE_UNAUTHORIZED: u16 = 4401;

#[derive(Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    token: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, token: String) {
    let Some(user) = state.user_for_token(&token).await else {
        tracing::debug!("Rejecting live-sync connection with invalid token");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_UNAUTHORIZED,
                reason: "Invalid token".into(),
            })))
            .await;
        return;
    };

    let (connection_id, mut frames) = state.hub.register(&user.id).await;
    tracing::info!(
        connection_id = %connection_id,
        user_id = %user.id,
        "Live-sync connection established"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize push frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Ping) => {
                        tracing::trace!("Live-sync keepalive received");
                    }
                    Err(_) => {
                        tracing::debug!("Ignoring unrecognized live-sync frame");
                    }
                },
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(&user.id, connection_id).await;
    tracing::info!(connection_id = %connection_id, "Live-sync connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::net::SocketAddr;
    use tokio::time::{timeout, Duration};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::util::ServiceExt;

    use crate::client::{OutPassDraft, RegisterProfile};
    use crate::server::build_router;

    async fn spawn_backend() -> (SocketAddr, AppState) {
        let state = AppState::new();
        let router = build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (addr, state)
    }

    async fn wait_for_connections(state: &AppState, count: usize) {
        for _ in 0..500 {
            if state.hub.connection_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {} live connection(s)", count);
    }

    #[tokio::test]
    async fn test_invalid_token_closes_with_auth_code() {
        let (addr, _state) = spawn_backend().await;

        let url = format!("ws://{}/api/ws?token=bogus", addr);
        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();

        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match frame {
            WsMessage::Close(Some(close)) => {
                assert_eq!(u16::from(close.code), CLOSE_UNAUTHORIZED);
                assert_eq!(close.reason, "Invalid token");
            }
            other => panic!("expected a close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_approval_pushes_refresh_to_owner_socket() {
        let (addr, state) = spawn_backend().await;
        let (user, token) = state
            .register_user(&RegisterProfile {
                name: "Asha Rao".to_string(),
                roll_no: "22H51A0501".to_string(),
                email: "asha@hitam.org".to_string(),
                password: "asdfjkl;".to_string(),
            })
            .await
            .unwrap();
        let pass = state
            .create_pass(
                &user.id,
                &OutPassDraft {
                    reason: "Medical".to_string(),
                    date_out: "2024-05-01T09:00".to_string(),
                    return_time: "2024-05-01T18:00".to_string(),
                },
            )
            .await;

        let url = format!("ws://{}/api/ws?token={}", addr, token);
        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
        wait_for_connections(&state, 1).await;

        // Approve through the route, the same path production approvals take
        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/outpass/approve/{}", pass.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match frame {
            WsMessage::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["type"], "refresh");
            }
            other => panic!("expected a refresh frame, got {:?}", other),
        }
    }
}
