//! Live-Sync Channel
//!
//! Maintains a WebSocket connection to the backend's `/api/ws` endpoint and
//! turns server pushes into [`SyncEvent`]s. The channel owns its own
//! lifecycle: it reconnects with exponential backoff when the connection
//! drops, falls back to interval polling while disconnected, follows session
//! token changes, and shuts itself down when the session ends.
//!
//! The consumer never touches the socket. It drains the event receiver and
//! reacts; every `Refresh` event means "fetch the request list once".

use std::future;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::session::{Session, Token};

use super::messages::{frame_event, ClientFrame, RefreshSource, SyncEvent};

/// Runtime settings for the live-sync channel
#[derive(Debug, Clone)]
pub struct LiveSyncConfig {
    /// Backend base URL; the WebSocket URL is derived from it
    pub backend_url: String,
    /// Consecutive failed dials before giving up on reconnecting
    pub max_reconnect_attempts: u32,
    /// First backoff delay; doubles per failed dial
    pub initial_backoff_ms: u64,
    /// Backoff ceiling
    pub max_backoff_ms: u64,
    /// Poll cadence while the channel is down
    pub poll_interval_secs: u64,
    /// Keepalive cadence while connected
    pub ping_interval_secs: u64,
    /// Dial timeout
    pub connect_timeout_secs: u64,
}

impl Default for LiveSyncConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            max_reconnect_attempts: 5,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            poll_interval_secs: 30,
            ping_interval_secs: 25,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Error, Debug)]
pub enum LiveSyncError {
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Backend URL scheme '{0}' has no WebSocket equivalent")]
    Scheme(String),
}

/// A live-sync channel ready to be started
pub struct LiveSyncChannel {
    config: LiveSyncConfig,
    session: Session,
}

/// Controls a running channel task
pub struct LiveSyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LiveSyncHandle {
    /// Stop the channel and wait for its task to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl LiveSyncChannel {
    pub fn new(config: LiveSyncConfig, session: Session) -> Self {
        Self { config, session }
    }

    /// Spawn the channel task
    ///
    /// Returns a handle for shutting it down and the event stream. The task
    /// ends on its own after emitting [`SyncEvent::SessionEnded`].
    pub fn start(self) -> (LiveSyncHandle, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(self.config, self.session, events_tx, shutdown_rx));
        (
            LiveSyncHandle {
                shutdown: shutdown_tx,
                task,
            },
            events_rx,
        )
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why an established connection stopped being driven
enum Drive {
    /// The socket died or the server closed it
    Dropped,
    /// The session holds a different token now; reconnect with it
    TokenChanged(Token),
    /// The session was cleared
    SessionCleared,
    Shutdown,
}

/// What woke a disconnected channel
enum Wake {
    /// The backoff deadline passed; try dialing again
    Elapsed,
    /// The session token changed
    Token(Option<Token>),
    Shutdown,
}

async fn run(
    config: LiveSyncConfig,
    session: Session,
    events: mpsc::UnboundedSender<SyncEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut session_rx = session.subscribe();

    let Some(mut token) = session.token() else {
        tracing::debug!("No session token, live-sync channel not starting");
        let _ = events.send(SyncEvent::SessionEnded);
        return;
    };

    let mut poll = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    poll.tick().await;

    // Failed dials since the last successful connection
    let mut failed_dials: u32 = 0;
    // Completed backoff waits this outage; drives the delay exponent
    let mut backoff_step: u32 = 0;
    let mut disconnected = false;
    // ChannelDown is emitted once per outage, not once per failed dial
    let mut down_notified = false;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if disconnected {
            let deadline = if failed_dials >= config.max_reconnect_attempts {
                tracing::warn!(
                    attempts = failed_dials,
                    "Reconnect attempts exhausted, polling until the session changes"
                );
                None
            } else {
                let delay = backoff_delay(&config, backoff_step);
                tracing::debug!(
                    attempt = failed_dials + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Waiting before reconnecting live-sync"
                );
                Some(Instant::now() + delay)
            };

            match wait_disconnected(deadline, &mut poll, &events, &mut session_rx, &mut shutdown)
                .await
            {
                Wake::Elapsed => backoff_step += 1,
                Wake::Token(Some(new_token)) => {
                    token = new_token;
                    failed_dials = 0;
                    backoff_step = 0;
                }
                Wake::Token(None) => {
                    let _ = events.send(SyncEvent::SessionEnded);
                    break;
                }
                Wake::Shutdown => break,
            }
        }

        let url = match ws_url(&config.backend_url, &token) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Cannot derive live-sync URL");
                notify_down(&events, &mut down_notified);
                failed_dials += 1;
                disconnected = true;
                continue;
            }
        };

        let dial = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            connect_async(url.as_str()),
        )
        .await;

        let socket = match dial {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Live-sync connect failed");
                notify_down(&events, &mut down_notified);
                failed_dials += 1;
                disconnected = true;
                continue;
            }
            Err(_) => {
                tracing::debug!(
                    timeout_secs = config.connect_timeout_secs,
                    "Live-sync connect timed out"
                );
                notify_down(&events, &mut down_notified);
                failed_dials += 1;
                disconnected = true;
                continue;
            }
        };

        tracing::info!("Live-sync channel established");
        failed_dials = 0;
        backoff_step = 0;
        disconnected = false;
        down_notified = false;
        let _ = events.send(SyncEvent::ChannelUp);

        let outcome = drive(socket, &config, &events, &mut session_rx, &mut shutdown).await;
        // Restart the poll cadence relative to the disconnect
        poll.reset();

        match outcome {
            Drive::Dropped => {
                tracing::warn!("Live-sync channel lost");
                notify_down(&events, &mut down_notified);
                disconnected = true;
            }
            Drive::TokenChanged(new_token) => {
                tracing::info!("Session token changed, reconnecting live-sync");
                token = new_token;
            }
            Drive::SessionCleared => {
                tracing::info!("Session ended, closing live-sync channel");
                let _ = events.send(SyncEvent::SessionEnded);
                break;
            }
            Drive::Shutdown => break,
        }
    }
}

/// Pump an established connection until something interrupts it
async fn drive(
    socket: Socket,
    config: &LiveSyncConfig,
    events: &mpsc::UnboundedSender<SyncEvent>,
    session_rx: &mut watch::Receiver<Option<Token>>,
    shutdown: &mut watch::Receiver<bool>,
) -> Drive {
    let (mut sink, mut stream) = socket.split();

    let mut ping = tokio::time::interval(Duration::from_secs(config.ping_interval_secs));
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ping.tick().await;

    let outcome = loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = frame_event(&text) {
                            let _ = events.send(event);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!("Live-sync connection closed by server");
                        break Drive::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Live-sync receive error");
                        break Drive::Dropped;
                    }
                    None => break Drive::Dropped,
                }
            }
            _ = ping.tick() => {
                match serde_json::to_string(&ClientFrame::Ping) {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            tracing::debug!("Live-sync keepalive failed");
                            break Drive::Dropped;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to serialize keepalive"),
                }
            }
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break Drive::Shutdown;
                }
                match session_rx.borrow_and_update().clone() {
                    Some(token) => break Drive::TokenChanged(token),
                    None => break Drive::SessionCleared,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break Drive::Shutdown;
                }
            }
        }
    };

    // Best-effort close; the connection may already be gone
    let _ = sink.close().await;
    outcome
}

/// Wait out a disconnected period
///
/// Emits a poll refresh on every tick. Returns when the backoff deadline
/// passes, the session changes, or shutdown is requested. Without a
/// deadline (attempts exhausted) only the latter two return.
async fn wait_disconnected(
    deadline: Option<Instant>,
    poll: &mut Interval,
    events: &mpsc::UnboundedSender<SyncEvent>,
    session_rx: &mut watch::Receiver<Option<Token>>,
    shutdown: &mut watch::Receiver<bool>,
) -> Wake {
    loop {
        let until_deadline = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            _ = until_deadline => return Wake::Elapsed,
            _ = poll.tick() => {
                tracing::debug!("Polling for changes while live-sync is down");
                let _ = events.send(SyncEvent::Refresh(RefreshSource::Poll));
            }
            changed = session_rx.changed() => {
                if changed.is_err() {
                    return Wake::Shutdown;
                }
                return Wake::Token(session_rx.borrow_and_update().clone());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Wake::Shutdown;
                }
            }
        }
    }
}

fn notify_down(events: &mpsc::UnboundedSender<SyncEvent>, notified: &mut bool) {
    if !*notified {
        *notified = true;
        let _ = events.send(SyncEvent::ChannelDown);
    }
}

/// Derive the WebSocket URL from the backend base URL
///
/// `http` maps to `ws` and `https` to `wss`; the path is always `/api/ws`
/// with the token in the query string.
fn ws_url(backend_url: &str, token: &Token) -> Result<Url, LiveSyncError> {
    let mut url = Url::parse(backend_url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(LiveSyncError::Scheme(other.to_string())),
    };
    if url.set_scheme(scheme).is_err() {
        return Err(LiveSyncError::Scheme(scheme.to_string()));
    }
    url.set_path("/api/ws");
    url.set_query(Some(&format!(
        "token={}",
        urlencoding::encode(token.as_str())
    )));
    Ok(url)
}

fn backoff_delay(config: &LiveSyncConfig, step: u32) -> Duration {
    let factor = 2u64.saturating_pow(step);
    let ms = config
        .initial_backoff_ms
        .saturating_mul(factor)
        .min(config.max_backoff_ms);
    Duration::from_millis(ms)
}
