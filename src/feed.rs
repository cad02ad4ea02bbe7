//! Request Feed
//!
//! Holds the caller's out-pass request list as a watchable snapshot and
//! keeps it current. Consumers subscribe to snapshots; the feed re-fetches
//! on live-sync events and after submitting a new request.
//!
//! Every fetch takes a sequence number before it leaves. Responses publish
//! only if their sequence is higher than the published one, so a slow fetch
//! racing a newer one can never roll the view backwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::client::{ApiClient, ClientError, ClientResult, OutPassDraft, OutPassRequest};
use crate::livesync::SyncEvent;

/// A point-in-time view of the request list
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    /// Requests, newest first
    pub items: Vec<OutPassRequest>,
    /// Sequence number of the fetch that produced this view
    pub seq: u64,
}

#[derive(Clone)]
pub struct RequestFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    client: ApiClient,
    next_seq: AtomicU64,
    snapshot: watch::Sender<FeedSnapshot>,
}

impl RequestFeed {
    pub fn new(client: ApiClient) -> Self {
        let (snapshot, _) = watch::channel(FeedSnapshot::default());
        Self {
            inner: Arc::new(FeedInner {
                client,
                next_seq: AtomicU64::new(1),
                snapshot,
            }),
        }
    }

    /// Current view of the request list
    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Watch for view changes
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Fetch the request list once and publish the result
    ///
    /// The fetch is numbered before it leaves; if a later-numbered fetch
    /// lands first, this result is discarded.
    pub async fn refresh(&self) -> ClientResult<()> {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let items = self.inner.client.list_my_requests().await?;
        if !self.publish(seq, items) {
            tracing::debug!(seq, "Discarding stale request list fetch");
        }
        Ok(())
    }

    /// Submit a new request, then re-fetch the list once
    pub async fn submit(&self, draft: &OutPassDraft) -> ClientResult<OutPassRequest> {
        let created = self.inner.client.create_request(draft).await?;
        self.refresh().await?;
        Ok(created)
    }

    /// Drive the feed from live-sync events until the stream ends
    ///
    /// Fetches once up front, once per `Refresh` event, and once more when
    /// the channel recovers from an outage. Transient fetch failures keep
    /// the last good view; only session expiry stops the loop early.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<SyncEvent>) -> ClientResult<()> {
        self.refresh_tolerant().await?;

        let mut was_down = false;
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::Refresh(source) => {
                    tracing::debug!(source = ?source, "Re-fetching request list");
                    self.refresh_tolerant().await?;
                }
                SyncEvent::ChannelUp => {
                    if was_down {
                        was_down = false;
                        tracing::debug!("Live-sync restored, catching up");
                        self.refresh_tolerant().await?;
                    }
                }
                SyncEvent::ChannelDown => {
                    was_down = true;
                }
                SyncEvent::SessionEnded => break,
            }
        }
        Ok(())
    }

    /// Publish a fetch result unless a newer one already landed
    fn publish(&self, seq: u64, items: Vec<OutPassRequest>) -> bool {
        self.inner.snapshot.send_if_modified(|current| {
            if seq > current.seq {
                *current = FeedSnapshot { items, seq };
                true
            } else {
                false
            }
        })
    }

    async fn refresh_tolerant(&self) -> ClientResult<()> {
        match self.refresh().await {
            Err(ClientError::SessionExpired) => Err(ClientError::SessionExpired),
            Err(e) => {
                tracing::warn!(error = %e, "Request list fetch failed, keeping last view");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}
