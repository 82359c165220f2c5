//! Server-Sent Events Live Source
//!
//! Subscribes to `GET {base}/notifications/subscribe/{conversationId}` and
//! forwards every dispatched event as [`LiveSignal::Event`]. Each
//! subscription runs in its own task; unsubscribing aborts the task, which
//! drops the HTTP connection.
//!
//! There is no reconnection here. A failed or ended stream is reported as
//! [`LiveSignal::Error`] and the task exits.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::frame::EventStreamDecoder;
use super::in_process::DEFAULT_CHANNEL_CAPACITY;
use super::traits::{LiveEventSource, LiveSignal, Subscription, SubscriptionHandle};

/// Live source backed by a `text/event-stream` endpoint
#[derive(Clone, Debug)]
pub struct SseLiveSource {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client (no overall timeout, the stream is long-lived)
    http_client: reqwest::Client,
    /// Channel capacity for new subscriptions
    capacity: usize,
    /// Running stream tasks
    tasks: Arc<DashMap<SubscriptionHandle, AbortHandle>>,
}

impl SseLiveSource {
    /// Create a source for `base_url`
    ///
    /// `connect_timeout` bounds connection setup only.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            tasks: Arc::new(DashMap::new()),
        })
    }

    /// Use a custom channel capacity
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Stream URL for a conversation
    #[must_use]
    pub fn subscribe_url(&self, conversation_id: &str) -> String {
        format!("{}/notifications/subscribe/{conversation_id}", self.base_url)
    }

    /// Number of streams currently running
    #[must_use]
    pub fn active_streams(&self) -> usize {
        self.tasks.len()
    }
}

impl LiveEventSource for SseLiveSource {
    fn name(&self) -> &'static str {
        "SSE"
    }

    /// Must be called from within a Tokio runtime.
    fn subscribe(&self, conversation_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let handle = SubscriptionHandle::new();

        let request = self
            .http_client
            .get(self.subscribe_url(conversation_id))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let conversation_id = conversation_id.to_string();

        let task = tokio::spawn(async move {
            run_stream(request, tx, &conversation_id).await;
        });
        self.tasks.insert(handle.clone(), task.abort_handle());

        Subscription {
            handle,
            signals: rx,
        }
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if let Some((_, task)) = self.tasks.remove(handle) {
            task.abort();
        }
    }
}

/// Pump one event stream into `tx` until it ends, fails, or the receiver goes away
async fn run_stream(
    request: reqwest::RequestBuilder,
    tx: mpsc::Sender<LiveSignal>,
    conversation_id: &str,
) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(LiveSignal::Error(format!("connect failed: {e}"))).await;
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let _ = tx
            .send(LiveSignal::Error(format!("stream returned {status}")))
            .await;
        return;
    }

    tracing::debug!(conversation_id, "Live stream opened");
    if tx.send(LiveSignal::Opened).await.is_err() {
        return;
    }

    let mut decoder = EventStreamDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(LiveSignal::Error(e.to_string())).await;
                return;
            }
        };

        let events = match decoder.push(&bytes) {
            Ok(events) => events,
            Err(e) => {
                let _ = tx.send(LiveSignal::Error(e.to_string())).await;
                return;
            }
        };

        for event in events {
            if tx.send(LiveSignal::Event(event)).await.is_err() {
                // Receiver dropped, stop streaming
                return;
            }
        }
    }

    let _ = tx
        .send(LiveSignal::Error("stream ended".to_string()))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_url() {
        let live = SseLiveSource::new("https://live.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            live.subscribe_url("CV9"),
            "https://live.example.com/notifications/subscribe/CV9"
        );
    }

    #[tokio::test]
    async fn test_unreachable_stream_reports_error() {
        let live = SseLiveSource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let mut sub = live.subscribe("CV9");

        match sub.signals.recv().await {
            Some(LiveSignal::Error(reason)) => assert!(reason.contains("connect failed")),
            other => panic!("expected error signal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_aborts_task() {
        let live = SseLiveSource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let sub = live.subscribe("CV9");
        assert_eq!(live.active_streams(), 1);

        live.unsubscribe(&sub.handle);
        assert_eq!(live.active_streams(), 0);

        // Second unsubscribe is a no-op
        live.unsubscribe(&sub.handle);
    }
}
