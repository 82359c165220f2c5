//! In-Process Live Source
//!
//! Channel-based live events for embedded use and tests. Whoever holds a
//! [`LivePublisher`] plays the server and pushes raw payloads straight into
//! the subscription of a conversation.
//!
//! # Usage
//!
//! ```ignore
//! let live = InProcessLiveSource::new();
//! let publisher = live.publisher("CV9");
//!
//! // Give a clone of `live` to the Conductor, then after `open()`:
//! publisher.emit(r#"{"type":"ms.MessagingEventNotification","body":{"changes":[]}}"#);
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::traits::{LiveEventSource, LiveSignal, Subscription, SubscriptionHandle};

/// Default per-subscription channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug)]
struct Route {
    handle: SubscriptionHandle,
    tx: mpsc::Sender<LiveSignal>,
}

/// In-process live source using tokio channels
///
/// Clones share their routing table.
#[derive(Clone, Debug)]
pub struct InProcessLiveSource {
    /// Conversation id -> active subscription
    routes: Arc<DashMap<String, Route>>,
    /// Channel capacity for new subscriptions
    capacity: usize,
}

impl Default for InProcessLiveSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessLiveSource {
    /// Create a source with the default channel capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create with custom channel capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// A publisher for `conversation_id`. It may be created before anyone
    /// subscribes.
    #[must_use]
    pub fn publisher(&self, conversation_id: &str) -> LivePublisher {
        LivePublisher {
            conversation_id: conversation_id.to_string(),
            routes: Arc::clone(&self.routes),
        }
    }

    /// Whether `conversation_id` currently has a subscriber
    #[must_use]
    pub fn is_subscribed(&self, conversation_id: &str) -> bool {
        self.routes.contains_key(conversation_id)
    }

    /// Number of active subscriptions
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.routes.len()
    }
}

impl LiveEventSource for InProcessLiveSource {
    fn name(&self) -> &'static str {
        "InProcess"
    }

    fn subscribe(&self, conversation_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let handle = SubscriptionHandle::new();

        // Nothing to connect to, so the stream is open immediately
        let _ = tx.try_send(LiveSignal::Opened);

        let replaced = self.routes.insert(
            conversation_id.to_string(),
            Route {
                handle: handle.clone(),
                tx,
            },
        );
        if let Some(old) = replaced {
            tracing::debug!(
                conversation_id,
                old = %old.handle,
                "Replacing existing in-process subscription"
            );
        }

        Subscription {
            handle,
            signals: rx,
        }
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.routes.retain(|_, route| route.handle != *handle);
    }
}

/// Server side of an in-process subscription
#[derive(Clone, Debug)]
pub struct LivePublisher {
    conversation_id: String,
    routes: Arc<DashMap<String, Route>>,
}

impl LivePublisher {
    /// Conversation this publisher targets
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Deliver a raw payload. Returns `false` if nobody is subscribed or the
    /// subscriber's buffer is full.
    pub fn emit(&self, raw: impl Into<String>) -> bool {
        self.signal(LiveSignal::Event(raw.into()))
    }

    /// Report a stream failure. Returns `false` if nobody is subscribed.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.signal(LiveSignal::Error(reason.into()))
    }

    fn signal(&self, signal: LiveSignal) -> bool {
        match self.routes.get(&self.conversation_id) {
            Some(route) => route.tx.try_send(signal).is_ok(),
            None => false,
        }
    }
}
