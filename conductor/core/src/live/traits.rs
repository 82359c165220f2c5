//! Live Event Traits
//!
//! The server-push side of the messaging platform: a per-conversation
//! stream of raw notification payloads.
//!
//! Subscribing and unsubscribing are synchronous. A source hands back the
//! receiving end of a channel and the Conductor owns it; dropping that
//! receiver is what guarantees nothing is observed after a detach.

use std::fmt;

use tokio::sync::mpsc;

/// Opaque identifier of one live subscription
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(String);

impl SubscriptionHandle {
    /// Generate a new unique handle using a random 128-bit value
    #[must_use]
    pub fn new() -> Self {
        use rand::Rng;
        let bytes: [u8; 16] = rand::thread_rng().gen();
        Self(format!("sub_{}", hex::encode(bytes)))
    }

    /// The handle as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a live source reports on a subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveSignal {
    /// The underlying stream is established
    Opened,
    /// One raw notification payload
    Event(String),
    /// The stream failed; no further signals follow
    Error(String),
}

/// An attached live subscription
#[derive(Debug)]
pub struct Subscription {
    /// Handle to pass back to [`LiveEventSource::unsubscribe`]
    pub handle: SubscriptionHandle,
    /// Signals for this subscription, in arrival order
    pub signals: mpsc::Receiver<LiveSignal>,
}

/// Source of live notifications for conversations
pub trait LiveEventSource: Send + Sync {
    /// Get the implementation name
    fn name(&self) -> &'static str;

    /// Start receiving notifications for `conversation_id`.
    ///
    /// Connection problems are reported through [`LiveSignal::Error`] on
    /// the returned subscription rather than here.
    fn subscribe(&self, conversation_id: &str) -> Subscription;

    /// Stop delivering on the subscription identified by `handle`.
    /// Unknown handles are ignored.
    fn unsubscribe(&self, handle: &SubscriptionHandle);
}
