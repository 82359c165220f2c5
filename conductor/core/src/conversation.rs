//! Conversation State
//!
//! The records a single messaging conversation is made of: the brand it
//! belongs to, the consumer credentials, the server-side conversation id,
//! the message history and the remote participant's live presence.
//!
//! # Design Philosophy
//!
//! A `Conversation` has exactly one owner, the [`Conductor`](crate::Conductor)
//! driving it. Readers get accessors; mutation happens through the narrow
//! crate-level methods the Conductor calls after a remote operation succeeds
//! or a live event is decoded. That keeps the lifecycle invariants in one
//! place:
//!
//! - a consumer token never exists without the app token it was minted with
//! - `accepted`/`read` on a message only ever move from `false` to `true`
//! - the author label of a message is decided once, when it is appended

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::live::SubscriptionHandle;

/// Author name stamped on messages received from the assigned agent
pub const AGENT_AUTHOR: &str = "Agent";

/// Which side of the conversation produced a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageDirection {
    /// Sent by the local consumer
    Sent,
    /// Received from the remote agent
    Received,
}

/// Typing indicator of the remote participant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceState {
    /// Nothing in progress
    #[default]
    Idle,
    /// The agent is composing a reply
    Typing,
}

/// Delivery acknowledgment reported by the server for a sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckKind {
    /// The message reached the other side
    Accepted,
    /// The other side has seen the message (implies accepted)
    Read,
}

/// A single chat message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the message
    pub direction: MessageDirection,
    /// When the message was created or stamped by the server (Unix timestamp ms)
    pub timestamp: u64,
    /// Message body
    pub text: String,
    /// Display name of the author
    pub author_name: String,
    /// Server-assigned ordering and acknowledgment key
    pub sequence: Option<u64>,
    accepted: bool,
    read: bool,
    show_author_label: bool,
}

impl ChatMessage {
    /// A message the local consumer just published
    pub fn sent(
        text: impl Into<String>,
        author_name: impl Into<String>,
        sequence: Option<u64>,
    ) -> Self {
        Self {
            direction: MessageDirection::Sent,
            timestamp: now_ms(),
            text: text.into(),
            author_name: author_name.into(),
            sequence,
            accepted: false,
            read: false,
            show_author_label: false,
        }
    }

    /// A message delivered by the agent
    ///
    /// Anything that arrived over the live channel has by definition been
    /// accepted, so received messages start out `accepted` and unread.
    pub fn received(text: impl Into<String>, timestamp: u64, sequence: Option<u64>) -> Self {
        Self {
            direction: MessageDirection::Received,
            timestamp,
            text: text.into(),
            author_name: AGENT_AUTHOR.to_string(),
            sequence,
            accepted: true,
            read: false,
            show_author_label: false,
        }
    }

    /// Whether the server reported the message as delivered
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.accepted
    }

    /// Whether the server reported the message as read
    #[must_use]
    pub fn read(&self) -> bool {
        self.read
    }

    /// Whether a renderer should print the author name above this message
    #[must_use]
    pub fn show_author_label(&self) -> bool {
        self.show_author_label
    }

    /// Mark as delivered. Returns `true` if the flag changed.
    pub fn mark_accepted(&mut self) -> bool {
        let changed = !self.accepted;
        self.accepted = true;
        changed
    }

    /// Mark as read (and therefore delivered). Returns `true` if anything changed.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.read || !self.accepted;
        self.accepted = true;
        self.read = true;
        changed
    }
}

/// Tokens produced by the two-step authentication
///
/// Both tokens live in one value so a consumer token can never be present
/// without its app token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    app_token: String,
    consumer_token: String,
}

impl Credentials {
    /// Pair an app token with the consumer token minted under it
    pub fn new(app_token: impl Into<String>, consumer_token: impl Into<String>) -> Self {
        Self {
            app_token: app_token.into(),
            consumer_token: consumer_token.into(),
        }
    }

    /// The application token (sent as `Authorization`)
    #[must_use]
    pub fn app_token(&self) -> &str {
        &self.app_token
    }

    /// The consumer token (sent as `x-lp-on-behalf`)
    #[must_use]
    pub fn consumer_token(&self) -> &str {
        &self.consumer_token
    }
}

/// A brand-scoped messaging conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    brand_id: String,
    ext_consumer_id: String,
    user_name: String,
    #[serde(default)]
    credentials: Option<Credentials>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    is_open: bool,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(skip)]
    presence: PresenceState,
    #[serde(skip)]
    live_subscription: Option<SubscriptionHandle>,
}

impl Conversation {
    /// Start a fresh conversation for a brand with a newly generated consumer id
    pub fn new(brand_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self::with_consumer_id(brand_id, user_name, format!("consumer-{}", Uuid::new_v4()))
    }

    /// Start a fresh conversation with a caller-chosen external consumer id
    pub fn with_consumer_id(
        brand_id: impl Into<String>,
        user_name: impl Into<String>,
        ext_consumer_id: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            ext_consumer_id: ext_consumer_id.into(),
            user_name: user_name.into(),
            credentials: None,
            conversation_id: None,
            is_open: false,
            messages: Vec::new(),
            presence: PresenceState::Idle,
            live_subscription: None,
        }
    }

    /// Brand this conversation is partitioned under
    #[must_use]
    pub fn brand_id(&self) -> &str {
        &self.brand_id
    }

    /// External consumer id presented during authentication
    #[must_use]
    pub fn ext_consumer_id(&self) -> &str {
        &self.ext_consumer_id
    }

    /// Name stamped on messages the consumer sends
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Credentials, once both authentication steps have succeeded
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// App token, if authenticated
    #[must_use]
    pub fn app_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::app_token)
    }

    /// Consumer token, if authenticated
    #[must_use]
    pub fn consumer_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::consumer_token)
    }

    /// Whether the authentication chain has completed
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Server-side conversation id, once opened
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Whether the conversation is between a successful open and close
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Message history in chronological order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Remote participant's typing indicator
    #[must_use]
    pub fn presence(&self) -> PresenceState {
        self.presence
    }

    /// Handle of the live subscription, if one is attached
    #[must_use]
    pub fn live_subscription(&self) -> Option<&SubscriptionHandle> {
        self.live_subscription.as_ref()
    }

    /// A copy suitable for persisting: presence and the live handle are
    /// session-local and do not survive a reload.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        let mut copy = self.clone();
        copy.presence = PresenceState::Idle;
        copy.live_subscription = None;
        copy
    }

    pub(crate) fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub(crate) fn mark_opened(&mut self, conversation_id: String) {
        self.conversation_id = Some(conversation_id);
        self.is_open = true;
    }

    pub(crate) fn mark_closed(&mut self) {
        self.is_open = false;
        self.presence = PresenceState::Idle;
    }

    pub(crate) fn set_presence(&mut self, presence: PresenceState) {
        self.presence = presence;
    }

    pub(crate) fn attach_subscription(&mut self, handle: SubscriptionHandle) {
        self.live_subscription = Some(handle);
    }

    pub(crate) fn detach_subscription(&mut self) -> Option<SubscriptionHandle> {
        self.live_subscription.take()
    }

    /// Append a message, deciding its author label from the current tail
    pub(crate) fn push_message(&mut self, mut message: ChatMessage) {
        message.show_author_label = !matches!(
            self.messages.last(),
            Some(last) if last.author_name == message.author_name
        );
        self.messages.push(message);
    }

    /// Apply an acknowledgment to the first message carrying `sequence`.
    ///
    /// Returns `true` when a message matched. Later messages sharing the
    /// sequence are left untouched.
    pub(crate) fn apply_ack(&mut self, sequence: u64, kind: AckKind) -> bool {
        let mut matches = self
            .messages
            .iter_mut()
            .filter(|m| m.sequence == Some(sequence));

        let Some(first) = matches.next() else {
            tracing::debug!(sequence, ?kind, "Acknowledgment for unknown sequence");
            return false;
        };

        match kind {
            AckKind::Accepted => first.mark_accepted(),
            AckKind::Read => first.mark_read(),
        };

        let duplicates = matches.count();
        if duplicates > 0 {
            tracing::warn!(
                sequence,
                duplicates,
                "Several messages share a sequence, only the first was acknowledged"
            );
        }
        true
    }

    /// Give the earliest unsequenced sent message with matching text its
    /// server sequence. Returns `true` if one was found.
    pub(crate) fn reconcile_sequence(&mut self, text: &str, sequence: u64) -> bool {
        if self.messages.iter().any(|m| {
            m.direction == MessageDirection::Sent && m.sequence == Some(sequence)
        }) {
            return false;
        }

        match self.messages.iter_mut().find(|m| {
            m.direction == MessageDirection::Sent && m.sequence.is_none() && m.text == text
        }) {
            Some(message) => {
                message.sequence = Some(sequence);
                true
            }
            None => false,
        }
    }

    /// Whether a received message with this sequence is already in history
    pub(crate) fn has_received(&self, sequence: u64) -> bool {
        self.messages
            .iter()
            .any(|m| m.direction == MessageDirection::Received && m.sequence == Some(sequence))
    }
}

/// Current time as Unix milliseconds
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
