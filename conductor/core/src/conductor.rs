//! Conductor - The Conversation Orchestrator
//!
//! The Conductor drives one brand-scoped messaging conversation through its
//! lifecycle:
//! - two-step authentication (app token, then consumer token)
//! - opening the conversation and attaching the live subscription
//! - publishing messages and presence
//! - applying live notifications to the message history
//! - closing and detaching
//!
//! # Design Philosophy
//!
//! Every collaborator is injected: the messaging API, the live event source
//! and the state store. The Conductor owns the [`Conversation`] and is the
//! only thing that mutates it, always through `&mut self`, so remote
//! completions and live events are applied one at a time.
//!
//! Remote state changes first. Local state is committed only after the
//! remote side confirmed, so a failed operation leaves the conversation as
//! it was. Persistence happens after every committed change; a store
//! failure is logged and never fails the operation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

use crate::api::MessagingApi;
use crate::config::ConductorConfig;
use crate::conversation::{now_ms, AckKind, ChatMessage, Conversation, Credentials};
use crate::error::{ConversationError, PreconditionError};
use crate::events::ConversationEvent;
use crate::live::{LiveEventSource, LiveSignal, Subscription};
use crate::messages::{
    ChatState, ConversationRequest, Event, PublishEvent, Request, RequestIds, UserProfile,
};
use crate::notifications;
use crate::store::{BrandState, StateStore};

/// Whether a live subscription is attached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    /// No subscription, live events are not being received
    Unsubscribed,
    /// A subscription is attached
    Subscribed,
}

/// The conversation orchestrator
pub struct Conductor<A, L, S>
where
    A: MessagingApi + 'static,
    L: LiveEventSource,
    S: StateStore,
{
    /// Configuration
    config: ConductorConfig,
    /// Messaging API (shared with fire-and-forget presence tasks)
    api: Arc<A>,
    /// Live event source
    live: L,
    /// Brand state persistence
    store: S,
    /// The conversation being driven
    conversation: Conversation,
    /// Receiving end of the attached subscription
    signals: Option<mpsc::Receiver<LiveSignal>>,
    /// Request id counter
    request_ids: RequestIds,
}

impl<A, L, S> Conductor<A, L, S>
where
    A: MessagingApi + 'static,
    L: LiveEventSource,
    S: StateStore,
{
    /// Create a Conductor for a fresh conversation under `config.brand_id`
    pub fn new(api: A, live: L, store: S, config: ConductorConfig) -> Self {
        let conversation = Conversation::new(config.brand_id.clone(), config.user_name.clone());
        Self::with_conversation(api, live, store, config, conversation)
    }

    /// Create a Conductor that continues an existing conversation
    ///
    /// Used to resume a conversation restored from the store. Nothing is
    /// subscribed yet; call [`Conductor::resubscribe`] if it is still open.
    pub fn with_conversation(
        api: A,
        live: L,
        store: S,
        config: ConductorConfig,
        conversation: Conversation,
    ) -> Self {
        tracing::debug!(
            brand_id = conversation.brand_id(),
            api = api.name(),
            live = live.name(),
            "Conductor created"
        );
        Self {
            config,
            api: Arc::new(api),
            live,
            store,
            conversation: conversation.snapshot(),
            signals: None,
            request_ids: RequestIds::new(),
        }
    }

    /// The conversation being driven
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Consume the Conductor, detaching any live subscription
    pub fn into_conversation(mut self) -> Conversation {
        self.detach_live();
        self.conversation
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &ConductorConfig {
        &self.config
    }

    /// Live subscription state
    #[must_use]
    pub fn live_state(&self) -> LiveState {
        if self.signals.is_some() {
            LiveState::Subscribed
        } else {
            LiveState::Unsubscribed
        }
    }

    /// Whether a live subscription is attached
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.live_state() == LiveState::Subscribed
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Run the two-step token exchange
    ///
    /// The consumer token request is only made once the app token has been
    /// obtained. Credentials are committed only if both steps succeed.
    ///
    /// # Errors
    ///
    /// [`ConversationError::Auth`] if either exchange fails.
    pub async fn authenticate(&mut self) -> Result<(), ConversationError> {
        let brand_id = self.conversation.brand_id().to_string();

        let app_token = self
            .api
            .app_token(&brand_id, &self.config.app_credentials())
            .await
            .map_err(|e| {
                tracing::warn!(brand_id = %brand_id, error = %e, "App token request failed");
                ConversationError::Auth(e)
            })?;

        let consumer_token = self
            .api
            .consumer_token(
                &brand_id,
                self.conversation.ext_consumer_id(),
                &app_token.access_token,
            )
            .await
            .map_err(|e| {
                tracing::warn!(brand_id = %brand_id, error = %e, "Consumer token request failed");
                ConversationError::Auth(e)
            })?;

        self.conversation.set_credentials(Credentials::new(
            app_token.access_token,
            consumer_token.token,
        ));
        tracing::info!(
            brand_id = %brand_id,
            consumer = self.conversation.ext_consumer_id(),
            "Authenticated"
        );

        self.persist().await;
        Ok(())
    }

    /// Open the conversation and attach the live subscription
    ///
    /// # Errors
    ///
    /// - [`PreconditionError::NotAuthenticated`] before [`Conductor::authenticate`]
    /// - [`PreconditionError::AlreadyOpen`] if it is open
    /// - [`ConversationError::Transport`] if the open request fails
    pub async fn open(&mut self) -> Result<(), ConversationError> {
        let credentials = self
            .conversation
            .credentials()
            .cloned()
            .ok_or(PreconditionError::NotAuthenticated)?;
        if self.conversation.is_open() {
            return Err(PreconditionError::AlreadyOpen.into());
        }

        let brand_id = self.conversation.brand_id().to_string();
        // An empty user name keeps the configured profile's first name
        let mut profile = self.config.profile.clone();
        let user_name = self.conversation.user_name();
        if !user_name.trim().is_empty() {
            profile.first_name = user_name.to_string();
        }
        let request = ConversationRequest::new(
            brand_id.clone(),
            self.config.campaign.clone(),
            self.config.skill_id.clone(),
        );
        let batch = [
            Request::set_user_profile(self.request_ids.next_id(), &profile),
            Request::request_conversation(self.request_ids.next_id(), &request),
        ];

        let opened = self
            .api
            .open_conversation(&brand_id, &batch, &credentials)
            .await
            .map_err(|e| {
                tracing::warn!(brand_id = %brand_id, error = %e, "Open failed");
                ConversationError::Transport(e)
            })?;

        tracing::info!(
            brand_id = %brand_id,
            conversation_id = %opened.conv_id,
            "Conversation opened"
        );
        self.conversation.mark_opened(opened.conv_id.clone());
        self.attach_live(&opened.conv_id);

        self.persist().await;
        Ok(())
    }

    /// Publish a text message
    ///
    /// The message is appended once the publish succeeds, with the sequence
    /// the server reported (if any). Delivery acknowledgments arrive later
    /// over the live channel.
    ///
    /// # Errors
    ///
    /// - [`PreconditionError::NotOpen`] if the conversation is not open
    /// - [`ConversationError::Transport`] if the publish fails
    pub async fn send(&mut self, text: &str) -> Result<(), ConversationError> {
        let (conversation_id, credentials) = self.open_target()?;
        let brand_id = self.conversation.brand_id().to_string();

        let request = Request::publish(
            self.request_ids.next_id(),
            &PublishEvent::new(conversation_id.clone(), Event::text(text)),
        );
        let receipt = self
            .api
            .send_message(&brand_id, &conversation_id, &request, &credentials)
            .await?;

        let message = ChatMessage::sent(text, self.conversation.user_name(), receipt.sequence);
        self.conversation.push_message(message);
        tracing::debug!(
            conversation_id = %conversation_id,
            sequence = ?receipt.sequence,
            "Message sent"
        );

        self.persist().await;
        Ok(())
    }

    /// Publish a chat state without waiting for it
    ///
    /// Nothing local changes. The returned handle resolves when the publish
    /// finished; a failure is logged. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`PreconditionError::NotOpen`] if the conversation is not open.
    pub fn send_presence(&self, state: ChatState) -> Result<JoinHandle<()>, ConversationError> {
        let (conversation_id, credentials) = self.open_target()?;
        let brand_id = self.conversation.brand_id().to_string();
        let request = Request::publish(
            self.request_ids.next_id(),
            &PublishEvent::new(conversation_id.clone(), Event::chat_state(state)),
        );
        let api = Arc::clone(&self.api);

        Ok(tokio::spawn(async move {
            if let Err(e) = api
                .send_message(&brand_id, &conversation_id, &request, &credentials)
                .await
            {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    ?state,
                    error = %e,
                    "Presence publish failed"
                );
            }
        }))
    }

    /// Close the conversation
    ///
    /// On success the live subscription is detached before anything else,
    /// so no event can be applied afterwards.
    ///
    /// # Errors
    ///
    /// - [`PreconditionError::NotOpen`] if the conversation is not open
    /// - [`ConversationError::Transport`] if the close request fails; the
    ///   conversation stays open and subscribed
    pub async fn close(&mut self) -> Result<(), ConversationError> {
        let (conversation_id, credentials) = self.open_target()?;
        let brand_id = self.conversation.brand_id().to_string();

        self.api
            .close_conversation(&brand_id, &conversation_id, &credentials)
            .await
            .map_err(|e| {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "Close failed");
                ConversationError::Transport(e)
            })?;

        self.detach_live();
        self.conversation.mark_closed();
        tracing::info!(conversation_id = %conversation_id, "Conversation closed");

        self.persist().await;
        Ok(())
    }

    /// Attach a new live subscription to an open conversation
    ///
    /// For after a live error, or after resuming a restored conversation.
    /// The Conductor never does this on its own.
    ///
    /// # Errors
    ///
    /// - [`PreconditionError::NotOpen`] if the conversation is not open
    /// - [`PreconditionError::AlreadySubscribed`] if one is attached
    pub fn resubscribe(&mut self) -> Result<(), ConversationError> {
        let (conversation_id, _) = self.open_target()?;
        if self.is_subscribed() {
            return Err(PreconditionError::AlreadySubscribed.into());
        }
        self.attach_live(&conversation_id);
        Ok(())
    }

    // =========================================================================
    // Live Events
    // =========================================================================

    /// Apply every live signal that is already waiting
    ///
    /// Never waits. Returns the number of domain events applied.
    pub async fn poll_live(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(rx) = self.signals.as_mut() else {
                break;
            };
            match rx.try_recv() {
                Ok(signal) => applied += self.handle_signal(signal).await.len(),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.live_lost("live channel closed");
                    break;
                }
            }
        }
        applied
    }

    /// Wait for the next live signal and apply it
    ///
    /// Returns the domain events the signal produced (possibly none), or
    /// `None` right away when no subscription is attached.
    pub async fn recv_live(&mut self) -> Option<Vec<ConversationEvent>> {
        let rx = self.signals.as_mut()?;
        match rx.recv().await {
            Some(signal) => Some(self.handle_signal(signal).await),
            None => {
                self.live_lost("live channel closed");
                Some(Vec::new())
            }
        }
    }

    async fn handle_signal(&mut self, signal: LiveSignal) -> Vec<ConversationEvent> {
        match signal {
            LiveSignal::Opened => {
                tracing::debug!(
                    conversation_id = ?self.conversation.conversation_id(),
                    "Live stream opened"
                );
                Vec::new()
            }
            LiveSignal::Event(raw) => {
                let events = match notifications::decode(&raw) {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping malformed notification");
                        return Vec::new();
                    }
                };

                let mut changed = false;
                for event in &events {
                    changed |= self.apply_event(event);
                }
                if changed {
                    self.persist().await;
                }
                events
            }
            LiveSignal::Error(reason) => {
                self.live_lost(&reason);
                Vec::new()
            }
        }
    }

    /// Apply one event. Returns `true` if persisted state changed.
    fn apply_event(&mut self, event: &ConversationEvent) -> bool {
        tracing::debug!(event = event.name(), "Applying live event");
        match event {
            ConversationEvent::MessageReceived {
                text,
                timestamp,
                sequence,
            } => {
                if let Some(seq) = sequence {
                    if self.conversation.has_received(*seq) {
                        tracing::debug!(sequence = seq, "Ignoring redelivered message");
                        return false;
                    }
                }
                let timestamp = timestamp.unwrap_or_else(now_ms);
                self.conversation
                    .push_message(ChatMessage::received(text.clone(), timestamp, *sequence));
                true
            }
            ConversationEvent::MessageEchoed { text, sequence } => {
                self.conversation.reconcile_sequence(text, *sequence)
            }
            ConversationEvent::DeliveryAccepted { sequences } => {
                self.apply_acks(sequences, AckKind::Accepted)
            }
            ConversationEvent::DeliveryRead { sequences } => {
                self.apply_acks(sequences, AckKind::Read)
            }
            ConversationEvent::PresenceChanged { state } => {
                // Presence is session-local and not persisted
                self.conversation.set_presence(*state);
                false
            }
        }
    }

    fn apply_acks(&mut self, sequences: &[u64], kind: AckKind) -> bool {
        sequences
            .iter()
            .fold(false, |changed, seq| self.conversation.apply_ack(*seq, kind) | changed)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Conversation id and credentials of an open conversation
    fn open_target(&self) -> Result<(String, Credentials), PreconditionError> {
        let conversation_id = self
            .conversation
            .conversation_id()
            .filter(|_| self.conversation.is_open())
            .ok_or(PreconditionError::NotOpen)?;
        let credentials = self
            .conversation
            .credentials()
            .ok_or(PreconditionError::NotAuthenticated)?;
        Ok((conversation_id.to_string(), credentials.clone()))
    }

    fn attach_live(&mut self, conversation_id: &str) {
        let Subscription { handle, signals } = self.live.subscribe(conversation_id);
        tracing::debug!(
            conversation_id,
            handle = %handle,
            source = self.live.name(),
            "Live subscription attached"
        );
        self.conversation.attach_subscription(handle);
        self.signals = Some(signals);
    }

    /// Drop the receiver and release the subscription. Returns `true` if one
    /// was attached.
    fn detach_live(&mut self) -> bool {
        self.signals = None;
        match self.conversation.detach_subscription() {
            Some(handle) => {
                self.live.unsubscribe(&handle);
                tracing::debug!(handle = %handle, "Live subscription detached");
                true
            }
            None => false,
        }
    }

    fn live_lost(&mut self, reason: &str) {
        if self.detach_live() {
            tracing::warn!(
                conversation_id = ?self.conversation.conversation_id(),
                reason,
                "Live subscription lost"
            );
        }
    }

    async fn persist(&self) {
        let brand_id = self.conversation.brand_id();
        let mut state = BrandState::default();
        state.record(&self.conversation);

        if let Err(e) = self.store.set(brand_id, state).await {
            tracing::warn!(brand_id, error = %e, "Failed to persist conversation state");
        }
    }
}
