//! Notification Decoder
//!
//! Classifies raw live-channel payloads into [`ConversationEvent`]s.
//!
//! The live channel is third-party input with a loose shape, so decoding is
//! total: anything unexpected becomes "no event". Nothing here touches
//! conversation state; the Conductor applies the result.
//!
//! # Payload Shape
//!
//! ```json
//! {
//!   "type": "ms.MessagingEventNotification",
//!   "body": {
//!     "changes": [{
//!       "sequence": 7,
//!       "serverTimestamp": 1700000000000,
//!       "originatorMetadata": { "role": "ASSIGNED_AGENT" },
//!       "event": { "type": "ContentEvent", "message": "hi back" }
//!     }]
//!   }
//! }
//! ```
//!
//! Every entry of `changes` is classified independently; one malformed
//! change does not discard its siblings.

use serde_json::Value;
use thiserror::Error;

use crate::conversation::PresenceState;
use crate::events::ConversationEvent;

/// Top-level `type` of messaging notifications
pub const MESSAGING_EVENT_NOTIFICATION: &str = "ms.MessagingEventNotification";

/// Originator role of the agent handling the conversation
pub const ROLE_ASSIGNED_AGENT: &str = "ASSIGNED_AGENT";

/// Originator role of the consumer
pub const ROLE_CONSUMER: &str = "CONSUMER";

/// Why a payload (or one change inside it) produced no events
#[derive(Debug, Error)]
pub enum MalformedEvent {
    /// Payload is not JSON
    #[error("notification is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field is absent or has the wrong type
    #[error("notification is missing `{0}`")]
    MissingField(&'static str),
}

/// Decode one raw payload into domain events, in the order they must be applied.
///
/// # Errors
///
/// Returns [`MalformedEvent`] when the payload as a whole is unusable. A
/// notification of another top-level type is not an error; it yields no
/// events.
pub fn decode(raw: &str) -> Result<Vec<ConversationEvent>, MalformedEvent> {
    let notification: Value = serde_json::from_str(raw)?;

    if let Some(kind) = notification.get("type").and_then(Value::as_str) {
        if kind != MESSAGING_EVENT_NOTIFICATION {
            tracing::debug!(kind, "Ignoring notification of unrelated type");
            return Ok(Vec::new());
        }
    }

    let changes = notification
        .get("body")
        .and_then(|b| b.get("changes"))
        .and_then(Value::as_array)
        .ok_or(MalformedEvent::MissingField("body.changes"))?;

    let mut events = Vec::with_capacity(changes.len());
    for change in changes {
        match decode_change(change) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "Skipping malformed change"),
        }
    }
    Ok(events)
}

/// Decode one entry of `body.changes`
fn decode_change(change: &Value) -> Result<Option<ConversationEvent>, MalformedEvent> {
    let event = change
        .get("event")
        .filter(|e| e.is_object())
        .ok_or(MalformedEvent::MissingField("event"))?;

    let role = change
        .get("originatorMetadata")
        .and_then(|m| m.get("role"))
        .and_then(Value::as_str);
    let from_agent = role == Some(ROLE_ASSIGNED_AGENT);
    let event_type = event.get("type").and_then(Value::as_str);
    let sequence = change.get("sequence").and_then(Value::as_u64);

    if let Some(text) = event.get("message").and_then(Value::as_str) {
        if text.is_empty() {
            return Ok(None);
        }
        if from_agent {
            let timestamp = change.get("serverTimestamp").and_then(Value::as_u64);
            return Ok(Some(ConversationEvent::MessageReceived {
                text: text.to_string(),
                timestamp,
                sequence,
            }));
        }
        if role == Some(ROLE_CONSUMER) {
            return Ok(sequence.map(|sequence| ConversationEvent::MessageEchoed {
                text: text.to_string(),
                sequence,
            }));
        }
        return Ok(None);
    }

    match event_type {
        Some("AcceptStatusEvent") => {
            let status = event
                .get("status")
                .and_then(Value::as_str)
                .ok_or(MalformedEvent::MissingField("event.status"))?;
            let sequences: Vec<u64> = event
                .get("sequenceList")
                .and_then(Value::as_array)
                .ok_or(MalformedEvent::MissingField("event.sequenceList"))?
                .iter()
                .filter_map(Value::as_u64)
                .collect();

            Ok(match status {
                "ACCEPT" if from_agent => Some(ConversationEvent::DeliveryAccepted { sequences }),
                "READ" => Some(ConversationEvent::DeliveryRead { sequences }),
                _ => None,
            })
        }
        Some("ChatStateEvent") if from_agent => {
            let chat_state = event
                .get("chatState")
                .and_then(Value::as_str)
                .ok_or(MalformedEvent::MissingField("event.chatState"))?;
            Ok(match chat_state {
                "COMPOSING" => Some(ConversationEvent::PresenceChanged {
                    state: PresenceState::Typing,
                }),
                "ACTIVE" => Some(ConversationEvent::PresenceChanged {
                    state: PresenceState::Idle,
                }),
                _ => None,
            })
        }
        _ => Ok(None),
    }
}
