//! Conversation Events
//!
//! Typed domain events produced by the notification decoder and applied by
//! the Conductor, in order, to the conversation they belong to.

use serde::{Deserialize, Serialize};

use crate::conversation::PresenceState;

/// A change to conversation state announced by the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// The assigned agent posted a message
    MessageReceived {
        /// Message body
        text: String,
        /// Server timestamp (Unix ms), when the notification carried one
        timestamp: Option<u64>,
        /// Server sequence, if the notification carried one
        sequence: Option<u64>,
    },

    /// The server echoed back a message the consumer published
    MessageEchoed {
        /// Message body as published
        text: String,
        /// Sequence the server assigned to it
        sequence: u64,
    },

    /// Messages with these sequences reached the other side
    DeliveryAccepted {
        /// Acknowledged sequences
        sequences: Vec<u64>,
    },

    /// Messages with these sequences were read by the other side
    DeliveryRead {
        /// Acknowledged sequences
        sequences: Vec<u64>,
    },

    /// The agent started or stopped typing
    PresenceChanged {
        /// New presence
        state: PresenceState,
    },
}

impl ConversationEvent {
    /// Short name for log fields
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageReceived { .. } => "message_received",
            Self::MessageEchoed { .. } => "message_echoed",
            Self::DeliveryAccepted { .. } => "delivery_accepted",
            Self::DeliveryRead { .. } => "delivery_read",
            Self::PresenceChanged { .. } => "presence_changed",
        }
    }
}
