//! Wire Envelopes
//!
//! Request envelopes the Conductor hands to the messaging API. Every request
//! is wrapped as `{"type": "req", "id": ..., "kind": ..., "body": ...}`, where
//! `kind` names the server-side operation and `body` carries its payload.
//!
//! Opening a conversation is a batch of two envelopes, in this order:
//! 1. `userprofile.SetUserProfile`
//! 2. `cm.ConsumerRequestConversation`
//!
//! Sending a message or a presence change is a single `ms.PublishEvent`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Envelope `type` for every client request
pub const REQUEST_TYPE: &str = "req";

/// Operation names used in the envelope `kind` field
pub mod operations {
    /// Set the consumer's profile
    pub const SET_USER_PROFILE: &str = "userprofile.SetUserProfile";
    /// Ask for a new conversation
    pub const CONSUMER_REQUEST_CONVERSATION: &str = "cm.ConsumerRequestConversation";
    /// Publish an event (content or chat state) into a conversation
    pub const PUBLISH_EVENT: &str = "ms.PublishEvent";
}

/// A request envelope
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Always [`REQUEST_TYPE`]
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Client-chosen request id
    pub id: String,
    /// Operation name, see [`operations`]
    pub kind: String,
    /// Operation payload
    pub body: serde_json::Value,
}

impl Request {
    fn new(id: RequestId, operation: &str, body: serde_json::Value) -> Self {
        Self {
            frame_type: REQUEST_TYPE.to_string(),
            id: id.0,
            kind: operation.to_string(),
            body,
        }
    }

    /// `userprofile.SetUserProfile`
    pub fn set_user_profile(id: RequestId, profile: &UserProfile) -> Self {
        Self::new(id, operations::SET_USER_PROFILE, to_body(profile))
    }

    /// `cm.ConsumerRequestConversation`
    pub fn request_conversation(id: RequestId, request: &ConversationRequest) -> Self {
        Self::new(id, operations::CONSUMER_REQUEST_CONVERSATION, to_body(request))
    }

    /// `ms.PublishEvent`
    pub fn publish(id: RequestId, publish: &PublishEvent) -> Self {
        Self::new(id, operations::PUBLISH_EVENT, to_body(publish))
    }
}

fn to_body<T: Serialize>(value: &T) -> serde_json::Value {
    // Plain structs of strings always serialize
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Request identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Issues increasing request ids for one Conductor
#[derive(Debug, Default)]
pub struct RequestIds {
    next: AtomicU64,
}

impl RequestIds {
    /// Start counting at 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next id
    pub fn next_id(&self) -> RequestId {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        RequestId(id.to_string())
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Campaign and engagement the conversation is routed through
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignInfo {
    /// Campaign id
    pub campaign_id: String,
    /// Engagement id
    pub engagement_id: String,
}

impl Default for CampaignInfo {
    fn default() -> Self {
        Self {
            campaign_id: "99999".to_string(),
            engagement_id: "888888".to_string(),
        }
    }
}

/// Body of `cm.ConsumerRequestConversation`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    /// Time-to-response definition
    pub ttr_def_name: String,
    /// Routing campaign
    pub campaign_info: CampaignInfo,
    /// Channel type
    pub channel_type: String,
    /// Brand the conversation belongs to
    pub brand_id: String,
    /// Skill to route to (`-1` for any)
    pub skill_id: String,
}

impl ConversationRequest {
    /// Request a messaging conversation for `brand_id`
    pub fn new(
        brand_id: impl Into<String>,
        campaign_info: CampaignInfo,
        skill_id: impl Into<String>,
    ) -> Self {
        Self {
            ttr_def_name: "CUSTOM".to_string(),
            campaign_info,
            channel_type: "MESSAGING".to_string(),
            brand_id: brand_id.into(),
            skill_id: skill_id.into(),
        }
    }
}

/// Push notification registration sent with the profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationData {
    /// Push service name
    pub service_name: String,
    /// Certificate name
    pub cert_name: String,
    /// Device token
    pub token: String,
}

impl Default for PushNotificationData {
    fn default() -> Self {
        Self {
            service_name: "Service".to_string(),
            cert_name: "CertName".to_string(),
            token: "TOKEN".to_string(),
        }
    }
}

/// Contact details that are only visible to the brand
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateData {
    /// Mobile number
    pub mobile_num: String,
    /// Email address
    pub mail: String,
    /// Push registration
    pub push_notification_data: PushNotificationData,
}

impl Default for PrivateData {
    fn default() -> Self {
        Self {
            mobile_num: "1750345346".to_string(),
            mail: "test@email.com".to_string(),
            push_notification_data: PushNotificationData::default(),
        }
    }
}

/// Body of `userprofile.SetUserProfile`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Avatar image URL
    pub avatar_url: String,
    /// Participant role, always `consumer`
    pub role: String,
    /// Background image URL
    pub backgnd_img_uri: String,
    /// Free-form description
    pub description: String,
    /// Brand-only contact details
    pub private_data: PrivateData,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            first_name: "WEB UI USER".to_string(),
            last_name: String::new(),
            avatar_url: "http://avatarurl.com".to_string(),
            role: "consumer".to_string(),
            backgnd_img_uri: "http://something.com".to_string(),
            description: "Test Description".to_string(),
            private_data: PrivateData::default(),
        }
    }
}

// =============================================================================
// Publish Events
// =============================================================================

/// Chat state a participant can publish
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatState {
    /// Present and idle
    Active,
    /// Present but not looking
    Inactive,
    /// Left the conversation view
    Gone,
    /// Typing
    Composing,
    /// Stopped typing
    Pause,
}

/// Event carried by `ms.PublishEvent`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A chat message
    #[serde(rename_all = "camelCase")]
    ContentEvent {
        /// MIME type of `message`
        content_type: String,
        /// Message text
        message: String,
    },
    /// A presence change
    #[serde(rename_all = "camelCase")]
    ChatStateEvent {
        /// New chat state
        chat_state: ChatState,
    },
}

impl Event {
    /// A plain-text message
    pub fn text(message: impl Into<String>) -> Self {
        Self::ContentEvent {
            content_type: "text/plain".to_string(),
            message: message.into(),
        }
    }

    /// A chat state change
    #[must_use]
    pub fn chat_state(chat_state: ChatState) -> Self {
        Self::ChatStateEvent { chat_state }
    }
}

/// Body of `ms.PublishEvent`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEvent {
    /// Target conversation
    pub conversation_id: String,
    /// Event to publish
    pub event: Event,
}

impl PublishEvent {
    /// Publish `event` into `conversation_id`
    pub fn new(conversation_id: impl Into<String>, event: Event) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            event,
        }
    }
}
