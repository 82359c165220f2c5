//! Messaging API Traits
//!
//! The request/response side of the messaging platform as the Conductor sees
//! it: two token exchanges and three conversation operations.
//!
//! # Design Philosophy
//!
//! The trait is coarse. Implementations own URLs, headers and
//! response parsing; the Conductor only sequences calls and commits state.
//! Errors keep transport granularity (status, network, decode) and nothing
//! finer.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::Credentials;
use crate::messages::Request;

/// Errors from the messaging API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Request never got a response
    #[error("Network error: {0}")]
    Network(String),

    /// Response arrived but did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Response of the app token exchange
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppToken {
    /// Bearer value for the `Authorization` header
    pub access_token: String,
}

/// Response of the consumer token exchange
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerToken {
    /// Value for the `x-lp-on-behalf` header
    pub token: String,
}

/// Response of a successful open
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedConversation {
    /// Server-side conversation id
    #[serde(rename = "convId")]
    pub conv_id: String,
}

/// Response of a publish
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Sequence assigned to the published event, when the server reports it
    pub sequence: Option<u64>,
}

/// Application credentials used for the first authentication step
#[derive(Clone)]
pub struct AppCredentials {
    /// Application key (`client_id`)
    pub app_key: String,
    /// Application secret (`client_secret`)
    pub app_secret: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// The messaging platform's request/response API
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Get the implementation name
    fn name(&self) -> &'static str;

    /// Step one: exchange application credentials for an app token
    async fn app_token(
        &self,
        brand_id: &str,
        credentials: &AppCredentials,
    ) -> Result<AppToken, ApiError>;

    /// Step two: exchange the app token for a consumer token
    async fn consumer_token(
        &self,
        brand_id: &str,
        ext_consumer_id: &str,
        app_token: &str,
    ) -> Result<ConsumerToken, ApiError>;

    /// Send the open batch (`[SetUserProfile, ConsumerRequestConversation]`)
    async fn open_conversation(
        &self,
        brand_id: &str,
        batch: &[Request],
        auth: &Credentials,
    ) -> Result<OpenedConversation, ApiError>;

    /// Publish an event into an open conversation
    async fn send_message(
        &self,
        brand_id: &str,
        conversation_id: &str,
        request: &Request,
        auth: &Credentials,
    ) -> Result<SendReceipt, ApiError>;

    /// Close a conversation
    async fn close_conversation(
        &self,
        brand_id: &str,
        conversation_id: &str,
        auth: &Credentials,
    ) -> Result<(), ApiError>;
}
