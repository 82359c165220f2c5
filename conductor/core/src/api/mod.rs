//! Messaging API Integration
//!
//! Access to the messaging platform's request/response endpoints through a
//! common trait, so the Conductor can run against the real platform or an
//! in-memory stand-in.
//!
//! # Available Implementations
//!
//! - **HTTP**: `reqwest` client for the platform's REST API
//! - **Mock**: canned answers and call recording, see [`test_utils`]
//!
//! # Usage
//!
//! ```ignore
//! use chat_conductor::api::{AppCredentials, HttpMessagingApi, MessagingApi};
//!
//! let api = HttpMessagingApi::new("https://messaging.example.com", Duration::from_secs(30))?;
//! let token = api.app_token("brand-1", &credentials).await?;
//! ```

mod http;
pub mod test_utils;
mod traits;

pub use http::{HttpMessagingApi, ON_BEHALF_HEADER};
pub use traits::{
    ApiError, AppCredentials, AppToken, ConsumerToken, MessagingApi, OpenedConversation,
    SendReceipt,
};
