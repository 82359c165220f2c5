//! Chat Conductor - Headless Orchestration for Brand-Scoped Messaging
//!
//! This crate drives one consumer-side conversation on a brand's messaging
//! platform, independent of any UI. It can back a terminal client, a web
//! gateway, or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          Caller / UI                              │
//! │     authenticate → open → send / send_presence → close            │
//! │                 poll_live / recv_live (live updates)              │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼───────────────────────────────────┐
//! │                         CONDUCTOR CORE                            │
//! │  ┌────────────────────────────┴──────────────────────────────┐    │
//! │  │                        Conductor                          │    │
//! │  │  ┌──────────────┐  ┌───────────────┐  ┌────────────────┐  │    │
//! │  │  │ Conversation │  │ Notification  │  │  Request ids   │  │    │
//! │  │  │  (history)   │  │   decoder     │  │  & envelopes   │  │    │
//! │  │  └──────────────┘  └───────────────┘  └────────────────┘  │    │
//! │  └──────┬──────────────────────┬──────────────────────┬──────┘    │
//! │         │                      │                      │           │
//! │  ┌──────┴───────┐     ┌────────┴────────┐     ┌───────┴───────┐   │
//! │  │ MessagingApi │     │ LiveEventSource │     │  StateStore   │   │
//! │  │ (HTTP, mock) │     │ (SSE, in-proc)  │     │ (file, memory)│   │
//! │  └──────────────┘     └─────────────────┘     └───────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: Owns the conversation and sequences every operation
//! - [`Conversation`]: Credentials, conversation id, history and presence
//! - [`ChatMessage`]: One sent or received message with delivery flags
//! - [`ConversationEvent`]: Typed change decoded from a live notification
//! - [`ConversationError`]: What a failed operation reports
//!
//! # Quick Start
//!
//! ```ignore
//! use chat_conductor::{
//!     Conductor, load_config,
//!     api::HttpMessagingApi,
//!     live::SseLiveSource,
//!     store::FileStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     config.validate()?;
//!
//!     let api = HttpMessagingApi::new(&config.base_url, config.request_timeout)?;
//!     let live = SseLiveSource::new(config.live_url(), config.request_timeout)?;
//!     let store = FileStore::new("/tmp/chat-state");
//!     let mut conductor = Conductor::new(api, live, store, config);
//!
//!     conductor.authenticate().await?;
//!     conductor.open().await?;
//!     conductor.send("hello").await?;
//!
//!     while let Some(events) = conductor.recv_live().await {
//!         for event in events {
//!             println!("{}", event.name());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: Messaging API trait, HTTP implementation and a recording mock
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: TOML, environment and CLI configuration
//! - [`conversation`]: Conversation and message records
//! - [`error`]: Operation errors
//! - [`events`]: Domain events applied to a conversation
//! - [`live`]: Live event sources (SSE, in-process)
//! - [`messages`]: Request envelopes and their bodies
//! - [`notifications`]: Raw notification decoder
//! - [`store`]: Per-brand state persistence

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod conductor;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod live;
pub mod messages;
pub mod notifications;
pub mod store;

// Re-export main types for convenience
pub use api::{ApiError, HttpMessagingApi, MessagingApi};
pub use conductor::{Conductor, LiveState};
pub use config::{load_config, ConductorConfig, ConfigError, ConfigOverrides, ConfigSource};
pub use conversation::{
    AckKind, ChatMessage, Conversation, Credentials, MessageDirection, PresenceState,
};
pub use error::{ConversationError, PreconditionError};
pub use events::ConversationEvent;
pub use live::{InProcessLiveSource, LiveEventSource, SseLiveSource};
pub use messages::ChatState;
pub use store::{
    is_storable_brand_id, last_conversation, BrandState, FileStore, MemoryStore, StateStore,
    StoreError,
};
