//! Live Events
//!
//! Per-conversation server push. The Conductor subscribes when a
//! conversation opens and unsubscribes when it closes; in between, raw
//! payloads flow through a channel it owns.
//!
//! # Sources
//!
//! - **SSE**: `text/event-stream` over HTTP (production)
//! - **In-process**: tokio channels driven by a [`LivePublisher`] (embedded
//!   use and tests)

mod frame;
mod in_process;
mod sse;
mod traits;

pub use frame::{EventStreamDecoder, FrameError, MAX_EVENT_SIZE};
pub use in_process::{InProcessLiveSource, LivePublisher, DEFAULT_CHANNEL_CAPACITY};
pub use sse::SseLiveSource;
pub use traits::{LiveEventSource, LiveSignal, Subscription, SubscriptionHandle};
