//! Messaging API Test Utilities
//!
//! An in-memory [`MessagingApi`] that answers with canned tokens and ids,
//! records every call for later assertions and can be told to fail any
//! operation.
//!
//! # Usage
//!
//! ```ignore
//! use chat_conductor::api::test_utils::{ApiOperation, MockMessagingApi};
//!
//! let api = MockMessagingApi::new();
//! api.fail(ApiOperation::AppToken);
//!
//! // Hand a clone to the Conductor, keep this one for assertions
//! let mut conductor = Conductor::new(api.clone(), live, store, config);
//! assert!(conductor.authenticate().await.is_err());
//! assert_eq!(api.call_count(ApiOperation::ConsumerToken), 0);
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{
    ApiError, AppCredentials, AppToken, ConsumerToken, MessagingApi, OpenedConversation,
    SendReceipt,
};
use crate::conversation::Credentials;
use crate::messages::Request;

/// The five operations of the messaging API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// App token exchange
    AppToken,
    /// Consumer token exchange
    ConsumerToken,
    /// Open conversation
    Open,
    /// Publish into a conversation
    Send,
    /// Close conversation
    Close,
}

/// A recorded call
#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    /// `app_token`
    AppToken {
        /// Brand
        brand_id: String,
        /// Application key presented
        app_key: String,
    },
    /// `consumer_token`
    ConsumerToken {
        /// Brand
        brand_id: String,
        /// Consumer id presented
        ext_consumer_id: String,
        /// App token presented
        app_token: String,
    },
    /// `open_conversation`
    Open {
        /// Brand
        brand_id: String,
        /// Envelopes, in order
        batch: Vec<Request>,
        /// Credentials presented
        auth: Credentials,
    },
    /// `send_message`
    Send {
        /// Brand
        brand_id: String,
        /// Target conversation
        conversation_id: String,
        /// Envelope
        request: Request,
    },
    /// `close_conversation`
    Close {
        /// Brand
        brand_id: String,
        /// Target conversation
        conversation_id: String,
    },
}

impl ApiCall {
    /// Which operation this call was
    #[must_use]
    pub fn operation(&self) -> ApiOperation {
        match self {
            Self::AppToken { .. } => ApiOperation::AppToken,
            Self::ConsumerToken { .. } => ApiOperation::ConsumerToken,
            Self::Open { .. } => ApiOperation::Open,
            Self::Send { .. } => ApiOperation::Send,
            Self::Close { .. } => ApiOperation::Close,
        }
    }
}

#[derive(Debug)]
struct MockState {
    calls: Vec<ApiCall>,
    failing: HashSet<ApiOperation>,
    app_token: String,
    consumer_token: String,
    conversation_id: String,
    sequences: VecDeque<Option<u64>>,
}

/// Mock messaging API
///
/// Clones share state, so a test can keep one handle and give another to
/// the Conductor.
#[derive(Clone, Debug)]
pub struct MockMessagingApi {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockMessagingApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessagingApi {
    /// Answers with app token `A1`, consumer token `C1` and conversation `CV9`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                calls: Vec::new(),
                failing: HashSet::new(),
                app_token: "A1".to_string(),
                consumer_token: "C1".to_string(),
                conversation_id: "CV9".to_string(),
                sequences: VecDeque::new(),
            })),
        }
    }

    /// Use different tokens
    #[must_use]
    pub fn with_tokens(self, app_token: &str, consumer_token: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.app_token = app_token.to_string();
            state.consumer_token = consumer_token.to_string();
        }
        self
    }

    /// Use a different conversation id
    #[must_use]
    pub fn with_conversation_id(self, conversation_id: &str) -> Self {
        self.state.lock().conversation_id = conversation_id.to_string();
        self
    }

    /// Make every future call of `operation` fail
    pub fn fail(&self, operation: ApiOperation) {
        self.state.lock().failing.insert(operation);
    }

    /// Let `operation` succeed again
    pub fn succeed(&self, operation: ApiOperation) {
        self.state.lock().failing.remove(&operation);
    }

    /// Queue the sequence the next publish reports (`None` for no sequence).
    /// Publishes with an empty queue report no sequence.
    pub fn push_sequence(&self, sequence: Option<u64>) {
        self.state.lock().sequences.push_back(sequence);
    }

    /// All calls so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    /// How many times `operation` was called
    #[must_use]
    pub fn call_count(&self, operation: ApiOperation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Record `call` and report whether its operation is set to fail
    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        let operation = call.operation();
        state.calls.push(call);
        if state.failing.contains(&operation) {
            return Err(ApiError::Http {
                status: 500,
                body: format!("mock failure for {operation:?}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingApi for MockMessagingApi {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn app_token(
        &self,
        brand_id: &str,
        credentials: &AppCredentials,
    ) -> Result<AppToken, ApiError> {
        self.record(ApiCall::AppToken {
            brand_id: brand_id.to_string(),
            app_key: credentials.app_key.clone(),
        })?;
        Ok(AppToken {
            access_token: self.state.lock().app_token.clone(),
        })
    }

    async fn consumer_token(
        &self,
        brand_id: &str,
        ext_consumer_id: &str,
        app_token: &str,
    ) -> Result<ConsumerToken, ApiError> {
        self.record(ApiCall::ConsumerToken {
            brand_id: brand_id.to_string(),
            ext_consumer_id: ext_consumer_id.to_string(),
            app_token: app_token.to_string(),
        })?;
        Ok(ConsumerToken {
            token: self.state.lock().consumer_token.clone(),
        })
    }

    async fn open_conversation(
        &self,
        brand_id: &str,
        batch: &[Request],
        auth: &Credentials,
    ) -> Result<OpenedConversation, ApiError> {
        self.record(ApiCall::Open {
            brand_id: brand_id.to_string(),
            batch: batch.to_vec(),
            auth: auth.clone(),
        })?;
        Ok(OpenedConversation {
            conv_id: self.state.lock().conversation_id.clone(),
        })
    }

    async fn send_message(
        &self,
        brand_id: &str,
        conversation_id: &str,
        request: &Request,
        _auth: &Credentials,
    ) -> Result<SendReceipt, ApiError> {
        self.record(ApiCall::Send {
            brand_id: brand_id.to_string(),
            conversation_id: conversation_id.to_string(),
            request: request.clone(),
        })?;
        let sequence = self.state.lock().sequences.pop_front().flatten();
        Ok(SendReceipt { sequence })
    }

    async fn close_conversation(
        &self,
        brand_id: &str,
        conversation_id: &str,
        _auth: &Credentials,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::Close {
            brand_id: brand_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
    }
}
