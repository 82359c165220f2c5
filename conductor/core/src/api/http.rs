//! HTTP Messaging API
//!
//! `reqwest` implementation of [`MessagingApi`] against the platform's REST
//! endpoints. All paths hang off one base URL:
//!
//! - `POST /api/account/{brand}/app/token` - form-encoded client credentials
//! - `POST /api/account/{brand}/consumer` - `{"ext_consumer_id": ...}`
//! - `POST /api/account/{brand}/messaging/consumer/conversation` - open batch
//! - `POST .../conversation/{id}/send` - publish one envelope
//! - `POST .../conversation/{id}/close`
//!
//! Conversation calls carry the app token verbatim in `Authorization` and the
//! consumer token in `x-lp-on-behalf`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::traits::{
    ApiError, AppCredentials, AppToken, ConsumerToken, MessagingApi, OpenedConversation,
    SendReceipt,
};
use crate::conversation::Credentials;
use crate::messages::Request;

/// Header carrying the consumer token
pub const ON_BEHALF_HEADER: &str = "x-lp-on-behalf";

/// Messaging API client over HTTP
#[derive(Clone, Debug)]
pub struct HttpMessagingApi {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpMessagingApi {
    /// Create a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn account_url(&self, brand_id: &str) -> String {
        format!("{}/api/account/{brand_id}", self.base_url)
    }

    fn app_token_url(&self, brand_id: &str) -> String {
        format!("{}/app/token", self.account_url(brand_id))
    }

    fn consumer_url(&self, brand_id: &str) -> String {
        format!("{}/consumer", self.account_url(brand_id))
    }

    fn conversation_url(&self, brand_id: &str) -> String {
        format!("{}/messaging/consumer/conversation", self.account_url(brand_id))
    }

    fn send_url(&self, brand_id: &str, conversation_id: &str) -> String {
        format!("{}/{conversation_id}/send", self.conversation_url(brand_id))
    }

    fn close_url(&self, brand_id: &str, conversation_id: &str) -> String {
        format!("{}/{conversation_id}/close", self.conversation_url(brand_id))
    }

    fn authorized(&self, url: &str, auth: &Credentials) -> reqwest::RequestBuilder {
        self.http_client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, auth.app_token())
            .header(ON_BEHALF_HEADER, auth.consumer_token())
    }
}

/// Turn a response into JSON, mapping non-success statuses to [`ApiError::Http`]
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Http { status, body })
}

/// Pull the sequence out of a publish response.
///
/// The server nests it under `body`; a top-level `sequence` is accepted too.
fn sequence_from_response(response: &Value) -> Option<u64> {
    response
        .get("body")
        .and_then(|b| b.get("sequence"))
        .or_else(|| response.get("sequence"))
        .and_then(Value::as_u64)
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn app_token(
        &self,
        brand_id: &str,
        credentials: &AppCredentials,
    ) -> Result<AppToken, ApiError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.app_key.as_str()),
            ("client_secret", credentials.app_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(self.app_token_url(brand_id))
            .form(&form)
            .send()
            .await?;

        read_json(response).await
    }

    async fn consumer_token(
        &self,
        brand_id: &str,
        ext_consumer_id: &str,
        app_token: &str,
    ) -> Result<ConsumerToken, ApiError> {
        let response = self
            .http_client
            .post(self.consumer_url(brand_id))
            .header(reqwest::header::AUTHORIZATION, app_token)
            .json(&serde_json::json!({ "ext_consumer_id": ext_consumer_id }))
            .send()
            .await?;

        read_json(response).await
    }

    async fn open_conversation(
        &self,
        brand_id: &str,
        batch: &[Request],
        auth: &Credentials,
    ) -> Result<OpenedConversation, ApiError> {
        let response = self
            .authorized(&self.conversation_url(brand_id), auth)
            .json(batch)
            .send()
            .await?;

        read_json(response).await
    }

    async fn send_message(
        &self,
        brand_id: &str,
        conversation_id: &str,
        request: &Request,
        auth: &Credentials,
    ) -> Result<SendReceipt, ApiError> {
        let response = self
            .authorized(&self.send_url(brand_id, conversation_id), auth)
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(SendReceipt::default());
        }

        // Publish responses without a JSON body still count as success
        let sequence = serde_json::from_str::<Value>(&text)
            .ok()
            .as_ref()
            .and_then(sequence_from_response);
        Ok(SendReceipt { sequence })
    }

    async fn close_conversation(
        &self,
        brand_id: &str,
        conversation_id: &str,
        auth: &Credentials,
    ) -> Result<(), ApiError> {
        let response = self
            .authorized(&self.close_url(brand_id, conversation_id), auth)
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }
}
