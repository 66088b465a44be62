//! Backend Client
//!
//! The two request/response exchanges (text and audio) plus the reachability
//! probe, behind a trait so the controller can be driven without a server.

use crate::{
    error::ChatError,
    protocol::{AudioRequest, ChatRequest, ChatResponse},
};
use async_trait::async_trait;
use reqwest::{Url, header};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a reachability check. Exchanges themselves are unbounded.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The two endpoint URLs the hosting environment hands to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEndpoints {
    pub chat: Url,
    pub audio: Url,
}

/// Defines the contract for the conversational backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Posts a text message. Non-2xx statuses are errors.
    async fn send_text(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Posts a recorded audio message. Non-2xx statuses are errors.
    async fn send_audio(&self, request: &AudioRequest) -> Result<ChatResponse, ChatError>;

    /// Checks that the chat endpoint can be reached at all. Any HTTP answer,
    /// whatever its status, counts as reachable; no answer within the probe
    /// timeout does not.
    async fn probe(&self) -> Result<(), ChatError>;
}

/// An implementation of `ChatBackend` that speaks JSON over HTTP.
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoints: ChatEndpoints,
    probe_timeout: Duration,
}

impl HttpChatBackend {
    pub fn new(endpoints: ChatEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &T,
    ) -> Result<ChatResponse, ChatError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        debug!(%url, %status, "Backend responded");
        if !status.is_success() {
            return Err(ChatError::Server(status.as_u16()));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send_text(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        self.post_json(&self.endpoints.chat, request).await
    }

    async fn send_audio(&self, request: &AudioRequest) -> Result<ChatResponse, ChatError> {
        self.post_json(&self.endpoints.audio, request).await
    }

    async fn probe(&self) -> Result<(), ChatError> {
        let response = self
            .client
            .head(self.endpoints.chat.clone())
            .header(header::CACHE_CONTROL, "no-store")
            .header(header::PRAGMA, "no-cache")
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Network(format!(
                        "no answer within {}ms",
                        self.probe_timeout.as_millis()
                    ))
                } else {
                    ChatError::Network(e.to_string())
                }
            })?;
        debug!(status = %response.status(), "Connectivity probe answered");
        Ok(())
    }
}
