// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Transport to the completion endpoint
//!
//! A transport turns a [`ChatRequest`] into a [`StreamHandle`]: the raw
//! response body as a chunk stream plus an abort token. Decoding happens
//! on top of the handle, so any byte source can stand in for HTTP.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::chat::message::Message;
use crate::error::{ApiError, IrisError, Result};
use crate::llm::decoder::decode_stream;
use crate::llm::event::DecodedEvent;
use crate::llm::model::ModeFlags;
use crate::tools::definition::ToolSpec;

/// Upper bound on backend tool/model round-trips per turn
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// Seconds to wait before retrying when a 429 carries no `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u32 = 60;

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Full history, oldest first, ending with the newest user message
    pub messages: Vec<Message>,
    pub flags: ModeFlags,
    /// Resolved backend model identifier
    pub model: String,
    pub max_steps: u32,
    pub system: Option<String>,
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, flags: ModeFlags, model: impl Into<String>) -> Self {
        Self {
            messages,
            flags,
            model: model.into(),
            max_steps: DEFAULT_MAX_STEPS,
            system: None,
            tools: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The newest user message, if any
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }
}

/// JSON body posted to the endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody<'a> {
    messages: &'a [Message],
    web_search: bool,
    reasoning: bool,
    model: &'a str,
    max_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolSpec],
}

impl<'a> From<&'a ChatRequest> for ChatRequestBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            messages: &request.messages,
            web_search: request.flags.web_search,
            reasoning: request.flags.reasoning,
            model: &request.model,
            max_steps: request.max_steps,
            system: request.system.as_deref(),
            tools: &request.tools,
        }
    }
}

/// An open response stream
pub struct StreamHandle {
    chunks: BoxStream<'static, Result<Bytes>>,
    abort: CancellationToken,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("aborted", &self.abort.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl StreamHandle {
    pub fn new(chunks: BoxStream<'static, Result<Bytes>>) -> Self {
        Self::with_abort(chunks, CancellationToken::new())
    }

    /// Wrap a chunk stream that stops when `abort` is cancelled
    pub fn with_abort(chunks: BoxStream<'static, Result<Bytes>>, abort: CancellationToken) -> Self {
        Self { chunks, abort }
    }

    /// Stop the stream. Idempotent.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Token that aborts this stream when cancelled
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Raw body chunks
    pub fn into_chunks(self) -> BoxStream<'static, Result<Bytes>> {
        self.chunks
    }

    /// Decoded events, in arrival order. The sequence ends at the first
    /// error, at the end of the body, or as soon as the stream is aborted.
    pub fn into_events(self) -> BoxStream<'static, Result<DecodedEvent>> {
        let aborted = self.abort.cancelled_owned();
        decode_stream(self.chunks).take_until(aborted).boxed()
    }
}

/// Something that can open a completion stream
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Send the request and return once the response has started.
    ///
    /// Fails with [`ApiError::Network`] if the endpoint cannot be reached
    /// and with a status error if it answers with anything but success.
    async fn send(&self, request: ChatRequest) -> Result<StreamHandle>;
}

/// Error body the endpoint may return with a failure status
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: ErrorDetail },
    Flat { error: String },
    Message { message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// HTTP transport for the completion endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Create a transport posting to `url`
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key,
        }
    }

    /// Create a transport with a connect timeout
    pub fn with_connect_timeout(
        url: impl Into<String>,
        api_key: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> IrisError {
        match status {
            401 | 403 => return IrisError::Api(ApiError::AuthenticationFailed),
            429 => {
                let retry_after = headers
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                return IrisError::Api(ApiError::RateLimited(retry_after));
            }
            _ => {}
        }

        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody::Nested { error }) => error.message,
            Ok(ErrorBody::Flat { error }) => error,
            Ok(ErrorBody::Message { message }) => message,
            Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
            Err(_) => body.trim().to_string(),
        };
        IrisError::Api(ApiError::ServerError { status, message })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: ChatRequest) -> Result<StreamHandle> {
        let body = ChatRequestBody::from(&request);

        tracing::debug!(
            target: "iris.llm.transport",
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            web_search = request.flags.web_search,
            reasoning = request.flags.reasoning,
            "sending chat request"
        );

        let mut req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| IrisError::Api(ApiError::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                target: "iris.llm.transport",
                status = status.as_u16(),
                "endpoint rejected chat request"
            );
            return Err(self.parse_error(status.as_u16(), &headers, &body));
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| IrisError::Api(ApiError::StreamInterrupted(e.to_string()))))
            .boxed();
        Ok(StreamHandle::new(chunks))
    }
}
