// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Scripted transport for testing
//!
//! Replays pre-recorded response bodies instead of talking to a server,
//! and records every request it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::error::{ApiError, IrisError, Result};
use crate::llm::transport::{ChatRequest, ChatTransport, StreamHandle};

/// How a scripted response ends after its chunks are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEnd {
    /// The body ends normally
    Close,
    /// The body never ends
    HoldOpen,
    /// The connection drops with this message
    Interrupt(String),
}

/// A pre-configured response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// A streamed body
    Body { chunks: Vec<String>, end: ScriptEnd },
    /// `send` fails before any body is returned
    Fail(ScriptedFailure),
}

/// A failure returned from `send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    Network(String),
    Status { status: u16, message: String },
}

impl ScriptedFailure {
    fn to_error(&self) -> IrisError {
        match self {
            ScriptedFailure::Network(message) => {
                IrisError::Api(ApiError::Network(message.clone()))
            }
            ScriptedFailure::Status { status, message } => IrisError::Api(ApiError::ServerError {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// A transport that replays scripted responses, in order. Once the
/// scripts run out the last one is repeated.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<Vec<Script>>>,
    call_count: Arc<AtomicUsize>,
    recorded_requests: Arc<Mutex<Vec<ChatRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Scripted transport lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Terminate a frame with a newline unless it already has one.
fn framed(line: impl Into<String>) -> String {
    let mut line = line.into();
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script
    pub fn with_script(self, script: Script) -> Self {
        lock(&self.scripts).push(script);
        self
    }

    /// Queue a body delivered one frame per chunk
    pub fn with_frames<I, S>(self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(Script::Body {
            chunks: frames.into_iter().map(framed).collect(),
            end: ScriptEnd::Close,
        })
    }

    /// Queue a body delivered as the given raw chunks, split wherever the
    /// caller chose
    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(Script::Body {
            chunks: chunks.into_iter().map(Into::into).collect(),
            end: ScriptEnd::Close,
        })
    }

    /// Queue a body that delivers `frames` and then stalls forever
    pub fn with_held_open<I, S>(self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(Script::Body {
            chunks: frames.into_iter().map(framed).collect(),
            end: ScriptEnd::HoldOpen,
        })
    }

    /// Queue a body that delivers `frames` and then drops the connection
    pub fn with_interruption<I, S>(self, frames: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(Script::Body {
            chunks: frames.into_iter().map(framed).collect(),
            end: ScriptEnd::Interrupt(message.into()),
        })
    }

    /// Queue a failure of `send` itself
    pub fn with_send_failure(self, failure: ScriptedFailure) -> Self {
        self.with_script(Script::Fail(failure))
    }

    /// Number of times `send` was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        lock(&self.recorded_requests).clone()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    fn next_script(&self) -> Option<Script> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let scripts = lock(&self.scripts);
        if scripts.is_empty() {
            None
        } else {
            Some(scripts[count.min(scripts.len() - 1)].clone())
        }
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: ChatRequest) -> Result<StreamHandle> {
        lock(&self.recorded_requests).push(request);

        let (chunks, end) = match self.next_script() {
            Some(Script::Fail(failure)) => return Err(failure.to_error()),
            Some(Script::Body { chunks, end }) => (chunks, end),
            None => (Vec::new(), ScriptEnd::Close),
        };

        let body = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, IrisError>(Bytes::from(chunk))),
        );
        let chunks = match end {
            ScriptEnd::Close => body.boxed(),
            ScriptEnd::HoldOpen => body.chain(stream::pending()).boxed(),
            ScriptEnd::Interrupt(message) => body
                .chain(stream::once(async move {
                    Err(IrisError::Api(ApiError::StreamInterrupted(message)))
                }))
                .boxed(),
        };
        Ok(StreamHandle::new(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Message;
    use crate::llm::event::DecodedEvent;
    use crate::llm::model::ModeFlags;

    fn request(text: &str) -> ChatRequest {
        ChatRequest::new(vec![Message::user(text)], ModeFlags::default(), "openai")
    }

    #[tokio::test]
    async fn test_replays_frames_and_records() {
        let transport = ScriptedTransport::new().with_frames(["0:\"Hi\"", "d:{\"finishReason\":\"stop\"}"]);
        let handle = transport.send(request("hello")).await.unwrap();
        let events: Vec<_> = handle.into_events().collect().await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Ok(DecodedEvent::Done)));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(
            transport.last_request().unwrap().messages[0].content,
            "hello"
        );
    }

    #[tokio::test]
    async fn test_scripts_in_order_then_repeat_last() {
        let transport = ScriptedTransport::new()
            .with_send_failure(ScriptedFailure::Network("refused".to_string()))
            .with_frames(["0:\"ok\""]);

        assert!(matches!(
            transport.send(request("a")).await,
            Err(IrisError::Api(ApiError::Network(_)))
        ));
        assert!(transport.send(request("b")).await.is_ok());
        assert!(transport.send(request("c")).await.is_ok());
        assert_eq!(transport.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_interruption_ends_with_error() {
        let transport = ScriptedTransport::new().with_interruption(["0:\"part\""], "reset by peer");
        let events: Vec<_> = transport
            .send(request("x"))
            .await
            .unwrap()
            .into_events()
            .collect()
            .await;

        assert!(events[0].is_ok());
        assert!(matches!(
            events[1],
            Err(IrisError::Api(ApiError::StreamInterrupted(_)))
        ));
    }
}
