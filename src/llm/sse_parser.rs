// ABOUTME: SSE (Server-Sent Events) line-buffering parser for provider streaming responses
// ABOUTME: Detects the completion marker so truncated streams surface as errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # SSE Stream Parser
//!
//! Provider streams arrive as `data: <json>` lines separated by blank lines
//! and finish with `data: [DONE]`. Network chunks do not align with lines or
//! with UTF-8 characters, so [`SseLineBuffer`] keeps the unterminated tail as
//! raw bytes and only decodes complete lines.
//!
//! [`create_sse_stream`] turns a raw byte stream into a [`ChatStream`]. It
//! guarantees the stream either ends with a final chunk or with an error:
//! a connection that closes before `[DONE]` (or a chunk carrying a finish
//! reason) yields `StreamInterrupted`.

use std::mem;

use async_stream::stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use super::{ChatStream, StreamChunk};
use crate::constants::conversation::STREAM_DONE_MARKER;
use crate::errors::AppError;

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload (prefix stripped)
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Line-buffering SSE parser that handles partial lines across chunk boundaries
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by them
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the byte stream has ended
    pub fn flush(&mut self) -> Option<SseEvent> {
        parse_line(&String::from_utf8_lossy(&mem::take(&mut self.buffer)))
    }
}

/// Parse one SSE line. Blank lines, comments and non-data fields yield `None`.
fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() {
        None
    } else if data == STREAM_DONE_MARKER {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(data.to_owned()))
    }
}

/// Create a buffered SSE stream from a raw byte stream
///
/// `parse_data` converts one provider JSON payload into a chunk, or `None`
/// for payloads that carry nothing (role-only deltas, keepalives). Empty
/// non-final deltas are dropped.
pub fn create_sse_stream<S, F>(
    byte_stream: S,
    parse_data: F,
    provider_name: &'static str,
) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>> + Send + 'static,
{
    let output = stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut parser = SseLineBuffer::new();
        let mut finished = false;

        while let Some(next) = byte_stream.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(provider = provider_name, error = %e, "Stream read error");
                    yield Err(AppError::stream_interrupted(format!(
                        "{provider_name}: stream read error: {e}"
                    )));
                    return;
                }
            };

            for event in parser.feed(&bytes) {
                match event {
                    SseEvent::Done => {
                        yield Ok(StreamChunk::done(Some("stop".to_owned())));
                        return;
                    }
                    SseEvent::Data(payload) => match parse_data(&payload) {
                        Some(Ok(chunk)) => {
                            finished |= chunk.is_final;
                            if chunk.is_final || !chunk.delta.is_empty() {
                                yield Ok(chunk);
                            }
                        }
                        Some(Err(e)) => {
                            yield Err(e);
                            return;
                        }
                        None => {}
                    },
                }
            }
        }

        match parser.flush() {
            Some(SseEvent::Done) => {
                yield Ok(StreamChunk::done(Some("stop".to_owned())));
                return;
            }
            Some(SseEvent::Data(payload)) => {
                if let Some(result) = parse_data(&payload) {
                    let is_final = result.as_ref().is_ok_and(|chunk| chunk.is_final);
                    finished |= is_final;
                    yield result;
                }
            }
            None => {}
        }

        if finished {
            debug!(provider = provider_name, "Stream closed after final chunk");
        } else {
            yield Err(AppError::stream_interrupted(format!(
                "{provider_name}: stream ended before completion marker"
            )));
        }
    };

    Box::pin(output)
}
