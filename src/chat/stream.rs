// ABOUTME: Relays provider stream chunks as client frames ending in an explicit marker
// ABOUTME: Empty fragments are skipped; provider failures surface as a terminal error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm::ChatStream;

/// One relayed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// Non-empty text fragment
    Content(String),
    /// Provider finished cleanly
    Done,
}

/// JSON body of a content frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFrame {
    /// Text fragment
    pub content: String,
}

/// Turn a provider stream into relay frames.
///
/// Each fragment is forwarded as soon as it arrives. The output ends with
/// exactly one of [`RelayFrame::Done`] or an error; a provider stream that
/// closes without a final chunk ends in a `StreamInterrupted` error.
pub fn relay(mut upstream: ChatStream) -> impl Stream<Item = Result<RelayFrame, AppError>> + Send {
    stream! {
        let mut fragments = 0_usize;
        while let Some(next) = upstream.next().await {
            match next {
                Ok(chunk) => {
                    if !chunk.delta.is_empty() {
                        fragments += 1;
                        yield Ok(RelayFrame::Content(chunk.delta));
                    }
                    if chunk.is_final {
                        debug!(fragments, finish_reason = ?chunk.finish_reason, "Stream completed");
                        yield Ok(RelayFrame::Done);
                        return;
                    }
                }
                Err(e) => {
                    warn!(fragments, "Stream failed: {}", e);
                    yield Err(e);
                    return;
                }
            }
        }
        warn!(fragments, "Provider stream closed without completion");
        yield Err(AppError::stream_interrupted("Provider stream closed without completion"));
    }
}
