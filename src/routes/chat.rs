// ABOUTME: Chat route handlers for the property assistant
// ABOUTME: Validates chat submissions, runs turns and relays streamed replies as SSE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat routes
//!
//! Bodies are read as raw bytes so that malformed JSON and wrongly typed
//! fields produce the fixed validation messages clients match on. The
//! credential check runs before the body is looked at.

use std::{convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures_util::{pin_mut, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::chat::{relay, ChatReply, ChatTurn, ContentFrame, ConversationContext, RelayFrame};
use crate::constants::conversation::STREAM_DONE_MARKER;
use crate::constants::routes;
use crate::errors::{AppError, MSG_STREAMING_FAILED};
use crate::llm::ChatMessage;
use crate::resources::ServerResources;

/// Body is not valid JSON
pub const MSG_INVALID_JSON: &str = "Invalid JSON in request body";
/// `message` is absent, empty or not a string
pub const MSG_MESSAGE_REQUIRED: &str = "Message is required and must be a string";
/// `conversationHistory` is not an array
pub const MSG_HISTORY_NOT_ARRAY: &str = "Conversation history must be an array";

/// Name of the SSE event carrying a mid-stream failure
pub const ERROR_EVENT: &str = "error";

/// Chat routes implementation
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                routes::CHAT,
                post(Self::handle_chat).put(Self::handle_chat_stream),
            )
            .route(routes::CHAT_STREAM, post(Self::handle_chat_stream))
            .with_state(resources)
    }

    /// Non-streaming submit
    async fn handle_chat(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> Result<Json<ChatReply>, AppError> {
        resources.orchestrator.ensure_configured()?;
        let turn = parse_turn(&body, true)?;

        info!(
            history_len = turn.history.len(),
            has_context = turn.context.is_some(),
            "Chat turn received"
        );

        let reply = resources.orchestrator.respond(&turn).await?;
        Ok(Json(reply))
    }

    /// Streaming submit. Frames are `data: {"content": …}` followed by
    /// `data: [DONE]`; a failure after the stream opened is sent as an
    /// `error` event and ends the stream without the marker.
    async fn handle_chat_stream(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        resources.orchestrator.ensure_configured()?;
        let turn = parse_turn(&body, false)?;

        let upstream = resources
            .orchestrator
            .open_stream(&turn)
            .await
            .map_err(|e| {
                error!("Failed to open completion stream: {}", e);
                AppError::stream_interrupted(e.message.clone()).with_source(e)
            })?;

        let stream = async_stream::stream! {
            let frames = relay(upstream);
            pin_mut!(frames);

            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(RelayFrame::Content(content)) => {
                        let data = serde_json::to_string(&ContentFrame { content })
                            .unwrap_or_default();
                        yield Ok(Event::default().data(data));
                    }
                    Ok(RelayFrame::Done) => {
                        yield Ok(Event::default().data(STREAM_DONE_MARKER));
                    }
                    Err(e) => {
                        error!(code = ?e.code, "Streaming error: {}", e);
                        let data = serde_json::json!({ "error": MSG_STREAMING_FAILED });
                        // Terminal: nothing follows the error event
                        yield Ok(Event::default().event(ERROR_EVENT).data(data.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }
}

/// Validate a submission body.
///
/// `conversationHistory` must be an array when `require_history` is set; the
/// streaming submit treats an absent history as empty. History entries with
/// an unknown role are dropped, and a context that does not match the
/// expected shape is ignored.
///
/// # Errors
///
/// Returns an invalid-input error carrying one of the fixed validation messages
pub fn parse_turn(body: &[u8], require_history: bool) -> Result<ChatTurn, AppError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|_| AppError::invalid_input(MSG_INVALID_JSON))?;

    let message = match payload.get("message") {
        Some(Value::String(message)) if !message.is_empty() => message.clone(),
        _ => return Err(AppError::invalid_input(MSG_MESSAGE_REQUIRED)),
    };

    let history = match payload.get("conversationHistory") {
        Some(Value::Array(entries)) => parse_history(entries),
        None | Some(Value::Null) if !require_history => Vec::new(),
        _ => return Err(AppError::invalid_input(MSG_HISTORY_NOT_ARRAY)),
    };

    let context = match payload.get("context") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<ConversationContext>(raw.clone()) {
            Ok(context) => Some(context),
            Err(e) => {
                warn!("Ignoring malformed conversation context: {}", e);
                None
            }
        },
    };

    Ok(ChatTurn {
        message,
        history,
        context,
    })
}

fn parse_history(entries: &[Value]) -> Vec<ChatMessage> {
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<ChatMessage>(entry.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Dropping unreadable history entry: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::llm::MessageRole;

    fn message_of(body: &str, require_history: bool) -> String {
        let err = parse_turn(body.as_bytes(), require_history).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        err.message
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(message_of("{not json", true), MSG_INVALID_JSON);
        assert_eq!(
            message_of(r#"{"conversationHistory": []}"#, true),
            MSG_MESSAGE_REQUIRED
        );
        assert_eq!(
            message_of(r#"{"message": 42, "conversationHistory": []}"#, true),
            MSG_MESSAGE_REQUIRED
        );
        assert_eq!(
            message_of(r#"{"message": "", "conversationHistory": []}"#, true),
            MSG_MESSAGE_REQUIRED
        );
        assert_eq!(message_of(r#"{"message": "hi"}"#, true), MSG_HISTORY_NOT_ARRAY);
        assert_eq!(
            message_of(r#"{"message": "hi", "conversationHistory": "x"}"#, false),
            MSG_HISTORY_NOT_ARRAY
        );
    }

    #[test]
    fn test_stream_submit_tolerates_missing_history() {
        let turn = parse_turn(br#"{"message": "hi"}"#, false).unwrap();
        assert!(turn.history.is_empty());
    }

    #[test]
    fn test_unknown_roles_dropped() {
        let body = br#"{
            "message": "next",
            "conversationHistory": [
                {"role": "user", "content": "a"},
                {"role": "tool", "content": "b"},
                {"role": "assistant", "content": "c"}
            ]
        }"#;
        let turn = parse_turn(body, true).unwrap();
        assert_eq!(turn.history.len(), 2);
        assert_eq!(turn.history[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_context_parsed_or_ignored() {
        let body = br#"{"message": "hi", "conversationHistory": [], "context": {"sessionId": "s1", "userLocation": "Lisbon"}}"#;
        let turn = parse_turn(body, true).unwrap();
        assert_eq!(
            turn.context.unwrap().user_location.as_deref(),
            Some("Lisbon")
        );

        let body = br#"{"message": "hi", "conversationHistory": [], "context": "nope"}"#;
        assert!(parse_turn(body, true).unwrap().context.is_none());
    }
}
