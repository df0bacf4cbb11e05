// ABOUTME: HTTP client for the chat endpoints that owns and trims the conversation history
// ABOUTME: Plain and streamed submits plus prompt helpers for common property requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat API Client
//!
//! The server is stateless; this client keeps the running history and sends
//! it with every turn. After each completed turn the user message and the
//! reply are appended and the history is trimmed to the same
//! [`ConversationLimits`] the server applies.
//!
//! A streamed turn only counts as completed when the server sends the end
//! marker. A stream that breaks or reports an error returns an error and
//! leaves the history untouched.

use chrono::Utc;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::{ChatReply, ContentFrame, ConversationContext, ConversationGoal, PropertyPreferences};
use crate::config::ConversationLimits;
use crate::constants::conversation::STREAM_DONE_MARKER;
use crate::constants::llm::REQUEST_TIMEOUT_SECS;
use crate::constants::routes;
use crate::errors::AppError;
use crate::llm::ChatMessage;
use crate::routes::chat::ERROR_EVENT;
use crate::utils::http_client::api_client;

/// Service label used in error messages
const SERVICE: &str = "PropertyBot API";

const SESSION_SUFFIX_LEN: usize = 9;
const SESSION_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Body of a chat submit
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatSubmission<'a> {
    message: &'a str,
    conversation_history: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a ConversationContext>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for one conversation against a PropertyBot server
pub struct ChatApiClient {
    client: Client,
    base_url: String,
    history: Vec<ChatMessage>,
    limits: ConversationLimits,
}

impl ChatApiClient {
    /// Create a client for the server at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(base_url: impl Into<String>, limits: ConversationLimits) -> Result<Self, AppError> {
        Ok(Self {
            client: api_client(REQUEST_TIMEOUT_SECS)?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            history: Vec::new(),
            limits,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Submit a turn and wait for the whole reply
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server answers with an
    /// error status; the server's message is preserved
    pub async fn send_message(
        &mut self,
        message: &str,
        context: Option<&ConversationContext>,
    ) -> Result<ChatReply, AppError> {
        let body = ChatSubmission {
            message,
            conversation_history: &self.history,
            context,
        };

        let response = self
            .client
            .post(self.url(routes::CHAT))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, e.to_string()).with_source(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map_or_else(|_| "API request failed".to_owned(), |body| body.error);
            return Err(status_error(status, message));
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            AppError::serialization(format!("Unreadable chat reply: {e}")).with_source(e)
        })?;

        self.record_turn(message, reply.message());
        Ok(reply)
    }

    /// Submit a turn over the streaming endpoint, passing each fragment to
    /// `on_chunk` as it arrives. Returns the full reply.
    ///
    /// # Errors
    ///
    /// Returns an error when the request is rejected, when the server sends an
    /// error event or when the stream ends without the end marker
    pub async fn stream_message<F>(
        &mut self,
        message: &str,
        context: Option<&ConversationContext>,
        mut on_chunk: F,
    ) -> Result<String, AppError>
    where
        F: FnMut(&str) + Send,
    {
        let body = ChatSubmission {
            message,
            conversation_history: &self.history,
            context,
        };

        let response = self
            .client
            .put(self.url(routes::CHAT))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, e.to_string()).with_source(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map_or_else(|_| "Streaming request failed".to_owned(), |body| body.error);
            return Err(status_error(status, message));
        }

        let mut events = response.bytes_stream().eventsource();
        let mut full_reply = String::new();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| {
                AppError::stream_interrupted(format!("Stream read failed: {e}"))
            })?;

            if event.event == ERROR_EVENT {
                warn!(data = %event.data, "Server reported a streaming error");
                return Err(AppError::stream_interrupted(event.data));
            }

            if event.data == STREAM_DONE_MARKER {
                self.record_turn(message, &full_reply);
                return Ok(full_reply);
            }

            match serde_json::from_str::<ContentFrame>(&event.data) {
                Ok(frame) if !frame.content.is_empty() => {
                    full_reply.push_str(&frame.content);
                    on_chunk(&frame.content);
                }
                Ok(_) => {}
                Err(e) => debug!("Ignoring unreadable stream frame: {}", e),
            }
        }

        Err(AppError::stream_interrupted(
            "Stream ended before the completion marker",
        ))
    }

    /// Ask for recommendations matching `preferences`
    ///
    /// # Errors
    ///
    /// Returns an error when the turn fails
    pub async fn get_property_recommendations(
        &mut self,
        preferences: &PropertyPreferences,
    ) -> Result<ChatReply, AppError> {
        let prompt = format!(
            "I'm looking for property recommendations with these preferences: {}",
            serde_json::to_string_pretty(preferences)?
        );
        let context = ConversationContext::for_session(generate_session_id())
            .with_preferences(preferences.clone())
            .with_goal(ConversationGoal::PropertySearch);
        self.send_message(&prompt, Some(&context)).await
    }

    /// Describe a maintenance or support problem
    ///
    /// # Errors
    ///
    /// Returns an error when the ticket cannot be serialized or the turn fails
    pub async fn create_help_ticket<T>(&mut self, ticket: &T) -> Result<ChatReply, AppError>
    where
        T: Serialize + Sync,
    {
        let prompt = format!(
            "I need to create a help ticket: {}",
            serde_json::to_string_pretty(ticket)?
        );
        let context = ConversationContext::for_session(generate_session_id())
            .with_goal(ConversationGoal::TicketCreation);
        self.send_message(&prompt, Some(&context)).await
    }

    /// Ask for a market analysis of `location`, optionally for one property type
    ///
    /// # Errors
    ///
    /// Returns an error when the turn fails
    pub async fn get_market_analysis(
        &mut self,
        location: &str,
        property_type: Option<&str>,
    ) -> Result<ChatReply, AppError> {
        let prompt = property_type.map_or_else(
            || format!("Can you provide a market analysis for {location}?"),
            |kind| format!("Can you provide a market analysis for {location} for {kind} properties?"),
        );
        let context = ConversationContext::for_session(generate_session_id())
            .with_location(location)
            .with_goal(ConversationGoal::MarketAnalysis);
        self.send_message(&prompt, Some(&context)).await
    }

    /// Ask the assistant to pull current listings
    ///
    /// # Errors
    ///
    /// Returns an error when the turn fails
    pub async fn fetch_properties(&mut self) -> Result<ChatReply, AppError> {
        let context = ConversationContext::for_session(generate_session_id())
            .with_goal(ConversationGoal::PropertySearch);
        self.send_message(
            "Please fetch properties based on the user's preferences and requirements.",
            Some(&context),
        )
        .await
    }

    /// Forget the conversation
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Messages that will accompany the next turn, oldest first
    #[must_use]
    pub fn conversation_history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn record_turn(&mut self, message: &str, reply: &str) {
        self.history.push(ChatMessage::user(message));
        self.history.push(ChatMessage::assistant(reply));

        let max = self.limits.max_history;
        if self.history.len() > max {
            self.history.drain(..self.history.len() - max);
        }
    }
}

fn status_error(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::invalid_input(message),
        StatusCode::UNAUTHORIZED => AppError::external_auth(SERVICE, message),
        StatusCode::TOO_MANY_REQUESTS => AppError::external_rate_limited(SERVICE, message),
        _ => AppError::external_service(SERVICE, message),
    }
}

/// `session_<epoch millis>_<9 lowercase alphanumerics>`
#[must_use]
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| char::from(SESSION_CHARSET[rng.gen_range(0..SESSION_CHARSET.len())]))
        .collect();
    format!("session_{}_{suffix}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SESSION_SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_history_trimmed_to_limit() {
        let mut client = ChatApiClient::new(
            "http://localhost:3000/",
            ConversationLimits { max_history: 4 },
        )
        .unwrap();
        assert_eq!(client.url(routes::CHAT), "http://localhost:3000/api/chat");

        for turn in 0..3 {
            client.record_turn(&format!("q{turn}"), &format!("a{turn}"));
        }
        let history = client.conversation_history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q1");
        assert_eq!(history[3].content, "a2");

        client.clear_history();
        assert!(client.conversation_history().is_empty());
    }

    #[test]
    fn test_status_mapping_keeps_server_message() {
        let message = "Message is required and must be a string";
        let err = status_error(StatusCode::BAD_REQUEST, message.to_owned());
        assert_eq!(err.client_message(), message);
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert_eq!(err.http_status(), 429);
    }
}
