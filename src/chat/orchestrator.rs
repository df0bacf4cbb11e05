// ABOUTME: Runs one conversational turn against the model, dispatching declared functions
// ABOUTME: Produces plain replies, property replies or a degraded apology; prepares streams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat Orchestrator
//!
//! One turn is at most two completions. The first carries the function
//! declarations with automatic selection. When the model picks a registered
//! function, its result is appended as a `function` message and a second,
//! declaration-free completion summarizes it. Failures after the model asked
//! for a function degrade to a fixed apology instead of an error.
//!
//! Streaming turns never attach declarations, so a streamed reply cannot
//! trigger a function call.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::context::ConversationContext;
use super::functions::FunctionRegistry;
use super::history::build_messages;
use crate::config::{ConversationLimits, LlmConfig};
use crate::constants::conversation::{FUNCTION_FAILURE_APOLOGY, FUNCTION_RESULT_FALLBACK};
use crate::errors::AppError;
use crate::llm::{
    system_prompt, ChatMessage, ChatRequest, ChatResponseWithFunctions, ChatStream, FunctionCall,
    LlmProvider, TokenUsage,
};
use crate::logging::AppLogger;

/// Message shown when no provider credential is configured
pub const MSG_MISSING_API_KEY: &str = "OpenAI API key is not configured";

/// One user submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Literal user message
    pub message: String,
    /// Prior messages, oldest first
    pub history: Vec<ChatMessage>,
    /// Optional structured context
    pub context: Option<ConversationContext>,
}

impl ChatTurn {
    /// Turn without history or context
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a non-streaming turn, serialized in the shape clients expect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    /// The model called a function and summarized its result
    Properties {
        /// Summary text
        message: String,
        /// Raw function payload
        properties: Value,
    },
    /// The model asked for a function but serving it failed
    Degraded {
        /// Fixed apology
        message: String,
        /// Always `true`
        error: bool,
    },
    /// Plain assistant reply
    Answer {
        /// Assistant text
        message: String,
        /// Token accounting, when the provider reports it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },
}

impl ChatReply {
    /// Text shown to the user
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Properties { message, .. }
            | Self::Degraded { message, .. }
            | Self::Answer { message, .. } => message,
        }
    }

    /// Whether the turn degraded to the apology
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    fn degraded() -> Self {
        Self::Degraded {
            message: FUNCTION_FAILURE_APOLOGY.to_owned(),
            error: true,
        }
    }
}

/// Sampling settings applied to every completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    /// Model override; the provider default applies when `None`
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token ceiling
    pub max_tokens: u32,
}

impl From<&LlmConfig> for CompletionSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: Some(config.model.clone()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Stateless turn runner; all collaborators are injected
pub struct ChatOrchestrator {
    llm: Arc<dyn LlmProvider>,
    functions: Arc<FunctionRegistry>,
    settings: CompletionSettings,
    limits: ConversationLimits,
}

impl ChatOrchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        functions: Arc<FunctionRegistry>,
        settings: CompletionSettings,
        limits: ConversationLimits,
    ) -> Self {
        Self {
            llm,
            functions,
            settings,
            limits,
        }
    }

    /// History cap in force
    #[must_use]
    pub const fn limits(&self) -> ConversationLimits {
        self.limits
    }

    /// Whether the provider has a credential
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.llm.has_credentials()
    }

    /// Fail fast when no credential is configured
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider has no credential
    pub fn ensure_configured(&self) -> Result<(), AppError> {
        if self.llm.has_credentials() {
            Ok(())
        } else {
            Err(AppError::config_missing(MSG_MISSING_API_KEY))
        }
    }

    fn request_for(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let request = ChatRequest::new(messages)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);
        match &self.settings.model {
            Some(model) => request.with_model(model),
            None => request,
        }
    }

    fn messages_for(&self, turn: &ChatTurn) -> Vec<ChatMessage> {
        build_messages(
            system_prompt(),
            &turn.history,
            &turn.message,
            turn.context.as_ref(),
            self.limits,
        )
    }

    /// Run a non-streaming turn
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any network call when the
    /// provider has no credential, and the provider's error when the first
    /// completion fails. Failures after a function call degrade to
    /// [`ChatReply::Degraded`] instead.
    pub async fn respond(&self, turn: &ChatTurn) -> Result<ChatReply, AppError> {
        self.ensure_configured()?;

        let mut messages = self.messages_for(turn);
        let submitted_len = messages.len();

        let first = self.first_completion(self.request_for(messages.clone())).await?;

        let Some(call) = first.function_call.clone() else {
            AppLogger::log_chat_turn(turn.history.len(), submitted_len, None);
            return Ok(Self::plain_reply(first));
        };

        if !self.functions.contains(&call.name) {
            warn!(function = %call.name, "Model called an undeclared function; treating as plain reply");
            AppLogger::log_chat_turn(turn.history.len(), submitted_len, None);
            return Ok(Self::plain_reply(first));
        }

        let reply = self.dispatch(&call, &mut messages).await;
        AppLogger::log_chat_turn(turn.history.len(), submitted_len, Some(&call.name));
        Ok(reply)
    }

    async fn first_completion(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponseWithFunctions, AppError> {
        let declarations = if self.llm.capabilities().supports_function_calling() {
            self.functions.declarations()
        } else {
            Vec::new()
        };

        if declarations.is_empty() {
            let response = self.llm.complete(&request).await?;
            return Ok(ChatResponseWithFunctions {
                content: Some(response.content),
                function_call: None,
                model: response.model,
                usage: response.usage,
                finish_reason: response.finish_reason,
            });
        }

        self.llm
            .complete_with_functions(&request, &declarations)
            .await
    }

    fn plain_reply(response: ChatResponseWithFunctions) -> ChatReply {
        ChatReply::Answer {
            message: response.content.unwrap_or_default(),
            usage: response.usage,
        }
    }

    /// Serve `call` and summarize its result with a second completion
    async fn dispatch(&self, call: &FunctionCall, messages: &mut Vec<ChatMessage>) -> ChatReply {
        let Some(handler) = self.functions.get(&call.name) else {
            return ChatReply::degraded();
        };

        let started = Instant::now();
        let payload = match handler.invoke(&call.args).await {
            Ok(payload) => payload,
            Err(e) => {
                AppLogger::log_function_dispatch(&call.name, false, elapsed_ms(started));
                error!(function = %call.name, "Function dispatch failed: {}", e);
                return ChatReply::degraded();
            }
        };
        AppLogger::log_function_dispatch(&call.name, true, elapsed_ms(started));

        messages.push(ChatMessage::function(&call.name, payload.to_string()));

        match self.llm.complete(&self.request_for(messages.clone())).await {
            Ok(summary) => {
                let message = if summary.content.is_empty() {
                    FUNCTION_RESULT_FALLBACK.to_owned()
                } else {
                    summary.content
                };
                info!(function = %call.name, "Function result summarized");
                ChatReply::Properties {
                    message,
                    properties: payload,
                }
            }
            Err(e) => {
                error!(function = %call.name, "Summary completion failed: {}", e);
                ChatReply::degraded()
            }
        }
    }

    /// Open a token stream for `turn`. No function declarations are attached.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider has no credential and
    /// the provider's error when the stream cannot be opened
    pub async fn open_stream(&self, turn: &ChatTurn) -> Result<ChatStream, AppError> {
        self.ensure_configured()?;
        let messages = self.messages_for(turn);
        AppLogger::log_chat_turn(turn.history.len(), messages.len(), None);
        let request = self.request_for(messages).with_streaming();
        self.llm.complete_stream(&request).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
