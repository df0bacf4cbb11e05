// ABOUTME: Assembles the message list submitted to the model for one conversational turn
// ABOUTME: System prompt first, truncated history next, user message plus context last
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tracing::debug;

use super::context::{compose_user_content, ConversationContext};
use crate::config::ConversationLimits;
use crate::llm::{ChatMessage, MessageRole};

/// Build the submitted message list.
///
/// Exactly one system message is emitted and it is always first: history
/// entries carrying the system role are discarded, as are function results
/// from earlier turns. When the remaining history exceeds
/// `limits.max_history`, only the most recent entries are kept, so the list
/// never grows past `max_history + 2`.
#[must_use]
pub fn build_messages(
    system_prompt: &str,
    history: &[ChatMessage],
    message: &str,
    context: Option<&ConversationContext>,
    limits: ConversationLimits,
) -> Vec<ChatMessage> {
    let retained: Vec<&ChatMessage> = history
        .iter()
        .filter(|entry| matches!(entry.role, MessageRole::User | MessageRole::Assistant))
        .collect();

    let dropped = retained.len().saturating_sub(limits.max_history);
    if dropped > 0 {
        debug!(
            dropped,
            max_history = limits.max_history,
            "Truncating conversation history"
        );
    }

    let mut messages = Vec::with_capacity(retained.len() - dropped + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(
        retained[dropped..]
            .iter()
            .map(|entry| ChatMessage::new(entry.role, entry.content.as_str())),
    );
    messages.push(ChatMessage::user(compose_user_content(message, context)));
    messages
}
