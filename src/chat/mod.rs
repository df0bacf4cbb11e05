// ABOUTME: Conversational turn pipeline: context, history, function dispatch and streaming
// ABOUTME: Everything between a validated chat request and the model's reply
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Structured context rendered into the user message
pub mod context;
/// Callable functions and their registry
pub mod functions;
/// Submitted message list assembly
pub mod history;
/// Non-streaming and streaming turn runner
pub mod orchestrator;
/// Stream-to-frame relay
pub mod stream;

pub use context::{ConversationContext, ConversationGoal, HelpTicket, PropertyPreferences};
pub use functions::{FetchPropertiesHandler, FunctionHandler, FunctionRegistry, FETCH_PROPERTIES};
pub use history::build_messages;
pub use orchestrator::{ChatOrchestrator, ChatReply, ChatTurn, CompletionSettings};
pub use stream::{relay, ContentFrame, RelayFrame};
