// ABOUTME: System prompts for LLM interactions loaded at compile time
// ABOUTME: Provides the PropertyBot real estate assistant prompt used on every chat turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # System Prompts
//!
//! Prompts live in markdown files next to this module and are embedded at
//! compile time.

/// PropertyBot assistant system prompt
///
/// Covers the assistant's role, when to call `fetchProperties`, how to
/// present listing results and the response format.
pub const PROPERTYBOT_SYSTEM_PROMPT: &str = include_str!("propertybot_system.md");

/// Get the system prompt placed first in every submitted conversation
#[must_use]
pub const fn system_prompt() -> &'static str {
    PROPERTYBOT_SYSTEM_PROMPT
}
