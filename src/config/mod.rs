// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Re-exports the environment-backed server configuration types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! Configuration is environment-only: [`environment::ServerConfig::from_env`]
//! loads `.env` when present and falls back to [`crate::constants`].

/// Environment and server configuration
pub mod environment;

pub use environment::{
    ConversationLimits, Environment, IngestionSettings, ListingsConfig, LlmConfig, ServerConfig,
    VectorStoreConfig,
};
