// ABOUTME: Main library entry point for the PropertyBot real-estate assistant
// ABOUTME: Chat orchestration with listing lookups, streaming relay and batch listing ingestion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # PropertyBot Server
//!
//! A real-estate chat assistant. Browser clients post a message with their
//! conversation history; the server adds a fixed system prompt, truncates the
//! history and asks the language model for a reply. The model may call a
//! single declared function that pulls current listings, whose payload is
//! then summarized by a second completion. Replies can also be streamed.
//!
//! A second pipeline ingests listings into a vector store: each property's
//! photos are captioned, a descriptive text is synthesized and embedded, and
//! the vectors are upserted in paced batches.
//!
//! ## Architecture
//!
//! - **chat**: history shaping, function registry, turn orchestration, stream relay
//! - **ingestion**: captioning, text and metadata synthesis, batch driver
//! - **llm / listings / `vector_store`**: injectable upstream clients
//! - **routes / server**: axum surface over [`resources::ServerResources`]
//! - **client**: Rust client owning a conversation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use propertybot_server::config::ServerConfig;
//! use propertybot_server::resources::ServerResources;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = ServerResources::from_config(config)?;
//!     propertybot_server::server::serve(resources).await?;
//!     Ok(())
//! }
//! ```

/// Conversational turn pipeline
pub mod chat;

/// Client for the chat endpoints
pub mod client;

/// Environment configuration
pub mod config;

/// Defaults and fixed strings
pub mod constants;

/// Unified error handling
pub mod errors;

/// Liveness reporting
pub mod health;

/// Batch listing ingestion
pub mod ingestion;

/// Property listings source
pub mod listings;

/// Language model providers
pub mod llm;

/// Logging configuration and structured log helpers
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Shared server resources
pub mod resources;

/// Retry and backoff policy
pub mod retry;

/// HTTP routes
pub mod routes;

/// HTTP server assembly
pub mod server;

/// Shared helpers
pub mod utils;

/// Vector store client
pub mod vector_store;
