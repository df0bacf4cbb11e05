// ABOUTME: Route module organization for the PropertyBot HTTP endpoints
// ABOUTME: Chat, ingestion and health routes, each with thin handlers over shared resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the PropertyBot server
//!
//! Each domain module exposes a `*Routes::routes` constructor returning a
//! stateful [`axum::Router`]; [`crate::server`] merges them.

/// Chat submit and streaming routes
pub mod chat;
/// Health check route
pub mod health;
/// Ingestion trigger route
pub mod ingest;

pub use chat::ChatRoutes;
pub use health::HealthRoutes;
pub use ingest::IngestRoutes;
