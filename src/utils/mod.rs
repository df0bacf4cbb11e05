// ABOUTME: Utility modules shared across the server, ingestion and client
// ABOUTME: HTTP client construction and real-estate formatting helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// HTTP client configuration and helpers
pub mod http_client;
/// Price, area, mortgage and validation helpers
pub mod property;
