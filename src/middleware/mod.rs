// ABOUTME: HTTP middleware shared by every route
// ABOUTME: CORS configuration for browser clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Cross-origin policy
pub mod cors;

pub use cors::setup_cors;
