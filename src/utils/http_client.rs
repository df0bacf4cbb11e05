// ABOUTME: Shared reqwest client construction with connect and request timeouts
// ABOUTME: Used by the model, listings and vector store clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::errors::AppError;

/// Connect timeout applied when a caller does not choose one
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Create a client with the given request and connect timeouts
///
/// # Errors
///
/// Returns an internal error if the TLS backend cannot be initialised
pub fn create_client_with_timeout(
    timeout_secs: u64,
    connect_timeout_secs: u64,
) -> Result<Client, AppError> {
    create_custom_client(|builder| {
        builder
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
    })
}

/// Create a client from a customised builder
///
/// # Errors
///
/// Returns an internal error if the client cannot be built
pub fn create_custom_client<F>(config_fn: F) -> Result<Client, AppError>
where
    F: FnOnce(ClientBuilder) -> ClientBuilder,
{
    config_fn(ClientBuilder::new())
        .build()
        .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")).with_source(e))
}

/// Client for upstream API calls with the default connect timeout
///
/// # Errors
///
/// Returns an internal error if the client cannot be built
pub fn api_client(timeout_secs: u64) -> Result<Client, AppError> {
    create_client_with_timeout(timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS)
}
