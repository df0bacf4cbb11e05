// ABOUTME: Unified error type, error codes and HTTP response rendering for the server
// ABOUTME: Maps provider, ingestion and validation failures onto stable client-facing shapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the crate returns [`AppError`]. The error code
//! decides the HTTP status and the client-facing message; the free-form
//! `message` and the optional `source` are only ever logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// Client-facing message for provider credential rejections
pub const MSG_INVALID_API_KEY: &str = "Invalid API key";
/// Client-facing message for provider throttling
pub const MSG_RATE_LIMITED: &str = "Rate limit exceeded. Please try again later.";
/// Client-facing message for requests the provider refused as malformed
pub const MSG_INVALID_PROVIDER_REQUEST: &str = "Invalid request to OpenAI API";
/// Client-facing message for everything that is not the caller's fault
pub const MSG_INTERNAL: &str = "Internal server error";
/// Client-facing message when a stream could not be established
pub const MSG_STREAMING_FAILED: &str = "Streaming failed";

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,

    // External Services (5000-5999)
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    #[serde(rename = "EXTERNAL_AUTH_FAILED")]
    ExternalAuthFailed = 5002,
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5003,
    #[serde(rename = "EXTERNAL_REQUEST_INVALID")]
    ExternalRequestInvalid = 5004,

    // Pipeline stages (7000-7999)
    #[serde(rename = "FUNCTION_DISPATCH_FAILED")]
    FunctionDispatchFailed = 7000,
    #[serde(rename = "CAPTION_FAILED")]
    CaptionFailed = 7001,
    #[serde(rename = "EMBEDDING_FAILED")]
    EmbeddingFailed = 7002,
    #[serde(rename = "UPSERT_FAILED")]
    UpsertFailed = 7003,
    #[serde(rename = "STREAM_INTERRUPTED")]
    StreamInterrupted = 7004,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput
            | Self::MissingRequiredField
            | Self::InvalidFormat
            | Self::ExternalRequestInvalid => 400,

            // 401 Unauthorized
            Self::ExternalAuthFailed => 401,

            // 429 Too Many Requests
            Self::ExternalRateLimited => 429,

            // 500 Internal Server Error
            Self::ExternalServiceError
            | Self::ExternalServiceUnavailable
            | Self::FunctionDispatchFailed
            | Self::CaptionFailed
            | Self::EmbeddingFailed
            | Self::UpsertFailed
            | Self::StreamInterrupted
            | Self::ConfigError
            | Self::ConfigMissing
            | Self::InternalError
            | Self::SerializationError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::InvalidFormat => "The data format is invalid",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ExternalAuthFailed => "Authentication with external service failed",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ExternalRequestInvalid => "External service rejected the request",
            Self::FunctionDispatchFailed => "Function dispatch failed",
            Self::CaptionFailed => "Image captioning failed",
            Self::EmbeddingFailed => "Embedding generation failed",
            Self::UpsertFailed => "Vector upsert failed",
            Self::StreamInterrupted => "Response stream was interrupted",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigMissing => "Required configuration is missing",
            Self::InternalError => "An internal server error occurred",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether a retry of the failed operation could plausibly succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ExternalServiceError
                | Self::ExternalServiceUnavailable
                | Self::ExternalRateLimited
                | Self::CaptionFailed
                | Self::StreamInterrupted
        )
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Request ID for tracing
    pub request_id: Option<String>,
    /// Resource ID if applicable (property id, image url, ...)
    pub resource_id: Option<String>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_id: None,
            resource_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a request ID to the error context
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.context.request_id = Some(request_id.into());
        self
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Message safe to show to API callers.
    ///
    /// Validation and configuration messages are authored by this crate and
    /// returned as-is; provider and internal failures collapse to fixed strings.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self.code {
            ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::ConfigMissing
            | ErrorCode::ConfigError => self.message.clone(),
            ErrorCode::ExternalAuthFailed => MSG_INVALID_API_KEY.to_owned(),
            ErrorCode::ExternalRateLimited => MSG_RATE_LIMITED.to_owned(),
            ErrorCode::ExternalRequestInvalid => MSG_INVALID_PROVIDER_REQUEST.to_owned(),
            ErrorCode::StreamInterrupted => MSG_STREAMING_FAILED.to_owned(),
            _ => MSG_INTERNAL.to_owned(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format: `{ "error": "...", "code": "..." }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Client-facing message
    pub error: String,
    /// Stable machine-readable code
    pub code: ErrorCode,
    /// Request ID when one was attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: error.client_message(),
            code: error.code,
            request_id: error.context.request_id.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(
                code = ?self.code,
                status = status.as_u16(),
                resource_id = ?self.context.resource_id,
                source = ?self.source.as_ref().map(ToString::to_string),
                "Request failed: {}",
                self.message
            );
        } else {
            warn!(
                code = ?self.code,
                status = status.as_u16(),
                "Request rejected: {}",
                self.message
            );
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// A required setting (usually a credential) is absent
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigMissing, message)
    }

    /// External service error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// External service rejected our credentials
    pub fn external_auth(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalAuthFailed,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// External service throttled the request
    pub fn external_rate_limited(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalRateLimited,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// External service refused the request as malformed
    pub fn external_request_invalid(
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ExternalRequestInvalid,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// A model-requested function failed to execute
    pub fn function_dispatch(function: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FunctionDispatchFailed, message).with_resource_id(function)
    }

    /// Provider stream ended abnormally
    pub fn stream_interrupted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StreamInterrupted, message)
    }

    /// Serialization or parsing failure
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }
}

/// Conversion from `anyhow::Error` to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.chain().nth(1) {
            Some(source) => Self::new(ErrorCode::InternalError, error.to_string())
                .with_details(serde_json::json!({
                    "source": source.to_string()
                })),
            None => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {error}"))
    }
}
