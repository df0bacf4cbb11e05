// ABOUTME: Vector store abstraction and Pinecone data-plane upsert client
// ABOUTME: Records carry an id, an embedding and primitive-only metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Vector Store
//!
//! The ingestion pipeline writes one [`VectorRecord`] per embedded property.
//! Metadata is restricted to [`MetadataValue`] so a record never carries a
//! null or a nested object, which the store would reject.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use crate::config::VectorStoreConfig;
use crate::constants::vector_store::API_KEY_HEADER;
use crate::errors::{AppError, ErrorCode};
use crate::utils::http_client::api_client;

/// Service label used in error messages
const SERVICE: &str = "Pinecone";

/// Upsert request timeout
const UPSERT_TIMEOUT_SECS: u64 = 60;

/// Metadata value accepted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Text
    Text(String),
    /// Number
    Number(f64),
    /// Boolean
    Bool(bool),
    /// List of strings
    List(Vec<String>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Flat metadata map
pub type Metadata = BTreeMap<String, MetadataValue>;

/// One record to upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record id
    pub id: String,
    /// Embedding
    pub values: Vec<f32>,
    /// Flat metadata
    pub metadata: Metadata,
}

/// Vector store write side
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Index the records are written to
    fn index_name(&self) -> &str;

    /// Upsert records, returning how many the store acknowledged
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize, AppError>;
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

/// Pinecone data-plane client
pub struct PineconeClient {
    client: Client,
    config: VectorStoreConfig,
}

impl PineconeClient {
    /// Create a client for the configured index
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: VectorStoreConfig) -> Result<Self, AppError> {
        let client = api_client(UPSERT_TIMEOUT_SECS)?;
        Ok(Self { client, config })
    }

    /// Whether both the key and the index host are set
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.config.api_key.is_some() && self.config.index_host.is_some()
    }

    /// Upsert URL for the configured index host
    fn upsert_url(host: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}/vectors/upsert")
        } else {
            format!("https://{host}/vectors/upsert")
        }
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    fn index_name(&self) -> &str {
        &self.config.index_name
    }

    #[instrument(skip(self, records), fields(index = %self.config.index_name, records = records.len()))]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize, AppError> {
        let (Some(api_key), Some(host)) = (
            self.config.api_key.as_deref(),
            self.config.index_host.as_deref(),
        ) else {
            return Err(AppError::config_missing(
                "Pinecone API key or index host is not configured",
            ));
        };

        if records.is_empty() {
            return Ok(0);
        }

        let body = UpsertRequest {
            vectors: records,
            namespace: self.config.namespace.as_deref(),
        };

        let response = self
            .client
            .post(Self::upsert_url(host))
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::new(ErrorCode::UpsertFailed, format!("{SERVICE}: request failed: {e}"))
                    .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Upsert rejected: {}", text);
            return Err(AppError::new(
                ErrorCode::UpsertFailed,
                format!("{SERVICE}: upsert failed with status {status}"),
            ));
        }

        let parsed: UpsertResponse = response.json().await.map_err(|e| {
            AppError::new(
                ErrorCode::UpsertFailed,
                format!("{SERVICE}: invalid upsert response: {e}"),
            )
        })?;

        info!(upserted = parsed.upserted_count, "Upserted vectors");
        Ok(parsed.upserted_count)
    }
}
