// ABOUTME: Property listings source abstraction and its HTTP implementation
// ABOUTME: Fetches one page of listings with a fixed page size and sort order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Listings Source
//!
//! Both pipelines read listings through [`ListingsSource`]: the chat
//! function handler forwards the raw payload to the model, the ingestion
//! pipeline parses it into [`Property`] records.

pub mod models;

pub use models::{Address, Details, ListingsPage, MediaFile, Price, Property, Rooms};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, instrument};
use url::Url;

use crate::config::ListingsConfig;
use crate::constants::listings::{API_KEY_HEADER, REQUEST_TIMEOUT_SECS, RETURN_FIELDS};
use crate::errors::AppError;
use crate::utils::http_client::api_client;

/// Service label used in error messages
const SERVICE: &str = "Listings API";

/// Source of property listings
#[async_trait]
pub trait ListingsSource: Send + Sync {
    /// Fetch one page as the raw JSON payload
    async fn fetch_page(&self, page: u32) -> Result<Value, AppError>;

    /// Fetch one page and parse it into property records
    async fn fetch_properties(&self, page: u32) -> Result<ListingsPage, AppError> {
        let payload = self.fetch_page(page).await?;
        ListingsPage::from_value(payload).map_err(|e| {
            AppError::external_service(SERVICE, format!("Unexpected listings payload: {e}"))
        })
    }
}

/// HTTP client for the listings search endpoint
pub struct HttpListingsClient {
    client: Client,
    config: ListingsConfig,
}

impl HttpListingsClient {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ListingsConfig) -> Result<Self, AppError> {
        let client = api_client(REQUEST_TIMEOUT_SECS)?;
        Ok(Self { client, config })
    }

    /// Search URL for `page`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the base URL does not parse
    pub fn page_url(&self, page: u32) -> Result<Url, AppError> {
        let page_size = self.config.page_size.to_string();
        let page = page.to_string();
        Url::parse_with_params(
            &self.config.api_url,
            &[
                ("return", RETURN_FIELDS),
                ("sort", self.config.sort.as_str()),
                ("per-page", page_size.as_str()),
                ("page", page.as_str()),
            ],
        )
        .map_err(|e| AppError::config(format!("Invalid LISTINGS_API_URL: {e}")))
    }
}

#[async_trait]
impl ListingsSource for HttpListingsClient {
    #[instrument(skip(self))]
    async fn fetch_page(&self, page: u32) -> Result<Value, AppError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::config_missing("Listings API key is not configured"))?;
        let url = self.page_url(page)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach listings API: {}", e);
                AppError::external_service(SERVICE, format!("Request failed: {e}")).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "Listings API returned an error status");
            return Err(AppError::external_service(
                SERVICE,
                format!("HTTP error! status: {status}"),
            ));
        }

        let payload: Value = response.json().await.map_err(|e| {
            AppError::external_service(SERVICE, format!("Invalid JSON in response: {e}"))
        })?;

        info!(page, "Fetched listings page");
        Ok(payload)
    }
}
