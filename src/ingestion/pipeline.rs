// ABOUTME: Batch ingestion driver: fetch, caption, synthesize, embed and upsert listings
// ABOUTME: Per-property and per-batch failures are logged and skipped, never fatal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Ingestion Pipeline
//!
//! Runs strictly sequentially: one listings page is fetched, split into
//! batches of `batch_size`, and each batch is prepared property by property
//! before a single upsert. A fixed pause separates consecutive batches.
//!
//! Only the listings fetch can fail the run. An embedding failure drops that
//! property; an upsert failure drops that batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::captioning::ImageCaptioner;
use super::metadata::build_metadata;
use super::text::build_property_text;
use crate::config::IngestionSettings;
use crate::constants::ingestion::FIRST_PAGE;
use crate::errors::{AppError, ErrorCode};
use crate::listings::{ListingsSource, Property};
use crate::llm::{EmbeddingProvider, VisionProvider};
use crate::logging::AppLogger;
use crate::retry::Backoff;
use crate::vector_store::{VectorRecord, VectorStore};

/// One property that made it into the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedProperty {
    /// Listing id
    pub id: String,
    /// Listing title, empty when absent
    pub title: String,
    /// Image captions, sentinel included
    pub captions: Vec<String>,
    /// Embedded text
    pub text: String,
    /// Embedding length
    pub dimensions: usize,
}

/// Result of an ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSummary {
    /// The run completed
    pub success: bool,
    /// Properties upserted
    pub processed: usize,
    /// Records returned by the listings source, unreadable ones included
    pub total_found: usize,
    /// Details of every upserted property
    pub properties: Vec<IngestedProperty>,
}

/// Collaborators and pacing for a run
pub struct IngestionPipeline {
    listings: Arc<dyn ListingsSource>,
    captioner: ImageCaptioner,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    batch_backoff: Backoff,
}

impl IngestionPipeline {
    /// Assemble a pipeline
    #[must_use]
    pub fn new(
        listings: Arc<dyn ListingsSource>,
        vision: Arc<dyn VisionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        settings: &IngestionSettings,
    ) -> Self {
        Self {
            listings,
            captioner: ImageCaptioner::new(vision, settings),
            embedder,
            store,
            batch_size: settings.batch_size.max(1),
            batch_backoff: Backoff::Fixed(settings.batch_delay()),
        }
    }

    /// Run one ingestion pass over the first listings page
    ///
    /// # Errors
    ///
    /// Returns an error only when the listings page cannot be fetched or parsed
    #[instrument(skip(self), fields(index = %self.store.index_name(), batch_size = self.batch_size))]
    pub async fn run(&self) -> Result<IngestionSummary, AppError> {
        let page = self.listings.fetch_properties(FIRST_PAGE).await?;
        let total_found = page.total_found;
        info!(
            total_found,
            skipped = page.skipped(),
            "Fetched properties for ingestion"
        );

        let mut summary = IngestionSummary {
            success: true,
            processed: 0,
            total_found,
            properties: Vec::new(),
        };

        for (index, batch) in page.properties.chunks(self.batch_size).enumerate() {
            if index > 0 {
                self.batch_backoff.wait(1).await;
            }
            self.run_batch(index, batch, &mut summary).await;
        }

        info!(
            processed = summary.processed,
            total_found = summary.total_found,
            "Ingestion run finished"
        );
        Ok(summary)
    }

    async fn run_batch(&self, index: usize, batch: &[Property], summary: &mut IngestionSummary) {
        let mut records = Vec::with_capacity(batch.len());
        let mut prepared = Vec::with_capacity(batch.len());

        for property in batch {
            match self.prepare(property).await {
                Ok((record, ingested)) => {
                    records.push(record);
                    prepared.push(ingested);
                }
                Err(e) => warn!(property_id = %property.id, batch = index, "Skipping property: {}", e),
            }
        }

        if records.is_empty() {
            AppLogger::log_ingestion_batch(index, batch.len(), 0, false);
            return;
        }

        match self.store.upsert(&records).await {
            Ok(acknowledged) => {
                if acknowledged != records.len() {
                    warn!(
                        batch = index,
                        sent = records.len(),
                        acknowledged,
                        "Vector store acknowledged a different record count"
                    );
                }
                AppLogger::log_ingestion_batch(index, batch.len(), prepared.len(), true);
                summary.processed += prepared.len();
                summary.properties.extend(prepared);
            }
            Err(e) => {
                let e = e.with_details(serde_json::json!({ "batch": index }));
                error!(batch = index, details = %e.context.details, "Batch upsert failed: {}", e);
                AppLogger::log_ingestion_batch(index, batch.len(), 0, false);
            }
        }
    }

    /// Caption, synthesize and embed one property
    async fn prepare(&self, property: &Property) -> Result<(VectorRecord, IngestedProperty), AppError> {
        let captions = self.captioner.caption_property(property).await;
        let text = build_property_text(property, &captions);

        let values = self.embedder.embed(&text).await.map_err(|e| {
            AppError::new(ErrorCode::EmbeddingFailed, e.message.clone())
                .with_resource_id(&property.id)
                .with_source(e)
        })?;

        let metadata = build_metadata(property, &text, &captions);
        let ingested = IngestedProperty {
            id: property.id.clone(),
            title: property.title.clone().unwrap_or_default(),
            captions,
            text,
            dimensions: values.len(),
        };
        let record = VectorRecord {
            id: property.id.clone(),
            values,
            metadata,
        };
        Ok((record, ingested))
    }
}
