// ABOUTME: Ingestion trigger route
// ABOUTME: Runs one ingestion pass and returns its summary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::constants::routes;
use crate::errors::AppError;
use crate::ingestion::IngestionSummary;
use crate::resources::ServerResources;

/// Message returned when upserts could not be sent
pub const MSG_VECTOR_STORE_MISSING: &str = "Vector store is not configured";

/// Ingestion routes implementation
pub struct IngestRoutes;

impl IngestRoutes {
    /// Create the ingestion route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(routes::INGEST, post(Self::handle_ingest))
            .with_state(resources)
    }

    /// Run to completion; the request holds until the last batch is upserted
    async fn handle_ingest(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Json<IngestionSummary>, AppError> {
        resources.orchestrator.ensure_configured()?;
        if !resources.health.services().vector_store {
            return Err(AppError::config_missing(MSG_VECTOR_STORE_MISSING));
        }

        info!("Ingestion run requested");
        let summary = resources.ingestion.run().await?;
        Ok(Json(summary))
    }
}
