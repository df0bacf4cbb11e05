// ABOUTME: Health check route handler for service monitoring
// ABOUTME: Reports liveness and which upstream services are configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::constants::routes;
use crate::health::HealthResponse;
use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        async fn health_handler(
            State(resources): State<Arc<ServerResources>>,
        ) -> Json<HealthResponse> {
            Json(resources.health.basic_health())
        }

        Router::new()
            .route(routes::HEALTH, get(health_handler))
            .with_state(resources)
    }
}
