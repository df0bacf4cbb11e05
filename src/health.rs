// ABOUTME: Service health reporting for the liveness endpoint
// ABOUTME: Reports uptime and which upstream services have credentials configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check model
//!
//! No upstream is contacted. A component without credentials is reported as
//! degraded because the requests that need it will be rejected.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::constants::service::{SERVICE_NAME, SERVICE_VERSION};

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every component is configured
    Healthy,
    /// Some component lacks credentials
    Degraded,
    /// The service cannot serve requests
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: HealthStatus,
    /// Service information
    pub service: ServiceInfo,
    /// Individual component checks
    pub checks: Vec<ComponentHealth>,
    /// Response timestamp, seconds since the epoch
    pub timestamp: u64,
}

/// Service information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
    /// Deployment environment
    pub environment: String,
    /// Service uptime in seconds
    pub uptime_seconds: u64,
}

/// Individual component health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Status description
    pub message: String,
}

impl ComponentHealth {
    fn credential(name: &str, configured: bool) -> Self {
        let (status, message) = if configured {
            (HealthStatus::Healthy, "Configured")
        } else {
            (HealthStatus::Degraded, "Not configured")
        };
        Self {
            name: name.to_owned(),
            status,
            message: message.to_owned(),
        }
    }
}

/// Which upstream services have credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfiguredServices {
    /// Model provider key present
    pub llm: bool,
    /// Listings key present
    pub listings: bool,
    /// Vector store key and host present
    pub vector_store: bool,
}

impl From<&ServerConfig> for ConfiguredServices {
    fn from(config: &ServerConfig) -> Self {
        Self {
            llm: config.llm.api_key.is_some(),
            listings: config.listings.api_key.is_some(),
            vector_store: config.vector_store.api_key.is_some()
                && config.vector_store.index_host.is_some(),
        }
    }
}

/// Health checker created once at startup
pub struct HealthChecker {
    start_time: Instant,
    environment: String,
    services: ConfiguredServices,
}

impl HealthChecker {
    /// Create a checker reporting `services`
    #[must_use]
    pub fn new(environment: impl Into<String>, services: ConfiguredServices) -> Self {
        Self {
            start_time: Instant::now(),
            environment: environment.into(),
            services,
        }
    }

    /// Services reported by this checker
    #[must_use]
    pub const fn services(&self) -> ConfiguredServices {
        self.services
    }

    /// Build the liveness report
    #[must_use]
    pub fn basic_health(&self) -> HealthResponse {
        let checks = vec![
            ComponentHealth {
                name: "service".into(),
                status: HealthStatus::Healthy,
                message: "Service is running".into(),
            },
            ComponentHealth::credential("llm", self.services.llm),
            ComponentHealth::credential("listings", self.services.listings),
            ComponentHealth::credential("vector_store", self.services.vector_store),
        ];

        let status = if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            service: ServiceInfo {
                name: SERVICE_NAME.into(),
                version: SERVICE_VERSION.to_owned(),
                environment: self.environment.clone(),
                uptime_seconds: self.start_time.elapsed().as_secs(),
            },
            checks,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}
