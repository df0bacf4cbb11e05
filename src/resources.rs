// ABOUTME: Centralized resource container for dependency injection in the HTTP server
// ABOUTME: Builds provider clients once at startup and shares them with every handler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources Module
//!
//! Provider clients are constructed once and handed to the chat orchestrator
//! and the ingestion pipeline as trait objects. Tests build the same container
//! from fakes through [`ServerResources::with_providers`].

use std::sync::Arc;

use tracing::info;

use crate::chat::{ChatOrchestrator, CompletionSettings, FunctionRegistry};
use crate::config::ServerConfig;
use crate::errors::AppError;
use crate::health::{ConfiguredServices, HealthChecker};
use crate::ingestion::IngestionPipeline;
use crate::listings::{HttpListingsClient, ListingsSource};
use crate::llm::{
    EmbeddingProvider, LlmProvider, OpenAiConfig, OpenAiProvider, VisionProvider,
};
use crate::vector_store::{PineconeClient, VectorStore};

/// Injectable upstream clients
#[derive(Clone)]
pub struct Providers {
    /// Chat completions
    pub llm: Arc<dyn LlmProvider>,
    /// Image captions
    pub vision: Arc<dyn VisionProvider>,
    /// Text embeddings
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Property listings
    pub listings: Arc<dyn ListingsSource>,
    /// Vector upserts
    pub store: Arc<dyn VectorStore>,
}

impl Providers {
    /// Production clients for `config`. One `OpenAI` client serves chat,
    /// vision and embeddings.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created
    pub fn from_config(config: &ServerConfig) -> Result<Self, AppError> {
        let openai = Arc::new(OpenAiProvider::new(OpenAiConfig::from(&config.llm))?);
        let listings = Arc::new(HttpListingsClient::new(config.listings.clone())?);
        let store = Arc::new(PineconeClient::new(config.vector_store.clone())?);

        Ok(Self {
            llm: openai.clone(),
            vision: openai.clone(),
            embedder: openai,
            listings,
            store,
        })
    }
}

/// Shared state of the HTTP server
#[derive(Clone)]
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Conversational turn runner
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Batch ingestion driver
    pub ingestion: Arc<IngestionPipeline>,
    /// Liveness reporting
    pub health: Arc<HealthChecker>,
}

impl ServerResources {
    /// Build resources with production clients
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created
    pub fn from_config(config: ServerConfig) -> Result<Self, AppError> {
        let providers = Providers::from_config(&config)?;
        Ok(Self::with_providers(Arc::new(config), providers))
    }

    /// Build resources around the given clients
    #[must_use]
    pub fn with_providers(config: Arc<ServerConfig>, providers: Providers) -> Self {
        let functions = Arc::new(FunctionRegistry::with_listings(providers.listings.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            providers.llm.clone(),
            functions,
            CompletionSettings::from(&config.llm),
            config.conversation,
        ));

        let ingestion = Arc::new(IngestionPipeline::new(
            providers.listings,
            providers.vision,
            providers.embedder,
            providers.store,
            &config.ingestion,
        ));

        let services = ConfiguredServices {
            llm: providers.llm.has_credentials(),
            ..ConfiguredServices::from(config.as_ref())
        };
        let health = Arc::new(HealthChecker::new(
            config.environment.to_string(),
            services,
        ));

        info!(
            llm = services.llm,
            listings = services.listings,
            vector_store = services.vector_store,
            "Server resources initialized"
        );

        Self {
            config,
            orchestrator,
            ingestion,
            health,
        }
    }
}
