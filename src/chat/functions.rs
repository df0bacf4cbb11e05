// ABOUTME: Registry of functions the model may call during a chat turn
// ABOUTME: Maps declared function names to handlers, including the listings fetcher
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Function Registry
//!
//! The orchestrator attaches [`FunctionRegistry::declarations`] to the first
//! completion and resolves the model's pick through [`FunctionRegistry::get`].
//! Adding a capability means registering another [`FunctionHandler`]; the
//! orchestrator does not change.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::constants::ingestion::FIRST_PAGE;
use crate::errors::AppError;
use crate::listings::ListingsSource;
use crate::llm::FunctionDeclaration;

/// Name under which the listings fetcher is declared
pub const FETCH_PROPERTIES: &str = "fetchProperties";

/// A function the model may invoke
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Declaration advertised to the model
    fn declaration(&self) -> FunctionDeclaration;

    /// Run the function with the model-supplied arguments.
    ///
    /// The returned payload is forwarded to the model verbatim and echoed to
    /// the caller.
    async fn invoke(&self, args: &Value) -> Result<Value, AppError>;
}

/// Name to handler table
pub struct FunctionRegistry {
    handlers: HashMap<String, Arc<dyn FunctionHandler>>,
    /// Registration order, so declarations are emitted deterministically
    order: Vec<String>,
}

impl FunctionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry with the listings fetcher wired to `listings`
    #[must_use]
    pub fn with_listings(listings: Arc<dyn ListingsSource>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FetchPropertiesHandler::new(listings)));
        registry
    }

    /// Register a handler
    ///
    /// # Returns
    ///
    /// `true` if registered, `false` if the name was already taken
    pub fn register(&mut self, handler: Arc<dyn FunctionHandler>) -> bool {
        let name = handler.declaration().name;
        if self.handlers.contains_key(&name) {
            warn!("Function '{}' is already registered, skipping", name);
            return false;
        }
        debug!("Registering function '{}'", name);
        self.order.push(name.clone());
        self.handlers.insert(name, handler);
        true
    }

    /// Handler for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FunctionHandler>> {
        self.handlers.get(name)
    }

    /// Whether `name` is declared
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Declarations in registration order
    #[must_use]
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.declaration())
            .collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches the latest listings page for the model to summarize
pub struct FetchPropertiesHandler {
    listings: Arc<dyn ListingsSource>,
}

impl FetchPropertiesHandler {
    /// Handler backed by `listings`
    #[must_use]
    pub fn new(listings: Arc<dyn ListingsSource>) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl FunctionHandler for FetchPropertiesHandler {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: FETCH_PROPERTIES.to_owned(),
            description: "Fetch properties based on user preferences and requirements".to_owned(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "preferences": {
                        "type": "object",
                        "properties": {}
                    }
                },
                "required": ["preferences"]
            })),
        }
    }

    async fn invoke(&self, args: &Value) -> Result<Value, AppError> {
        // The listings query is fixed; preferences only steer the summary.
        let preferences = args.get("preferences").cloned().unwrap_or_default();
        info!(%preferences, "Fetching properties for model");
        self.listings.fetch_page(FIRST_PAGE).await.map_err(|e| {
            AppError::function_dispatch(FETCH_PROPERTIES, e.message.clone()).with_source(e)
        })
    }
}
