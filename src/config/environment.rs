// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Reads provider credentials, conversation limits and ingestion pacing from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use crate::constants::{conversation, ingestion, listings, llm, network, vector_store};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Environment type for logging and defaults
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// History window applied to every conversation.
///
/// The server truncates submitted history to `max_history` entries and the
/// bundled client trims its local history to the same bound, so both sides
/// read the cap from this one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLimits {
    /// Prior messages kept per turn
    pub max_history: usize,
}

impl Default for ConversationLimits {
    fn default() -> Self {
        Self {
            max_history: conversation::MAX_CONVERSATION_HISTORY,
        }
    }
}

/// OpenAI-compatible provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; requests fail with a configuration error while unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Chat model
    pub model: String,
    /// Vision model for image captions
    pub vision_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Completion token ceiling
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: llm::DEFAULT_BASE_URL.to_owned(),
            model: llm::DEFAULT_MODEL.to_owned(),
            vision_model: llm::DEFAULT_VISION_MODEL.to_owned(),
            embedding_model: llm::DEFAULT_EMBEDDING_MODEL.to_owned(),
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            temperature: llm::DEFAULT_TEMPERATURE,
        }
    }
}

/// Listings API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsConfig {
    /// Search endpoint
    pub api_url: String,
    /// API key sent as `X-Api-Key`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Listings per page
    pub page_size: u32,
    /// Sort expression
    pub sort: String,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            api_url: listings::DEFAULT_API_URL.to_owned(),
            api_key: None,
            page_size: listings::DEFAULT_PAGE_SIZE,
            sort: listings::DEFAULT_SORT.to_owned(),
        }
    }
}

/// Pinecone settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Data-plane host of the index, e.g. `properties-abc123.svc.pinecone.io`
    pub index_host: Option<String>,
    /// Index name, informational
    pub index_name: String,
    /// Namespace inside the index
    pub namespace: Option<String>,
}

/// Ingestion pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Properties per upsert
    pub batch_size: usize,
    /// Pause between batches in milliseconds
    pub batch_delay_ms: u64,
    /// Pause between caption requests in milliseconds
    pub image_delay_ms: u64,
    /// Images captioned per property
    pub max_images: usize,
    /// Caption attempts per image
    pub caption_max_attempts: u32,
    /// Linear caption backoff base in milliseconds
    pub caption_retry_delay_ms: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            batch_size: ingestion::DEFAULT_BATCH_SIZE,
            batch_delay_ms: ingestion::DEFAULT_BATCH_DELAY_MS,
            image_delay_ms: ingestion::DEFAULT_IMAGE_DELAY_MS,
            max_images: ingestion::DEFAULT_MAX_IMAGES,
            caption_max_attempts: ingestion::DEFAULT_CAPTION_MAX_ATTEMPTS,
            caption_retry_delay_ms: ingestion::DEFAULT_CAPTION_RETRY_DELAY_MS,
        }
    }
}

impl IngestionSettings {
    /// Pause between batches
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Pause between caption requests
    #[must_use]
    pub const fn image_delay(&self) -> Duration {
        Duration::from_millis(self.image_delay_ms)
    }

    /// Linear caption backoff base
    #[must_use]
    pub const fn caption_retry_delay(&self) -> Duration {
        Duration::from_millis(self.caption_retry_delay_ms)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
    /// Language model provider
    pub llm: LlmConfig,
    /// Conversation shaping
    pub conversation: ConversationLimits,
    /// Listings API
    pub listings: ListingsConfig,
    /// Vector store
    pub vector_store: VectorStoreConfig,
    /// Ingestion pacing
    pub ingestion: IngestionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: network::DEFAULT_HOST.to_owned(),
            http_port: network::DEFAULT_HTTP_PORT,
            environment: Environment::default(),
            cors_origins: parse_origins(network::DEFAULT_CORS_ORIGINS),
            llm: LlmConfig::default(),
            conversation: ConversationLimits::default(),
            listings: ListingsConfig::default(),
            vector_store: VectorStoreConfig {
                index_name: vector_store::DEFAULT_INDEX.to_owned(),
                ..VectorStoreConfig::default()
            },
            ingestion: IngestionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        Self::from_current_env()
    }

    /// Build configuration from the process environment without touching `.env`
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed
    pub fn from_current_env() -> Result<Self> {
        let config = Self {
            host: env_var_or("HOST", network::DEFAULT_HOST),
            http_port: env_var_or("HTTP_PORT", &network::DEFAULT_HTTP_PORT.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            cors_origins: parse_origins(&env_var_or(
                "CORS_ALLOWED_ORIGINS",
                network::DEFAULT_CORS_ORIGINS,
            )),
            llm: LlmConfig {
                api_key: optional_env("OPENAI_API_KEY"),
                base_url: env_var_or("OPENAI_BASE_URL", llm::DEFAULT_BASE_URL),
                model: env_var_or("OPENAI_MODEL", llm::DEFAULT_MODEL),
                vision_model: env_var_or("OPENAI_VISION_MODEL", llm::DEFAULT_VISION_MODEL),
                embedding_model: env_var_or(
                    "OPENAI_EMBEDDING_MODEL",
                    llm::DEFAULT_EMBEDDING_MODEL,
                ),
                max_tokens: env_var_or("OPENAI_MAX_TOKENS", &llm::DEFAULT_MAX_TOKENS.to_string())
                    .parse()
                    .context("Invalid OPENAI_MAX_TOKENS value")?,
                temperature: env_var_or(
                    "OPENAI_TEMPERATURE",
                    &llm::DEFAULT_TEMPERATURE.to_string(),
                )
                .parse()
                .context("Invalid OPENAI_TEMPERATURE value")?,
            },
            conversation: ConversationLimits {
                max_history: env_var_or(
                    "MAX_CONVERSATION_HISTORY",
                    &conversation::MAX_CONVERSATION_HISTORY.to_string(),
                )
                .parse()
                .context("Invalid MAX_CONVERSATION_HISTORY value")?,
            },
            listings: ListingsConfig {
                api_url: env_var_or("LISTINGS_API_URL", listings::DEFAULT_API_URL),
                api_key: optional_env("LISTINGS_API_KEY"),
                page_size: env_var_or(
                    "LISTINGS_PAGE_SIZE",
                    &listings::DEFAULT_PAGE_SIZE.to_string(),
                )
                .parse()
                .context("Invalid LISTINGS_PAGE_SIZE value")?,
                sort: env_var_or("LISTINGS_SORT", listings::DEFAULT_SORT),
            },
            vector_store: VectorStoreConfig {
                api_key: optional_env("PINECONE_API_KEY"),
                index_host: optional_env("PINECONE_INDEX_HOST"),
                index_name: env_var_or("PINECONE_INDEX", vector_store::DEFAULT_INDEX),
                namespace: optional_env("PINECONE_NAMESPACE"),
            },
            ingestion: IngestionSettings {
                batch_size: env_var_or(
                    "INGEST_BATCH_SIZE",
                    &ingestion::DEFAULT_BATCH_SIZE.to_string(),
                )
                .parse()
                .context("Invalid INGEST_BATCH_SIZE value")?,
                batch_delay_ms: env_var_or(
                    "INGEST_BATCH_DELAY_MS",
                    &ingestion::DEFAULT_BATCH_DELAY_MS.to_string(),
                )
                .parse()
                .context("Invalid INGEST_BATCH_DELAY_MS value")?,
                image_delay_ms: env_var_or(
                    "INGEST_IMAGE_DELAY_MS",
                    &ingestion::DEFAULT_IMAGE_DELAY_MS.to_string(),
                )
                .parse()
                .context("Invalid INGEST_IMAGE_DELAY_MS value")?,
                max_images: env_var_or(
                    "INGEST_MAX_IMAGES",
                    &ingestion::DEFAULT_MAX_IMAGES.to_string(),
                )
                .parse()
                .context("Invalid INGEST_MAX_IMAGES value")?,
                caption_max_attempts: env_var_or(
                    "INGEST_CAPTION_MAX_ATTEMPTS",
                    &ingestion::DEFAULT_CAPTION_MAX_ATTEMPTS.to_string(),
                )
                .parse()
                .context("Invalid INGEST_CAPTION_MAX_ATTEMPTS value")?,
                caption_retry_delay_ms: env_var_or(
                    "INGEST_CAPTION_RETRY_DELAY_MS",
                    &ingestion::DEFAULT_CAPTION_RETRY_DELAY_MS.to_string(),
                )
                .parse()
                .context("Invalid INGEST_CAPTION_RETRY_DELAY_MS value")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for values that would make the pipelines misbehave
    pub fn validate(&self) -> Result<()> {
        if self.conversation.max_history == 0 {
            return Err(anyhow::anyhow!("MAX_CONVERSATION_HISTORY must be at least 1"));
        }
        if self.ingestion.batch_size == 0 {
            return Err(anyhow::anyhow!("INGEST_BATCH_SIZE must be at least 1"));
        }
        if self.ingestion.caption_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "INGEST_CAPTION_MAX_ATTEMPTS must be at least 1"
            ));
        }
        if self.ingestion.batch_delay_ms <= self.ingestion.image_delay_ms {
            warn!(
                batch_delay_ms = self.ingestion.batch_delay_ms,
                image_delay_ms = self.ingestion.image_delay_ms,
                "Batch delay should exceed the per-image delay"
            );
        }
        if self.llm.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; chat and ingestion requests will be rejected");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "PropertyBot Server Configuration:\n\
             - Bind: {}:{}\n\
             - Environment: {}\n\
             - Model: {} (vision: {}, embeddings: {})\n\
             - OpenAI API Key: {}\n\
             - Max History: {}\n\
             - Listings API: {} ({})\n\
             - Vector Store: {}\n\
             - Ingestion: batch {} every {}ms, {} images/property",
            self.host,
            self.http_port,
            self.environment,
            self.llm.model,
            self.llm.vision_model,
            self.llm.embedding_model,
            configured(self.llm.api_key.is_some()),
            self.conversation.max_history,
            self.listings.api_url,
            configured(self.listings.api_key.is_some()),
            if self.vector_store.api_key.is_some() && self.vector_store.index_host.is_some() {
                self.vector_store.index_name.as_str()
            } else {
                "Not configured"
            },
            self.ingestion.batch_size,
            self.ingestion.batch_delay_ms,
            self.ingestion.max_images,
        )
    }
}

const fn configured(present: bool) -> &'static str {
    if present {
        "Configured"
    } else {
        "Not configured"
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Non-empty environment variable
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000, https://app.example.com,"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("PROD"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("whatever"),
            Environment::Development
        );
    }

    #[test]
    #[serial]
    fn test_from_env_reads_overrides() {
        env::set_var("MAX_CONVERSATION_HISTORY", "8");
        env::set_var("INGEST_BATCH_SIZE", "7");
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("LISTINGS_API_KEY", "  ");

        let config = ServerConfig::from_current_env().unwrap();
        assert_eq!(config.conversation.max_history, 8);
        assert_eq!(config.ingestion.batch_size, 7);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert!(config.listings.api_key.is_none());

        env::remove_var("MAX_CONVERSATION_HISTORY");
        env::remove_var("INGEST_BATCH_SIZE");
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("LISTINGS_API_KEY");
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_reported() {
        env::set_var("INGEST_BATCH_DELAY_MS", "soon");
        let err = ServerConfig::from_current_env().unwrap_err();
        assert!(err.to_string().contains("INGEST_BATCH_DELAY_MS"));
        env::remove_var("INGEST_BATCH_DELAY_MS");
    }

    #[test]
    fn test_summary_omits_secrets() {
        let mut config = ServerConfig::default();
        config.llm.api_key = Some("sk-very-secret".to_owned());
        let summary = config.summary();
        assert!(summary.contains("Configured"));
        assert!(!summary.contains("sk-very-secret"));
    }

    #[test]
    fn test_summary_lists_every_setting() {
        let mut config = ServerConfig::default();
        config.conversation.max_history = 12;
        let summary = config.summary();
        assert!(summary.contains("- Max History: 12\n"));
        assert!(summary.contains("- Listings API: "));
        assert!(summary.contains("- Ingestion: batch 5 every 2000ms, 3 images/property"));
    }

    #[test]
    fn test_zero_history_rejected() {
        let mut config = ServerConfig::default();
        config.conversation.max_history = 0;
        assert!(config.validate().is_err());
    }
}
