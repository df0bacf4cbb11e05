// ABOUTME: System-wide constants and configuration defaults for the property assistant
// ABOUTME: Contains model parameters, conversation limits, listing query shape and ingestion pacing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Hardcoded defaults. Every value that operators may want to tune is also
//! read from the environment by [`crate::config::environment::ServerConfig`],
//! which falls back to the values here.

/// Server identity
pub mod service {
    /// Service name used in logs and health responses
    pub const SERVICE_NAME: &str = "propertybot-server";
    /// Server version from Cargo.toml
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Port and host defaults
pub mod network {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 3000;
    /// Default bind host
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    /// Default CORS origins
    pub const DEFAULT_CORS_ORIGINS: &str = "*";
    /// Maximum accepted request body
    pub const MAX_REQUEST_SIZE: usize = 1_048_576; // 1MB
}

/// HTTP route paths
pub mod routes {
    /// Liveness endpoint
    pub const HEALTH: &str = "/health";
    /// Chat submit (POST) and streaming submit (PUT)
    pub const CHAT: &str = "/api/chat";
    /// Streaming submit alias
    pub const CHAT_STREAM: &str = "/api/chat/stream";
    /// Ingestion trigger
    pub const INGEST: &str = "/api/ingest";
}

/// Language model defaults
pub mod llm {
    /// OpenAI-compatible API base
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    /// Chat model
    pub const DEFAULT_MODEL: &str = "gpt-4o";
    /// Vision-capable model used for image captions
    pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
    /// Embedding model
    pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
    /// Output dimension of the default embedding model
    pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
    /// Completion token ceiling per call
    pub const DEFAULT_MAX_TOKENS: u32 = 1000;
    /// Sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    /// Token ceiling for a single image caption
    pub const CAPTION_MAX_TOKENS: u32 = 300;
    /// Connection timeout for provider calls
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Whole-request timeout for provider calls
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
}

/// Conversation shaping
pub mod conversation {
    /// History entries retained per turn, shared by server and client
    pub const MAX_CONVERSATION_HISTORY: usize = 20;
    /// Summary used when the follow-up completion comes back empty
    pub const FUNCTION_RESULT_FALLBACK: &str =
        "I've found some properties that match your preferences.";
    /// Reply used when a model-requested function cannot be served
    pub const FUNCTION_FAILURE_APOLOGY: &str =
        "I apologize, but I encountered an error while fetching properties. Please try again.";
    /// Shown by clients when a stream breaks
    pub const STREAM_FAILURE_APOLOGY: &str =
        "I apologize, but I encountered an error. Please try again.";
    /// Literal terminating a streamed reply
    pub const STREAM_DONE_MARKER: &str = "[DONE]";
}

/// Property listings API
pub mod listings {
    /// Listing search endpoint
    pub const DEFAULT_API_URL: &str =
        "https://api.tesoro.estate/property/property-website/filter-properties";
    /// Sections requested from the listing search
    pub const RETURN_FIELDS: &str = "results,pagination,facets";
    /// Newest listings first
    pub const DEFAULT_SORT: &str = "-created_at";
    /// Listings per page
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    /// Header carrying the listings API key
    pub const API_KEY_HEADER: &str = "X-Api-Key";
    /// Timeout for one listings request
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Vector store
pub mod vector_store {
    /// Header carrying the Pinecone API key
    pub const API_KEY_HEADER: &str = "Api-Key";
    /// Default index name used in logs
    pub const DEFAULT_INDEX: &str = "properties";
    /// Metadata text values are truncated to this many characters
    pub const MAX_METADATA_TEXT_CHARS: usize = 4000;
}

/// Ingestion pacing and limits
pub mod ingestion {
    /// Properties per upsert batch
    pub const DEFAULT_BATCH_SIZE: usize = 5;
    /// Pause between batches
    pub const DEFAULT_BATCH_DELAY_MS: u64 = 2000;
    /// Pause between two caption requests of one property
    pub const DEFAULT_IMAGE_DELAY_MS: u64 = 500;
    /// Images captioned per property
    pub const DEFAULT_MAX_IMAGES: usize = 3;
    /// Caption attempts per image, first try included
    pub const DEFAULT_CAPTION_MAX_ATTEMPTS: u32 = 3;
    /// Base of the linear caption backoff
    pub const DEFAULT_CAPTION_RETRY_DELAY_MS: u64 = 1000;
    /// Caption stored when every attempt failed
    pub const CAPTION_UNAVAILABLE: &str = "Image description unavailable";
    /// Listing page fetched by a run
    pub const FIRST_PAGE: u32 = 1;
    /// Instruction sent with every image
    pub const CAPTION_PROMPT: &str = "Describe this property photo for a real estate listing in two or three sentences. \
         Mention the room or exterior shown, notable materials, condition, light and any amenities visible.";
}
