// ABOUTME: Batch property ingestion into the vector store
// ABOUTME: Captioning, text synthesis, metadata flattening and the batch driver
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Vision captions with retry
pub mod captioning;
/// Flat vector metadata
pub mod metadata;
/// Batch driver
pub mod pipeline;
/// Embedding input text
pub mod text;

pub use captioning::ImageCaptioner;
pub use metadata::build_metadata;
pub use pipeline::{IngestedProperty, IngestionPipeline, IngestionSummary};
pub use text::build_property_text;
