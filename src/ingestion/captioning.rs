// ABOUTME: Captions a property's photos with a vision model under a retry policy
// ABOUTME: Exhausted retries yield a fixed sentinel caption instead of an error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::IngestionSettings;
use crate::constants::ingestion::{CAPTION_PROMPT, CAPTION_UNAVAILABLE};
use crate::errors::{AppError, ErrorCode};
use crate::listings::Property;
use crate::llm::VisionProvider;
use crate::retry::{is_retryable_unless_misconfigured, Backoff, RetryPolicy};

/// Vision captioning with retry and inter-image pacing
pub struct ImageCaptioner {
    vision: Arc<dyn VisionProvider>,
    policy: RetryPolicy,
    image_delay: Duration,
    max_images: usize,
}

impl ImageCaptioner {
    /// Captioner configured from the ingestion settings
    #[must_use]
    pub fn new(vision: Arc<dyn VisionProvider>, settings: &IngestionSettings) -> Self {
        let policy = RetryPolicy::new(
            settings.caption_max_attempts,
            Backoff::Linear(settings.caption_retry_delay()),
        )
        .with_predicate(is_retryable_unless_misconfigured);

        Self {
            vision,
            policy,
            image_delay: settings.image_delay(),
            max_images: settings.max_images,
        }
    }

    /// Caption up to `max_images` supported photos of `property`, in sort
    /// order. Successive requests are separated by the image delay.
    pub async fn caption_property(&self, property: &Property) -> Vec<String> {
        let images = property.caption_candidates(self.max_images);
        let mut captions = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            if index > 0 && !self.image_delay.is_zero() {
                tokio::time::sleep(self.image_delay).await;
            }
            captions.push(self.caption_image(&property.id, &image.url).await);
        }

        debug!(property_id = %property.id, captions = captions.len(), "Captioned property images");
        captions
    }

    /// Caption one image, falling back to the sentinel when every attempt fails
    pub async fn caption_image(&self, property_id: &str, image_url: &str) -> String {
        let result = self
            .policy
            .run("caption_image", |_| async move {
                self.vision
                    .describe_image(image_url, CAPTION_PROMPT)
                    .await
                    .map_err(|e| caption_error(e, image_url))
            })
            .await;

        match result {
            Ok(caption) => caption,
            Err(e) => {
                warn!(
                    property_id = %property_id,
                    image_url = %image_url,
                    "Caption unavailable: {}",
                    e
                );
                CAPTION_UNAVAILABLE.to_owned()
            }
        }
    }
}

/// Reclassify a provider failure as a caption failure, keeping
/// misconfiguration codes so the retry policy stops on them
fn caption_error(error: AppError, image_url: &str) -> AppError {
    let code = match error.code {
        code @ (ErrorCode::ConfigMissing | ErrorCode::ConfigError | ErrorCode::ExternalAuthFailed) => {
            code
        }
        _ => ErrorCode::CaptionFailed,
    };
    AppError::new(code, error.message.clone())
        .with_resource_id(image_url)
        .with_source(error)
}
