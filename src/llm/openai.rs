// ABOUTME: OpenAI-compatible provider for chat completions, function calling, embeddings and vision
// ABOUTME: Maps provider HTTP failures onto the auth, rate-limit and request error classes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI`-Compatible Provider
//!
//! One HTTP client serves the three capabilities the server needs:
//!
//! - `chat/completions` with the `functions` / `function_call: "auto"` contract
//!   and `stream: true` for incremental output
//! - `chat/completions` with `image_url` content parts for photo captions
//! - `embeddings` for listing text
//!
//! ## Example
//!
//! ```rust,no_run
//! use propertybot_server::config::LlmConfig;
//! use propertybot_server::llm::{ChatMessage, ChatRequest, LlmProvider, OpenAiConfig, OpenAiProvider};
//! use propertybot_server::errors::AppError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let provider = OpenAiProvider::new(OpenAiConfig::from(&LlmConfig::default()))?;
//!     let request = ChatRequest::new(vec![ChatMessage::user("What is an escrow account?")]);
//!     let response = provider.complete(&request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use super::sse_parser::create_sse_stream;
use super::{
    ChatMessage, ChatRequest, ChatResponse, ChatResponseWithFunctions, ChatStream,
    EmbeddingProvider, FunctionCall, FunctionDeclaration, LlmCapabilities, LlmProvider,
    StreamChunk, TokenUsage, VisionProvider,
};
use crate::config::LlmConfig;
use crate::constants::llm::{CAPTION_MAX_TOKENS, CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use crate::errors::AppError;
use crate::utils::http_client::create_client_with_timeout;

/// Service label used in error messages
const SERVICE: &str = "OpenAI";

/// Automatic function selection
const FUNCTION_CALL_AUTO: &str = "auto";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionDeclaration]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiImageUrl {
    url: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: OpenAiContent::Text(msg.content.clone()),
            name: msg.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    function_call: Option<OpenAiFunctionCall>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiToolCall {
    function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(rename = "prompt_tokens")]
    prompt: u32,
    #[serde(rename = "completion_tokens", default)]
    completion: u32,
    #[serde(rename = "total_tokens")]
    total: u32,
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(u: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt,
            completion_tokens: u.completion,
            total_tokens: u.total,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for the `OpenAI` provider
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL for the API
    pub base_url: String,
    /// API key; every call fails with a configuration error while unset
    pub api_key: Option<String>,
    /// Chat model
    pub default_model: String,
    /// Model used for image captions
    pub vision_model: String,
    /// Model used for embeddings
    pub embedding_model: String,
    /// Capabilities of this provider
    pub capabilities: LlmCapabilities,
}

impl From<&LlmConfig> for OpenAiConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            embedding_model: config.embedding_model.clone(),
            capabilities: LlmCapabilities::full_featured(),
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// `OpenAI`-compatible provider serving chat, embeddings and vision
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiConfig) -> Result<Self, AppError> {
        let client = create_client_with_timeout(REQUEST_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS)?;

        info!(
            "Initializing OpenAI provider: base_url={}, model={}",
            config.base_url, config.default_model
        );

        Ok(Self { client, config })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Credential or a configuration error; checked before any request is built
    fn api_key(&self) -> Result<&str, AppError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::config_missing("OpenAI API key is not configured"))
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model)
    }

    /// Map a non-success provider status onto the error taxonomy
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        let detail = serde_json::from_str::<OpenAiErrorResponse>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |parsed| parsed.error.message,
        );

        match status.as_u16() {
            401 => AppError::external_auth(SERVICE, detail),
            429 => AppError::external_rate_limited(SERVICE, detail),
            400 => AppError::external_request_invalid(SERVICE, detail),
            _ => AppError::external_service(SERVICE, format!("API error ({status}): {detail}")),
        }
    }

    /// POST a JSON body with bearer auth and return the raw response
    async fn post<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Response, AppError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(self.api_url(endpoint))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to OpenAI: {}", e);
                AppError::external_service(SERVICE, format!("Failed to connect: {e}"))
                    .with_source(e)
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), endpoint, "OpenAI request failed");
        Err(Self::parse_error_response(status, &body))
    }

    /// POST and decode a JSON response
    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let body = self
            .post(endpoint, body)
            .await?
            .text()
            .await
            .map_err(|e| {
                AppError::external_service(SERVICE, format!("Failed to read response: {e}"))
            })?;

        serde_json::from_str(&body).map_err(|e| {
            error!(
                "Failed to parse API response: {} - body: {}",
                e,
                body.chars().take(500).collect::<String>()
            );
            AppError::external_service(SERVICE, format!("Failed to parse response: {e}"))
        })
    }

    fn first_choice(response: OpenAiResponse) -> Result<(OpenAiChoice, String, Option<TokenUsage>), AppError> {
        let usage = response.usage.map(TokenUsage::from);
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(SERVICE, "API returned no choices"))?;
        Ok((choice, response.model, usage))
    }

    /// Extract the requested function from either the legacy `function_call`
    /// field or the first entry of `tool_calls`
    fn extract_function_call(message: &OpenAiResponseMessage) -> Option<FunctionCall> {
        let call = message.function_call.clone().or_else(|| {
            message
                .tool_calls
                .as_ref()
                .and_then(|calls| calls.first())
                .map(|call| call.function.clone())
        })?;

        let args = if call.arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                debug!(function = %call.name, "Unparseable function arguments: {e}");
                Value::Object(serde_json::Map::new())
            })
        };

        Some(FunctionCall {
            name: call.name,
            args,
        })
    }

    /// Parse one streaming payload
    fn parse_stream_chunk(data: &str) -> Option<Result<StreamChunk, AppError>> {
        match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => {
                let choice = chunk.choices.into_iter().next()?;
                let delta = choice.delta.content.unwrap_or_default();
                Some(Ok(StreamChunk {
                    delta,
                    is_final: choice.finish_reason.is_some(),
                    finish_reason: choice.finish_reason,
                }))
            }
            Err(e) => Some(Err(AppError::external_service(
                SERVICE,
                format!("Failed to parse stream chunk: {e}"),
            ))),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.config.capabilities
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }

    #[instrument(skip(self, request), fields(model = %self.model_for(request)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let openai_request = OpenAiRequest {
            model: self.model_for(request),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: Some(false),
            functions: None,
            function_call: None,
        };

        let response: OpenAiResponse = self.post_json("chat/completions", &openai_request).await?;
        let (choice, model, usage) = Self::first_choice(response)?;
        let content = choice.message.content.unwrap_or_default();

        debug!(
            "Received completion: {} chars, finish_reason: {:?}",
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse {
            content,
            model,
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request, functions), fields(model = %self.model_for(request), functions = functions.len()))]
    async fn complete_with_functions(
        &self,
        request: &ChatRequest,
        functions: &[FunctionDeclaration],
    ) -> Result<ChatResponseWithFunctions, AppError> {
        let has_functions = !functions.is_empty();
        let openai_request = OpenAiRequest {
            model: self.model_for(request),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: Some(false),
            functions: has_functions.then_some(functions),
            function_call: has_functions.then_some(FUNCTION_CALL_AUTO),
        };

        let response: OpenAiResponse = self.post_json("chat/completions", &openai_request).await?;
        let (choice, model, usage) = Self::first_choice(response)?;
        let function_call = Self::extract_function_call(&choice.message);

        if let Some(ref call) = function_call {
            info!(function = %call.name, "Model requested a function call");
        }

        Ok(ChatResponseWithFunctions {
            content: choice.message.content,
            function_call,
            model,
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %self.model_for(request)))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        let openai_request = OpenAiRequest {
            model: self.model_for(request),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: Some(true),
            functions: None,
            function_call: None,
        };

        let response = self.post("chat/completions", &openai_request).await?;
        Ok(create_sse_stream(
            response.bytes_stream(),
            Self::parse_stream_chunk,
            SERVICE,
        ))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    #[instrument(skip(self, text), fields(model = %self.config.embedding_model, chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let request = OpenAiEmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response: OpenAiEmbeddingResponse = self.post_json("embeddings", &request).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| AppError::external_service(SERVICE, "Embedding response was empty"))
    }
}

#[async_trait]
impl VisionProvider for OpenAiProvider {
    #[instrument(skip(self, instruction), fields(model = %self.config.vision_model))]
    async fn describe_image(
        &self,
        image_url: &str,
        instruction: &str,
    ) -> Result<String, AppError> {
        let message = OpenAiMessage {
            role: "user",
            content: OpenAiContent::Parts(vec![
                OpenAiContentPart::Text {
                    text: instruction.to_owned(),
                },
                OpenAiContentPart::ImageUrl {
                    image_url: OpenAiImageUrl {
                        url: image_url.to_owned(),
                    },
                },
            ]),
            name: None,
        };
        let request = OpenAiRequest {
            model: &self.config.vision_model,
            messages: vec![message],
            temperature: None,
            max_tokens: Some(CAPTION_MAX_TOKENS),
            stream: Some(false),
            functions: None,
            function_call: None,
        };

        let response: OpenAiResponse = self.post_json("chat/completions", &request).await?;
        let (choice, _, _) = Self::first_choice(response)?;
        choice
            .message
            .content
            .map(|caption| caption.trim().to_owned())
            .filter(|caption| !caption.is_empty())
            .ok_or_else(|| AppError::external_service(SERVICE, "Vision model returned no caption"))
    }
}
