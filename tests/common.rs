// ABOUTME: Shared test utilities and fake upstream providers for integration tests
// ABOUTME: Scripted model, listings, vision, embedding and vector store doubles plus resource setup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
//! Shared test utilities for `propertybot_server`
//!
//! Every upstream is replaced by an in-memory double that records how it was
//! called, so tests can assert call counts and request shapes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use futures_util::stream;
use propertybot_server::{
    config::ServerConfig,
    errors::{AppError, ErrorCode},
    listings::ListingsSource,
    llm::{
        ChatRequest, ChatResponse, ChatResponseWithFunctions, ChatStream, EmbeddingProvider,
        FunctionCall, FunctionDeclaration, LlmCapabilities, LlmProvider, StreamChunk, TokenUsage,
        VisionProvider,
    },
    resources::{Providers, ServerResources},
    vector_store::{VectorRecord, VectorStore},
};
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

// ============================================================================
// Language model
// ============================================================================

/// One scripted completion outcome
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Plain text reply
    Text(String),
    /// Function call with arguments
    Call(String, Value),
    /// Provider failure with the given code
    Fail(ErrorCode),
}

impl Scripted {
    pub fn text(content: &str) -> Self {
        Self::Text(content.to_owned())
    }

    pub fn call(name: &str, args: Value) -> Self {
        Self::Call(name.to_owned(), args)
    }
}

/// One scripted stream item
#[derive(Debug, Clone)]
pub enum StreamStep {
    Delta(String),
    Done,
    Fail,
}

/// Model double answering from a queue of scripted outcomes
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Scripted>>,
    stream_script: Mutex<Vec<StreamStep>>,
    requests: Mutex<Vec<ChatRequest>>,
    declarations_seen: Mutex<Vec<usize>>,
    with_credentials: bool,
    capabilities: LlmCapabilities,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            stream_script: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            declarations_seen: Mutex::new(Vec::new()),
            with_credentials: true,
            capabilities: LlmCapabilities::full_featured(),
        }
    }

    pub fn streaming(steps: Vec<StreamStep>) -> Self {
        let llm = Self::new(Vec::new());
        *llm.stream_script.lock().unwrap() = steps;
        llm
    }

    pub fn without_credentials() -> Self {
        Self {
            with_credentials: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn text_only(script: Vec<Scripted>) -> Self {
        Self {
            capabilities: LlmCapabilities::text_only(),
            ..Self::new(script)
        }
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of declarations attached to each function-enabled call
    pub fn declarations_seen(&self) -> Vec<usize> {
        self.declarations_seen.lock().unwrap().clone()
    }

    fn next(&self, request: &ChatRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Scripted::text(""))
    }
}

fn usage() -> TokenUsage {
    TokenUsage {
        prompt_tokens: 12,
        completion_tokens: 8,
        total_tokens: 20,
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.capabilities
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn has_credentials(&self) -> bool {
        self.with_credentials
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        match self.next(request) {
            Scripted::Text(content) => Ok(ChatResponse {
                content,
                model: "scripted-model".to_owned(),
                usage: Some(usage()),
                finish_reason: Some("stop".to_owned()),
            }),
            Scripted::Call(name, _) => Ok(ChatResponse {
                content: format!("unexpected call to {name}"),
                model: "scripted-model".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            Scripted::Fail(code) => Err(AppError::new(code, "scripted failure")),
        }
    }

    async fn complete_with_functions(
        &self,
        request: &ChatRequest,
        functions: &[FunctionDeclaration],
    ) -> Result<ChatResponseWithFunctions, AppError> {
        self.declarations_seen.lock().unwrap().push(functions.len());
        match self.next(request) {
            Scripted::Text(content) => Ok(ChatResponseWithFunctions {
                content: Some(content),
                function_call: None,
                model: "scripted-model".to_owned(),
                usage: Some(usage()),
                finish_reason: Some("stop".to_owned()),
            }),
            Scripted::Call(name, args) => Ok(ChatResponseWithFunctions {
                content: None,
                function_call: Some(FunctionCall { name, args }),
                model: "scripted-model".to_owned(),
                usage: Some(usage()),
                finish_reason: Some("function_call".to_owned()),
            }),
            Scripted::Fail(code) => Err(AppError::new(code, "scripted failure")),
        }
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        let steps = self.stream_script.lock().unwrap().clone();
        let items: Vec<Result<StreamChunk, AppError>> = steps
            .into_iter()
            .map(|step| match step {
                StreamStep::Delta(text) => Ok(StreamChunk::delta(text)),
                StreamStep::Done => Ok(StreamChunk::done(Some("stop".to_owned()))),
                StreamStep::Fail => Err(AppError::external_service("scripted", "connection reset")),
            })
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

// ============================================================================
// Listings
// ============================================================================

/// Listings double returning a fixed payload or failing
pub struct FakeListings {
    payload: Option<Value>,
    calls: AtomicUsize,
}

impl FakeListings {
    pub fn with_payload(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingsSource for FakeListings {
    async fn fetch_page(&self, _page: u32) -> Result<Value, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload
            .clone()
            .ok_or_else(|| AppError::external_service("Listings API", "HTTP 503"))
    }
}

/// Listings payload with `count` properties; property `i` has `i % 3` photos
pub fn listings_payload(count: usize) -> Value {
    let results: Vec<Value> = (0..count)
        .map(|i| {
            let files: Vec<Value> = (0..i % 3)
                .map(|n| {
                    json!({
                        "url": format!("https://cdn.example.com/{i}/{n}.jpg"),
                        "type": "image",
                        "sort": n
                    })
                })
                .collect();
            json!({
                "id": i + 1,
                "title": format!("Listing {}", i + 1),
                "type": "apartment",
                "price": {"amount": 250_000 + i * 1000, "currency": "EUR"},
                "address": {"city": "Lisbon", "country": "PT"},
                "rooms": {"bedrooms": 2, "bathrooms": 1},
                "files": files
            })
        })
        .collect();
    json!({ "results": results, "pagination": {"page": 1, "total": count} })
}

// ============================================================================
// Vision and embeddings
// ============================================================================

/// Vision double; URLs listed in `failing` always fail
#[derive(Default)]
pub struct FakeVision {
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl FakeVision {
    pub fn failing_for(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|url| (*url).to_owned()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for FakeVision {
    async fn describe_image(&self, image_url: &str, _instruction: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|url| url == image_url) {
            return Err(AppError::external_service("OpenAI", "HTTP 500"));
        }
        Ok(format!("Bright room in {image_url}"))
    }
}

/// Embedding double; texts containing any `poison` marker fail
#[derive(Default)]
pub struct FakeEmbedder {
    poison: Vec<String>,
    inputs: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            poison: markers.iter().map(|m| (*m).to_owned()).collect(),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn embedding_model(&self) -> &str {
        "fake-embedding"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.inputs.lock().unwrap().push(text.to_owned());
        if self.poison.iter().any(|marker| text.contains(marker.as_str())) {
            return Err(AppError::external_service("OpenAI", "HTTP 500"));
        }
        Ok(vec![0.25; 8])
    }
}

// ============================================================================
// Vector store
// ============================================================================

/// Vector store double recording every batch; batches listed in
/// `failing_batches` (0-based call index) are rejected
#[derive(Default)]
pub struct RecordingStore {
    failing_batches: Vec<usize>,
    batches: Mutex<Vec<Vec<VectorRecord>>>,
}

impl RecordingStore {
    pub fn failing_on(batches: &[usize]) -> Self {
        Self {
            failing_batches: batches.to_vec(),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Size of every upsert call, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn records(&self) -> Vec<VectorRecord> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    fn index_name(&self) -> &str {
        "test-index"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize, AppError> {
        let mut batches = self.batches.lock().unwrap();
        let index = batches.len();
        batches.push(records.to_vec());
        if self.failing_batches.contains(&index) {
            return Err(AppError::new(ErrorCode::UpsertFailed, "HTTP 500"));
        }
        Ok(records.len())
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Handles on the doubles behind a [`ServerResources`]
pub struct TestProviders {
    pub llm: Arc<ScriptedLlm>,
    pub listings: Arc<FakeListings>,
    pub vision: Arc<FakeVision>,
    pub embedder: Arc<FakeEmbedder>,
    pub store: Arc<RecordingStore>,
}

impl TestProviders {
    pub fn new(llm: ScriptedLlm, listings: FakeListings) -> Self {
        Self {
            llm: Arc::new(llm),
            listings: Arc::new(listings),
            vision: Arc::new(FakeVision::default()),
            embedder: Arc::new(FakeEmbedder::default()),
            store: Arc::new(RecordingStore::default()),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            llm: self.llm.clone(),
            vision: self.vision.clone(),
            embedder: self.embedder.clone(),
            listings: self.listings.clone(),
            store: self.store.clone(),
        }
    }
}

/// Configuration with every service marked configured and no pacing delays
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.llm.api_key = Some("sk-test".to_owned());
    config.listings.api_key = Some("listings-test".to_owned());
    config.vector_store.api_key = Some("pc-test".to_owned());
    config.vector_store.index_host = Some("test-index.svc.pinecone.io".to_owned());
    config.ingestion.batch_delay_ms = 0;
    config.ingestion.image_delay_ms = 0;
    config.ingestion.caption_retry_delay_ms = 0;
    config
}

/// Resources wired to `providers` using [`test_config`]
pub fn create_test_resources(providers: &TestProviders) -> Arc<ServerResources> {
    init_test_logging();
    Arc::new(ServerResources::with_providers(
        Arc::new(test_config()),
        providers.providers(),
    ))
}

/// Count requests per role in the first request the model received
pub fn role_counts(request: &ChatRequest) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for message in &request.messages {
        *counts.entry(message.role.as_str().to_owned()).or_insert(0) += 1;
    }
    counts
}
