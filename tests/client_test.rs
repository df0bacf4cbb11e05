// ABOUTME: End-to-end tests for the chat API client against a live local server
// ABOUTME: History ownership, streamed turns, error status mapping and truncated streams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{
    create_test_resources, listings_payload, FakeListings, Scripted, ScriptedLlm, StreamStep,
    TestProviders,
};
use propertybot_server::chat::{ChatReply, FETCH_PROPERTIES};
use propertybot_server::client::ChatApiClient;
use propertybot_server::config::ConversationLimits;
use propertybot_server::errors::ErrorCode;
use propertybot_server::llm::MessageRole;
use propertybot_server::server::build_router;
use serde_json::json;
use tokio::net::TcpListener;

/// Serve the router on an ephemeral port and return its base URL
async fn spawn_server(providers: &TestProviders) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(create_test_resources(providers));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

fn client(base_url: &str) -> ChatApiClient {
    ChatApiClient::new(base_url, ConversationLimits::default()).unwrap()
}

#[tokio::test]
async fn test_send_message_owns_history() {
    let providers = TestProviders::new(
        ScriptedLlm::new(vec![
            Scripted::text("Hello! Looking to buy or rent?"),
            Scripted::text("Great, buying it is."),
        ]),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let reply = client.send_message("Hi", None).await.unwrap();
    assert_eq!(reply.message(), "Hello! Looking to buy or rent?");
    assert_eq!(client.conversation_history().len(), 2);

    client.send_message("Buy", None).await.unwrap();
    let history = client.conversation_history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].role, MessageRole::User);
    assert_eq!(history[2].content, "Buy");
    assert_eq!(history[3].content, "Great, buying it is.");

    // Second turn carried the first turn as history
    let second = &providers.llm.requests()[1].messages;
    assert_eq!(second.len(), 4);
    assert_eq!(second[1].content, "Hi");
    assert_eq!(second[2].content, "Hello! Looking to buy or rent?");
}

#[tokio::test]
async fn test_property_reply_is_decoded() {
    let providers = TestProviders::new(
        ScriptedLlm::new(vec![
            Scripted::call(FETCH_PROPERTIES, json!({})),
            Scripted::text("Three new listings."),
        ]),
        FakeListings::with_payload(listings_payload(3)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let reply = client.fetch_properties().await.unwrap();
    match reply {
        ChatReply::Properties {
            message,
            properties,
        } => {
            assert_eq!(message, "Three new listings.");
            assert_eq!(properties["results"].as_array().unwrap().len(), 3);
        }
        other => panic!("expected a property reply, got {other:?}"),
    }

    let submitted = &providers.llm.requests()[0].messages;
    let user = submitted.last().unwrap();
    assert!(user.content.contains("[CONTEXT]"));
    assert!(user.content.contains("Conversation Goal: property_search"));
}

#[tokio::test]
async fn test_market_analysis_prompt_and_context() {
    let providers = TestProviders::new(
        ScriptedLlm::new(vec![Scripted::text("Prices are rising.")]),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    client
        .get_market_analysis("Austin, TX", Some("condo"))
        .await
        .unwrap();

    let submitted = &providers.llm.requests()[0].messages;
    let user = submitted.last().unwrap();
    assert!(user
        .content
        .starts_with("Can you provide a market analysis for Austin, TX for condo properties?"));
    assert!(user.content.contains("User Location: Austin, TX"));
    assert!(user.content.contains("Conversation Goal: market_analysis"));
}

#[tokio::test]
async fn test_stream_message_collects_fragments() {
    let providers = TestProviders::new(
        ScriptedLlm::streaming(vec![
            StreamStep::Delta("The loft ".to_owned()),
            StreamStep::Delta("has two ".to_owned()),
            StreamStep::Delta("bedrooms.".to_owned()),
            StreamStep::Done,
        ]),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let mut fragments = Vec::new();
    let full = client
        .stream_message("Describe the loft", None, |chunk| {
            fragments.push(chunk.to_owned());
        })
        .await
        .unwrap();

    assert_eq!(full, "The loft has two bedrooms.");
    assert_eq!(fragments, vec!["The loft ", "has two ", "bedrooms."]);

    let history = client.conversation_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "Describe the loft");
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert_eq!(history[1].content, full);
}

#[tokio::test]
async fn test_stream_error_leaves_history_untouched() {
    let providers = TestProviders::new(
        ScriptedLlm::streaming(vec![StreamStep::Delta("Parti".to_owned()), StreamStep::Fail]),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let mut received = String::new();
    let err = client
        .stream_message("Tell me more", None, |chunk| received.push_str(chunk))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::StreamInterrupted);
    assert_eq!(received, "Parti");
    assert!(client.conversation_history().is_empty());
}

#[tokio::test]
async fn test_server_validation_message_is_preserved() {
    let providers = TestProviders::new(
        ScriptedLlm::new(vec![]),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let err = client.send_message("", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(err.message, "Message is required and must be a string");
    assert!(client.conversation_history().is_empty());
}

#[tokio::test]
async fn test_error_statuses_map_to_error_codes() {
    let providers = TestProviders::new(
        ScriptedLlm::new(vec![
            Scripted::Fail(ErrorCode::ExternalAuthFailed),
            Scripted::Fail(ErrorCode::ExternalRateLimited),
        ]),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let err = client.send_message("hi", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalAuthFailed);
    assert!(err.message.ends_with("Invalid API key"));

    let err = client.send_message("hi", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalRateLimited);
}

#[tokio::test]
async fn test_unconfigured_server_reports_missing_key() {
    let providers = TestProviders::new(
        ScriptedLlm::without_credentials(),
        FakeListings::with_payload(listings_payload(1)),
    );
    let mut client = client(&spawn_server(&providers).await);

    let err = client
        .stream_message("hi", None, |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalServiceError);
    assert!(err.message.ends_with("OpenAI API key is not configured"));
}
