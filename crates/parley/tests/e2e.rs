// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: a real gateway on a loopback port, driven by the
//! client reconciler.
//!
//! Each test starts an isolated TestHarness (temp SQLite, scripted provider)
//! and serves it over HTTP. Tests are independent and order-insensitive.

use std::net::SocketAddr;

use parley_client::{ChatClient, ChatStatus, Reconciler};
use parley_config::model::{GatewayConfig, UserToken};
use parley_core::{AgentResponse, MessageType, ParleyError};
use parley_gateway::{GatewayState, build_router};
use parley_test_utils::{FailingTool, TestHarness, function_call_round, text_round};

const TOKEN: &str = "tok-e2e";

async fn spawn_gateway(harness: &TestHarness) -> String {
    let config = GatewayConfig {
        users: vec![UserToken {
            token: TOKEN.into(),
            user_id: "github:7".into(),
        }],
        ..GatewayConfig::default()
    };
    let state = GatewayState::new(harness.agent.clone(), harness.kv.clone(), &config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

async fn connected(harness: &TestHarness) -> (ChatClient, Reconciler) {
    let url = spawn_gateway(harness).await;
    let client = ChatClient::new(&url, TOKEN).unwrap();
    let mut reconciler = Reconciler::new();
    client.load(&mut reconciler).await.unwrap();
    (client, reconciler)
}

#[tokio::test]
async fn test_reconciled_turn_matches_durable_history() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.provider.push_round(text_round("Hello from Parley!")).await;
    let (client, mut reconciler) = connected(&harness).await;

    let mut deltas = String::new();
    client
        .chat(&mut reconciler, "Hi there", None, |_, frame| {
            if let AgentResponse::Delta { content, .. } = frame {
                deltas.push_str(content);
            }
        })
        .await
        .unwrap();

    assert_eq!(deltas, "Hello from Parley!");
    assert_eq!(reconciler.status(), ChatStatus::Ready);
    assert_eq!(reconciler.last_index(), 2);
    assert!(reconciler.tool_status().is_empty());

    let durable = client.messages().await.unwrap();
    let mirror = reconciler.messages();
    assert_eq!(durable.len(), mirror.len());
    for (local, remote) in mirror.iter().zip(&durable) {
        assert_eq!(local.message_type, remote.message_type);
        assert_eq!(local.content, remote.content);
    }
    assert!(mirror[0].timestamp.is_some());
    assert_eq!(
        mirror[1].info.as_ref().and_then(|i| i.token_usage),
        durable[1].info.as_ref().and_then(|i| i.token_usage)
    );
}

#[tokio::test]
async fn test_second_turn_builds_on_first() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.provider.push_round(text_round("First answer")).await;
    harness.provider.push_round(text_round("Second answer")).await;
    let (client, mut reconciler) = connected(&harness).await;

    client
        .chat(&mut reconciler, "first", None, |_, _| {})
        .await
        .unwrap();
    client
        .chat(&mut reconciler, "second", None, |_, _| {})
        .await
        .unwrap();

    let contents: Vec<&str> = reconciler
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(
        contents,
        vec!["first", "First answer", "second", "Second answer"]
    );
    assert_eq!(reconciler.last_index(), 4);

    // A fresh client sees the same history.
    let mut fresh = Reconciler::new();
    client.load(&mut fresh).await.unwrap();
    assert_eq!(fresh.last_index(), 4);
    assert_eq!(fresh.messages()[3].message_type, MessageType::Agent);
}

#[tokio::test]
async fn test_tool_turn_shows_tool_labels() {
    let harness = TestHarness::builder()
        .with_builtin_tools()
        .build()
        .await
        .unwrap();
    harness
        .provider
        .push_round(function_call_round(
            "call_1",
            "dateTime",
            r#"{"timeZone":"UTC"}"#,
        ))
        .await;
    harness.provider.push_round(text_round("It is noon.")).await;
    let (client, mut reconciler) = connected(&harness).await;

    let mut seen_labels = Vec::new();
    client
        .chat(&mut reconciler, "what time is it?", None, |r, _| {
            for label in r.tool_labels() {
                if !seen_labels.contains(&label) {
                    seen_labels.push(label);
                }
            }
        })
        .await
        .unwrap();

    assert!(seen_labels.contains(&"Preparing ...".to_string()));
    assert!(seen_labels.contains(&"Preparing Date Time ...".to_string()));
    assert!(reconciler.tool_status().is_empty());
    assert_eq!(reconciler.messages().last().unwrap().content, "It is noon.");
    assert!(reconciler.take_notices().is_empty());
}

#[tokio::test]
async fn test_failing_tool_raises_notice_and_turn_completes() {
    let harness = TestHarness::builder()
        .with_tool(std::sync::Arc::new(FailingTool::new("explode", "kaboom")))
        .build()
        .await
        .unwrap();
    harness
        .provider
        .push_round(function_call_round("call_1", "explode", "{}"))
        .await;
    harness.provider.push_round(text_round("That failed.")).await;
    let (client, mut reconciler) = connected(&harness).await;

    client
        .chat(&mut reconciler, "blow up", None, |_, _| {})
        .await
        .unwrap();

    assert!(reconciler.take_notices().iter().any(|n| n.contains("kaboom")));
    assert_eq!(reconciler.status(), ChatStatus::Ready);
    assert_eq!(reconciler.messages().last().unwrap().content, "That failed.");
}

#[tokio::test]
async fn test_bad_token_fails_load_with_notice() {
    let harness = TestHarness::builder().build().await.unwrap();
    let url = spawn_gateway(&harness).await;
    let client = ChatClient::new(&url, "wrong").unwrap();

    let mut reconciler = Reconciler::new();
    let err = client.load(&mut reconciler).await.unwrap_err();
    assert!(matches!(err, ParleyError::Gateway { .. }));
    assert!(err.to_string().contains("401"));
    assert_eq!(reconciler.take_notices().len(), 1);
}

#[tokio::test]
async fn test_stop_and_summarize_over_http() {
    let harness = TestHarness::builder().build().await.unwrap();
    let (client, mut reconciler) = connected(&harness).await;
    client
        .chat(&mut reconciler, "hello", None, |_, _| {})
        .await
        .unwrap();

    assert!(!client.stop().await.unwrap());
    assert!(client.summarize().await.unwrap().is_empty());
}
