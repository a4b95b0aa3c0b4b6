//! WebSocket lifecycle integration tests
//!
//! Upgrade authentication, live and offline direct messages, reconnect
//! supersede and eviction on disconnect.

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use socialnet::backend::chat;
use tokio_tungstenite::tungstenite;

use crate::common::{connect, connect_with_token, wait_for, TestApp};

#[tokio::test]
async fn test_upgrade_without_valid_session_is_rejected() {
    let app = TestApp::spawn().await;

    let result = connect_with_token(&app, "not-a-session").await;
    assert_matches!(
        result,
        Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 401
    );

    let unknown = uuid::Uuid::new_v4().to_string();
    let result = connect_with_token(&app, &unknown).await;
    assert_matches!(
        result,
        Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 401
    );
    assert_eq!(app.state.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_connect_registers_and_announces_user_list() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let mut alice_ws = connect(&app, &alice).await;
    let _bob_ws = connect(&app, &bob).await;

    // Alice hears about Bob arriving
    let frame = alice_ws.next_frame_of_type("user_list_update").await;
    assert_eq!(frame["data"], serde_json::Value::Null);
    assert_eq!(app.state.registry.online_nicknames(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_live_chat_is_delivered_and_marked() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut alice_ws = connect(&app, &alice).await;
    let mut bob_ws = connect(&app, &bob).await;

    alice_ws
        .send_frame("chat", json!({ "to": "bob", "message": "hello bob" }))
        .await;

    let frame = bob_ws.next_frame_of_type("chat").await;
    assert_eq!(frame["data"]["from"], "alice");
    assert_eq!(frame["data"]["to"], "bob");
    assert_eq!(frame["data"]["message"], "hello bob");
    assert!(frame["data"]["timestamp"].as_str().unwrap().ends_with('Z'));

    let pool = app.state.db.clone();
    assert!(
        wait_for(|| {
            let pool = pool.clone();
            async move { chat::db::undelivered_for(&pool, "bob").await.unwrap().is_empty() }
        })
        .await
    );
    let history = chat::db::conversation(&app.state.db, "alice", "bob").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].delivered);

    // The sender never gets an echo
    alice_ws
        .expect_no_frame_of_type("chat", Duration::from_millis(200))
        .await;
}

#[tokio::test]
async fn test_offline_messages_replay_before_live_traffic() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut alice_ws = connect(&app, &alice).await;

    alice_ws.send_frame("chat", json!({ "to": "bob", "message": "first" })).await;
    alice_ws.send_frame("chat", json!({ "to": "bob", "message": "second" })).await;

    let pool = app.state.db.clone();
    assert!(
        wait_for(|| {
            let pool = pool.clone();
            async move { chat::db::undelivered_for(&pool, "bob").await.unwrap().len() == 2 }
        })
        .await
    );

    let mut bob_ws = connect(&app, &bob).await;
    alice_ws.send_frame("chat", json!({ "to": "bob", "message": "third" })).await;

    let mut received = Vec::new();
    for _ in 0..3 {
        let frame = bob_ws.next_frame_of_type("chat").await;
        received.push(frame["data"]["message"].as_str().unwrap().to_string());
    }
    assert_eq!(received, vec!["first", "second", "third"]);
    assert!(chat::db::undelivered_for(&app.state.db, "bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reconnect_supersedes_previous_connection() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut first = connect(&app, &alice).await;
    let mut second = connect(&app, &alice).await;

    let code = first.expect_closed().await;
    assert_eq!(code, Some(1001));
    assert_eq!(app.state.registry.connection_count(), 1);

    let mut bob_ws = connect(&app, &bob).await;
    bob_ws.send_frame("chat", json!({ "to": "alice", "message": "still there?" })).await;

    let frame = second.next_frame_of_type("chat").await;
    assert_eq!(frame["data"]["message"], "still there?");
}

#[tokio::test]
async fn test_disconnect_evicts_connection_and_subscriptions() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let group_id = app.group("hikers", &alice, &[]).await;
    let mut alice_ws = connect(&app, &alice).await;

    alice_ws.send_frame("subscribe", json!({ "groupId": group_id })).await;
    let registry = app.state.registry.clone();
    let alice_id = alice.id;
    assert!(wait_for(|| {
        let registry = registry.clone();
        async move { registry.subscribers(group_id) == vec![alice_id] }
    })
    .await);

    alice_ws.close().await;

    assert!(wait_for(|| {
        let registry = registry.clone();
        async move { registry.lookup_by_identity("alice").is_none() }
    })
    .await);
    assert!(registry.subscribers(group_id).is_empty());
    assert_eq!(registry.group_count(), 0);
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_keep_connection_open() {
    let app = TestApp::spawn_with(|builder| builder.error_acks(true)).await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut alice_ws = connect(&app, &alice).await;
    let mut bob_ws = connect(&app, &bob).await;

    alice_ws.send_raw("this is not json").await;
    let error = alice_ws.next_frame_of_type("error").await;
    assert_eq!(error["data"]["code"], 400);

    alice_ws.send_frame("typing", json!({ "to": "bob" })).await;
    alice_ws.send_frame("chat", json!({ "to": "bob", "message": "" })).await;
    let error = alice_ws.next_frame_of_type("error").await;
    assert_eq!(error["data"]["code"], 400);

    alice_ws.send_frame("chat", json!({ "to": "bob", "message": "after the noise" })).await;
    let frame = bob_ws.next_frame_of_type("chat").await;
    assert_eq!(frame["data"]["message"], "after the noise");
}

#[tokio::test]
async fn test_dropped_frames_are_silent_by_default() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let mut alice_ws = connect(&app, &alice).await;

    alice_ws.send_raw("{broken").await;

    alice_ws
        .expect_no_frame_of_type("error", Duration::from_millis(200))
        .await;
    assert!(app.state.registry.lookup_by_identity("alice").is_some());
}
