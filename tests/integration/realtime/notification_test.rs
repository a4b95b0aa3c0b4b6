//! Notification integration tests
//!
//! `notify_user` stores first and pushes live when the recipient is online;
//! the helper broadcasts reach only their intended audience.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use socialnet::backend::notifications::db::{notifications_for, unread_count};
use socialnet::backend::notifications::NotificationKind;

use crate::common::{connect, wait_for, TestApp};

#[tokio::test]
async fn test_notify_online_user_stores_and_pushes() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut bob_ws = connect(&app, &bob).await;

    let pushed = app
        .state
        .notifier
        .follow_request(bob.id, alice.id, "alice")
        .await
        .unwrap();
    assert!(pushed);

    let frame = bob_ws.next_frame_of_type("notification").await;
    assert_eq!(frame["data"]["type"], "follow_request");
    assert_eq!(frame["data"]["message"], "alice sent you a follow request");
    assert_eq!(frame["data"]["related_id"], alice.id);
    assert!(frame["data"]["timestamp"].as_i64().unwrap() > 0);

    let stored = notifications_for(&app.state.db, bob.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message, "alice sent you a follow request");
}

#[tokio::test]
async fn test_notify_offline_user_is_stored_only() {
    let app = TestApp::spawn().await;
    let bob = app.user("bob").await;

    let pushed = app
        .state
        .notifier
        .notify_user(bob.id, NotificationKind::EventCreated, "Picnic on Sunday", Some(3))
        .await
        .unwrap();

    assert!(!pushed);
    assert_eq!(unread_count(&app.state.db, bob.id).await.unwrap(), 1);
    let stored = notifications_for(&app.state.db, bob.id).await.unwrap();
    assert_eq!(stored[0].kind, "event_created");
    assert_eq!(stored[0].related_id, Some(3));
}

#[tokio::test]
async fn test_direct_message_creates_new_message_notification() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut alice_ws = connect(&app, &alice).await;

    alice_ws.send_frame("chat", json!({ "to": "bob", "message": "ping" })).await;

    let pool = app.state.db.clone();
    let bob_id = bob.id;
    assert!(
        wait_for(|| {
            let pool = pool.clone();
            async move { unread_count(&pool, bob_id).await.unwrap() == 1 }
        })
        .await
    );
    let stored = notifications_for(&app.state.db, bob.id).await.unwrap();
    assert_eq!(stored[0].kind, "new_message");
    assert_eq!(stored[0].message, "alice sent you a new message");
    assert_eq!(stored[0].related_id, None);
}

#[tokio::test]
async fn test_follow_status_and_request_updates_target_one_user() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let mut alice_ws = connect(&app, &alice).await;
    let mut bob_ws = connect(&app, &bob).await;

    assert!(app.state.notifier.notify_follow_status_update("bob", "accepted").await);
    assert!(app.state.notifier.broadcast_request_update("bob", "follow_request_update").await);
    assert!(!app.state.notifier.notify_follow_status_update("carol", "accepted").await);

    let frame = bob_ws.next_frame_of_type("follow_status_update").await;
    assert_eq!(frame["data"], json!({ "status": "accepted" }));
    let frame = bob_ws.next_frame_of_type("follow_request_update").await;
    assert_eq!(frame["data"], json!({ "action": "new_request" }));

    alice_ws
        .expect_no_frame_of_type("follow_status_update", Duration::from_millis(200))
        .await;
}

#[tokio::test]
async fn test_event_notification_update_skips_creator() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let group_id = app.group("hikers", &alice, &[&bob]).await;
    let mut alice_ws = connect(&app, &alice).await;
    let mut bob_ws = connect(&app, &bob).await;

    let delivered = app
        .state
        .notifier
        .broadcast_event_notification_update(11, group_id, alice.id)
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    let frame = bob_ws.next_frame_of_type("event_notification_update").await;
    assert_eq!(
        frame["data"],
        json!({ "event_id": 11, "group_id": group_id, "action": "new_event" })
    );
    alice_ws
        .expect_no_frame_of_type("event_notification_update", Duration::from_millis(200))
        .await;
}
