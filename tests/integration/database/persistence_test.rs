//! Persistence integration tests
//!
//! Schema, restart durability and cross-module data flow against a real
//! SQLite file.

use pretty_assertions::assert_eq;
use socialnet::backend::auth::users::{get_user_by_email, get_user_id_by_nickname};
use socialnet::backend::chat;
use socialnet::backend::groups;
use socialnet::backend::server::init::connect_database;

use crate::common::TestApp;

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("twice.db").display());

    let first = connect_database(&url).await.unwrap();
    first.close().await;
    let second = connect_database(&url).await.unwrap();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(&second)
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn test_backlog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("durable.db").display());

    let pool = connect_database(&url).await.unwrap();
    chat::db::save_message(&pool, "alice", "bob", "see you", "2024-05-01T10:00:00Z")
        .await
        .unwrap();
    pool.close().await;

    let pool = connect_database(&url).await.unwrap();
    let backlog = chat::db::undelivered_for(&pool, "bob").await.unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].text, "see you");
    assert_eq!(backlog[0].timestamp, "2024-05-01T10:00:00Z");
}

#[tokio::test]
async fn test_seeded_users_and_groups() {
    let app = TestApp::spawn().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let group_id = app.group("hikers", &alice, &[&bob]).await;

    let stored = get_user_by_email(&app.state.db, "alice@example.com").await.unwrap().unwrap();
    assert_eq!(stored.id, alice.id);
    assert_eq!(get_user_id_by_nickname(&app.state.db, "bob").await.unwrap(), Some(bob.id));

    assert!(groups::db::is_member(&app.state.db, group_id, alice.id).await.unwrap());
    assert!(groups::db::is_member(&app.state.db, group_id, bob.id).await.unwrap());
    assert_eq!(
        groups::db::other_members(&app.state.db, group_id, alice.id).await.unwrap(),
        vec![bob.id]
    );
    assert_eq!(
        groups::db::group_name(&app.state.db, group_id).await.unwrap().as_deref(),
        Some("hikers")
    );
}
