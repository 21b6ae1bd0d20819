// SPDX-License-Identifier: MIT

//! Firestore integration tests.
//!
//! Run with the emulator:
//!   FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test

use chrono::{Duration, Utc};
use plek_backend::models::{PasswordReset, User};
use plek_backend::services::password::generate_reset_token;

mod common;

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_user_upsert_get_delete() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = format!("uid-{}", uuid::Uuid::new_v4().simple());
    let user = User::new(
        uid.clone(),
        unique_email("crud"),
        "Jane".to_string(),
        "Doe".to_string(),
    );
    db.upsert_user(&user).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.email, user.email);
    assert_eq!(fetched.role, "user");
    assert!(fetched.is_active);

    assert!(db.delete_user(&uid).await.unwrap());
    assert!(db.get_user(&uid).await.unwrap().is_none());

    // Second delete reports non-existence
    assert!(!db.delete_user(&uid).await.unwrap());
}

#[tokio::test]
async fn test_find_user_by_email_is_case_insensitive() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = format!("uid-{}", uuid::Uuid::new_v4().simple());
    let email = unique_email("case");
    let user = User::new(uid.clone(), email.clone(), "A".to_string(), "B".to_string());
    db.upsert_user(&user).await.unwrap();

    let found = db
        .find_user_by_email(&email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id.as_deref(), Some(uid.as_str()));

    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_find_user_matches_legacy_casing() {
    require_emulator!();
    let db = common::test_db().await;

    // Legacy document whose stored email is not lowercase
    let uid = format!("uid-{}", uuid::Uuid::new_v4().simple());
    let email = unique_email("legacy").to_uppercase();
    let user = User::new(uid.clone(), email.clone(), "A".to_string(), "B".to_string());
    db.upsert_user(&user).await.unwrap();

    let found = db
        .find_user_by_email(&email.to_lowercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id.as_deref(), Some(uid.as_str()));

    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_reset_token_lifecycle() {
    require_emulator!();
    let db = common::test_db().await;

    let email = unique_email("reset");
    let token = generate_reset_token(32);
    let reset = PasswordReset::new(email.clone(), "uid-reset".to_string(), token.clone(), Utc::now());
    let created = db.create_password_reset(reset).await.unwrap();
    assert!(created.id.is_some());

    // Token lookup and one-active-per-email both see it
    let fetched = db.get_reset_by_token(&token).await.unwrap().unwrap();
    assert_eq!(fetched.email, email);
    assert!(db
        .get_active_reset_by_email(&email, Utc::now())
        .await
        .unwrap()
        .is_some());

    // Consuming the token removes it from the active set
    let mut used = fetched;
    used.mark_used(Utc::now());
    db.update_password_reset(&used).await.unwrap();

    assert!(db
        .get_active_reset_by_email(&email, Utc::now())
        .await
        .unwrap()
        .is_none());
    let after = db.get_reset_by_token(&token).await.unwrap().unwrap();
    assert!(after.used);
    assert!(after.used_at.is_some());

    db.delete_password_reset(created.id.as_deref().unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_token_not_active_and_swept() {
    require_emulator!();
    let db = common::test_db().await;

    let email = unique_email("expired");
    // Created two hours ago, so already past the one hour TTL
    let past = Utc::now() - Duration::hours(2);
    let reset = PasswordReset::new(
        email.clone(),
        "uid-expired".to_string(),
        generate_reset_token(32),
        past,
    );
    db.create_password_reset(reset).await.unwrap();

    assert!(db
        .get_active_reset_by_email(&email, Utc::now())
        .await
        .unwrap()
        .is_none());

    let deleted = db.delete_expired_resets(Utc::now()).await.unwrap();
    assert!(deleted >= 1);
}
