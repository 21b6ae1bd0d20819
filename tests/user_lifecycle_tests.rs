// SPDX-License-Identifier: MIT

//! End-to-end user lifecycle tests against the emulators.
//!
//! Run with both emulators:
//!   FIRESTORE_EMULATOR_HOST=localhost:8080 \
//!   FIREBASE_AUTH_EMULATOR_HOST=localhost:9099 cargo test

use plek_backend::config::Config;
use plek_backend::error::AppError;
use plek_backend::services::users::{CreateUserPayload, UserService};
use plek_backend::services::StorageService;

mod common;

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

async fn test_user_service() -> UserService {
    let config = Config::test_default();
    let db = common::test_db().await;
    let auth = common::test_auth(&config);
    let storage = StorageService::new_mock(&config.storage_bucket);
    UserService::new(db, auth, storage)
}

fn signup_payload(email: &str) -> CreateUserPayload {
    CreateUserPayload {
        email: Some(email.to_string()),
        first_name: Some("  JANE  ".to_string()),
        last_name: Some("DOE".to_string()),
        password: Some("Str0ng!pass".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_user_provisions_identity_and_document() {
    require_auth_emulator!();
    let service = test_user_service().await;

    let email = unique_email("Create");
    let user = service.create_user(signup_payload(&email), true).await.unwrap();

    // Email stored lowercased, names sanitized and title-cased
    assert_eq!(user.email, email.to_lowercase());
    assert_eq!(user.first_name, "Jane");
    assert_eq!(user.last_name, "Doe");
    let uid = user.id.clone().unwrap();

    let fetched = service.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.email, user.email);

    let (deleted, _) = service.delete_user(&uid).await.unwrap();
    assert!(deleted);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    require_auth_emulator!();
    let service = test_user_service().await;

    let email = unique_email("dup");
    let user = service.create_user(signup_payload(&email), true).await.unwrap();

    // Same email with different casing must still collide
    let err = service
        .create_user(signup_payload(&email.to_uppercase()), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    service.delete_user(user.id.as_deref().unwrap()).await.unwrap();
}

#[tokio::test]
async fn test_weak_password_rejected_before_provisioning() {
    require_auth_emulator!();
    let service = test_user_service().await;

    let email = unique_email("weak");
    let mut payload = signup_payload(&email);
    payload.password = Some("alllowercase1!".to_string());

    let err = service.create_user(payload, true).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // No document was written
    assert!(service.get_user_by_email(&email).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_unknown_user_reports_not_found() {
    require_auth_emulator!();
    let service = test_user_service().await;

    let (deleted, cleanup) = service.delete_user("no-such-uid").await.unwrap();
    assert!(!deleted);
    assert!(cleanup.is_none());
}
