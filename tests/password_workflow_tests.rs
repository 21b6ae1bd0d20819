// SPDX-License-Identifier: MIT

//! Password reset workflow tests against the emulators.

use plek_backend::config::Config;
use plek_backend::error::AppError;
use plek_backend::models::PasswordReset;
use plek_backend::services::password::generate_reset_token;
use plek_backend::services::users::CreateUserPayload;
use plek_backend::services::{MailgunClient, PasswordService, StorageService, UserService};

mod common;

const RESET_BASE_URL: &str = "http://localhost:5173/reset-password";

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

struct Harness {
    users: UserService,
    passwords: PasswordService,
    failing_mail: PasswordService,
}

async fn harness() -> Harness {
    let config = Config::test_default();
    let db = common::test_db().await;
    let auth = common::test_auth(&config);
    let storage = StorageService::new_mock(&config.storage_bucket);

    Harness {
        users: UserService::new(db.clone(), auth.clone(), storage),
        passwords: PasswordService::new(
            db.clone(),
            auth.clone(),
            MailgunClient::new_mock(),
            RESET_BASE_URL.to_string(),
        ),
        failing_mail: PasswordService::new(
            db,
            auth,
            MailgunClient::new_mock_failing(),
            RESET_BASE_URL.to_string(),
        ),
    }
}

async fn signup(users: &UserService, email: &str) -> String {
    let payload = CreateUserPayload {
        email: Some(email.to_string()),
        first_name: Some("Pat".to_string()),
        last_name: Some("Lee".to_string()),
        password: Some("Str0ng!pass".to_string()),
        ..Default::default()
    };
    users
        .create_user(payload, true)
        .await
        .unwrap()
        .id
        .unwrap()
}

#[tokio::test]
async fn test_unknown_email_gets_generic_message_and_no_record() {
    require_auth_emulator!();
    let h = harness().await;
    let db = common::test_db().await;

    let email = unique_email("ghost");
    let message = h.passwords.request_reset(&email).await.unwrap();
    assert!(message.contains("If an account exists"));

    // No token record was persisted for the unknown email
    assert!(db
        .get_active_reset_by_email(&email, chrono::Utc::now())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_second_request_reuses_active_token() {
    require_auth_emulator!();
    let h = harness().await;
    let db = common::test_db().await;

    let email = unique_email("repeat");
    let uid = signup(&h.users, &email).await;

    h.passwords.request_reset(&email).await.unwrap();
    let first = db
        .get_active_reset_by_email(&email, chrono::Utc::now())
        .await
        .unwrap()
        .unwrap();

    // A second request while the first token is active creates nothing new
    h.passwords.request_reset(&email).await.unwrap();
    let second = db
        .get_active_reset_by_email(&email, chrono::Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.token, second.token);

    h.users.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_mail_failure_deletes_fresh_token() {
    require_auth_emulator!();
    let h = harness().await;
    let db = common::test_db().await;

    let email = unique_email("bounce");
    let uid = signup(&h.users, &email).await;

    let err = h.failing_mail.request_reset(&email).await.unwrap_err();
    assert!(matches!(err, AppError::Mail(_)));

    // Compensation removed the record, so a retry is not blocked
    assert!(db
        .get_active_reset_by_email(&email, chrono::Utc::now())
        .await
        .unwrap()
        .is_none());

    h.users.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    require_auth_emulator!();
    let h = harness().await;
    let db = common::test_db().await;

    let email = unique_email("once");
    let uid = signup(&h.users, &email).await;

    h.passwords.request_reset(&email).await.unwrap();
    let token = db
        .get_active_reset_by_email(&email, chrono::Utc::now())
        .await
        .unwrap()
        .unwrap()
        .token;

    h.passwords
        .reset_password(&token, "N3w!Passw0rd")
        .await
        .unwrap();

    let err = h
        .passwords
        .reset_password(&token, "An0ther!Pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(msg) if msg.contains("already been used")));

    h.users.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_rejected_reset_leaves_token_usable() {
    require_auth_emulator!();
    let h = harness().await;
    let db = common::test_db().await;

    let email = unique_email("retry");
    let uid = signup(&h.users, &email).await;

    h.passwords.request_reset(&email).await.unwrap();
    let token = db
        .get_active_reset_by_email(&email, chrono::Utc::now())
        .await
        .unwrap()
        .unwrap()
        .token;

    // A too-short password is rejected without consuming the token
    let err = h.passwords.reset_password(&token, "short").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    h.passwords
        .reset_password(&token, "N3w!Passw0rd")
        .await
        .unwrap();

    h.users.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_expired_token_reports_expired_and_stays_unused() {
    require_emulator!();
    let h = harness().await;
    let db = common::test_db().await;

    // Record created two hours ago, well past the one hour TTL
    let email = unique_email("stale");
    let token = generate_reset_token(32);
    let past = chrono::Utc::now() - chrono::Duration::hours(2);
    let reset = PasswordReset::new(email, "uid-stale".to_string(), token.clone(), past);
    let created = db.create_password_reset(reset).await.unwrap();

    let err = h
        .passwords
        .reset_password(&token, "N3w!Passw0rd")
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::Validation(msg) if msg.contains("expired")));

    // The failed attempt did not consume the token
    let after = db.get_reset_by_token(&token).await.unwrap().unwrap();
    assert!(!after.used);

    // Expiry is reported even for a token that was also consumed
    let mut used = after;
    used.mark_used(chrono::Utc::now());
    db.update_password_reset(&used).await.unwrap();
    let err = h
        .passwords
        .reset_password(&token, "N3w!Passw0rd")
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::Validation(msg) if msg.contains("expired")));

    db.delete_password_reset(created.id.as_deref().unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    require_auth_emulator!();
    let h = harness().await;

    let err = h
        .passwords
        .reset_password("definitely-not-a-real-token-value", "N3w!Passw0rd")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_change_password_requires_current() {
    require_auth_emulator!();
    let h = harness().await;

    let email = unique_email("change");
    let uid = signup(&h.users, &email).await;

    // Wrong current password is a generic auth failure
    let err = h
        .passwords
        .change_password(&uid, "WrongCurrent1!", "N3w!Passw0rd")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    // Correct current password succeeds
    h.passwords
        .change_password(&uid, "Str0ng!pass", "N3w!Passw0rd")
        .await
        .unwrap();

    h.users.delete_user(&uid).await.unwrap();
}
