// SPDX-License-Identifier: MIT

use plek_backend::config::Config;
use plek_backend::db::FirestoreDb;
use plek_backend::routes::create_router;
use plek_backend::services::{
    FirebaseAuthClient, MailgunClient, PasswordService, StorageService, UserService,
};
use plek_backend::AppState;
use std::sync::Arc;

/// Check if the Firestore emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Check if the Firebase Auth emulator is also available.
#[allow(dead_code)]
pub fn auth_emulator_available() -> bool {
    std::env::var("FIREBASE_AUTH_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Skip test unless both the Firestore and Auth emulators are available.
#[macro_export]
macro_rules! require_auth_emulator {
    () => {
        crate::require_emulator!();
        if !crate::common::auth_emulator_available() {
            eprintln!("⚠️  Skipping: FIREBASE_AUTH_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test identity client.
#[allow(dead_code)]
pub fn test_auth(config: &Config) -> FirebaseAuthClient {
    FirebaseAuthClient::new(
        config.firebase_api_key.clone(),
        config.jwt_signing_key.clone(),
    )
    .expect("Failed to build identity client")
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let auth = test_auth(&config);
    let storage = StorageService::new_mock(&config.storage_bucket);
    let mail = MailgunClient::new_mock();

    let user_service = UserService::new(db.clone(), auth.clone(), storage);
    let password_service = PasswordService::new(
        db.clone(),
        auth.clone(),
        mail,
        format!("{}/reset-password", config.frontend_url),
    );

    let state = Arc::new(AppState {
        config,
        db,
        auth,
        user_service,
        password_service,
    });

    (create_router(state.clone()), state)
}

/// Create a session token the middleware will accept.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    plek_backend::services::identity::create_session_jwt(uid, signing_key)
        .expect("Failed to create session token")
}
