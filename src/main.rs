// SPDX-License-Identifier: MIT

//! Plek API Server
//!
//! User and credential lifecycle backend: Firestore profile documents,
//! Firebase Auth credentials, GCS-hosted profile media, and the Mailgun
//! password reset workflow.

use plek_backend::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseAuthClient, MailgunClient, PasswordService, StorageService, UserService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Plek API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let auth = FirebaseAuthClient::new(
        config.firebase_api_key.clone(),
        config.jwt_signing_key.clone(),
    )
    .expect("Failed to initialize identity client");
    tracing::info!("Identity provider client initialized");

    let storage = StorageService::new(&config.storage_bucket)
        .expect("Failed to initialize storage client");
    tracing::info!(bucket = %config.storage_bucket, "Storage client initialized");

    let mail = MailgunClient::new(
        config.mailgun_domain.clone(),
        config.mailgun_api_key.clone(),
        config.mail_from_email.clone(),
        config.mail_from_name.clone(),
    )
    .expect("Failed to initialize mail client");

    let user_service = UserService::new(db.clone(), auth.clone(), storage);
    let password_service = PasswordService::new(
        db.clone(),
        auth.clone(),
        mail,
        format!("{}/reset-password", config.frontend_url),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        auth,
        user_service,
        password_service,
    });

    // Build router
    let app = plek_backend::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plek_backend=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
