// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment
//! environment (Cloud Run secret bindings); nothing is fetched at runtime.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Frontend base URL for password reset links
    pub frontend_url: String,
    /// Firebase Web API key (Identity Toolkit REST access)
    pub firebase_api_key: String,
    /// Cloud Storage bucket for uploaded files
    pub storage_bucket: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    // --- Mailgun ---
    pub mailgun_domain: String,
    pub mailgun_api_key: String,
    pub mail_from_email: String,
    pub mail_from_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            storage_bucket: env::var("STORAGE_BUCKET")
                .map_err(|_| ConfigError::Missing("STORAGE_BUCKET"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            mailgun_domain: env::var("MAILGUN_DOMAIN")
                .map_err(|_| ConfigError::Missing("MAILGUN_DOMAIN"))?,
            mailgun_api_key: env::var("MAILGUN_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MAILGUN_API_KEY"))?,
            mail_from_email: env::var("MAILGUN_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@plek.app".to_string()),
            mail_from_name: env::var("MAILGUN_FROM_NAME")
                .unwrap_or_else(|_| "Plek App".to_string()),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            firebase_api_key: "test-api-key".to_string(),
            storage_bucket: "test-bucket".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            mailgun_domain: "mg.test.example".to_string(),
            mailgun_api_key: "test-mailgun-key".to_string(),
            mail_from_email: "noreply@test.example".to_string(),
            mail_from_name: "Test App".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
