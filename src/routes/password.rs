// SPDX-License-Identifier: MIT

//! Password reset and change routes.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::ApiResponse;
use crate::validators;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/password/reset-request", post(reset_request))
        .route("/api/v1/password/reset", post(reset))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/password/change", post(change))
        .route("/api/v1/password/cleanup", post(cleanup))
}

#[derive(Deserialize)]
struct ResetRequestPayload {
    email: String,
}

/// Request a password reset link.
///
/// The response is identical whether or not the email has an account.
async fn reset_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequestPayload>,
) -> Result<Json<ApiResponse<()>>> {
    let message = state.password_service.request_reset(&payload.email).await?;
    Ok(ApiResponse::message(message))
}

#[derive(Deserialize)]
struct ResetPayload {
    token: String,
    new_password: String,
}

/// Complete a password reset with a token from the emailed link.
///
/// The new password must meet the same strength rules as every other
/// credential path; the service only re-checks length defensively.
async fn reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPayload>,
) -> Result<Json<ApiResponse<()>>> {
    validators::validate_password_strength(&payload.new_password)
        .map_err(|msg| AppError::Validation(msg.to_string()))?;

    let message = state
        .password_service
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(ApiResponse::message(message))
}

#[derive(Deserialize)]
struct ChangePayload {
    current_password: String,
    new_password: String,
}

/// Change the password of the authenticated caller.
async fn change(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePayload>,
) -> Result<Json<ApiResponse<()>>> {
    let message = state
        .password_service
        .change_password(
            &auth_user.uid,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;
    Ok(ApiResponse::message(message))
}

#[derive(Serialize)]
struct CleanupResponse {
    deleted: usize,
}

/// Delete expired reset tokens (scheduled maintenance endpoint).
async fn cleanup(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<CleanupResponse>>> {
    let deleted = state.password_service.cleanup_expired_tokens().await?;
    Ok(ApiResponse::data(CleanupResponse { deleted }))
}
