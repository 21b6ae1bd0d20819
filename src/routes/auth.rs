// SPDX-License-Identifier: MIT

//! Login and session routes.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::routes::ApiResponse;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/auth/login", post(login))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/auth/me", get(me))
}

#[derive(Deserialize)]
struct LoginPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    /// Provider-issued ID token, for clients signing in via the Firebase SDK
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

/// Verify credentials and issue a session token.
///
/// Accepts either an email/password pair or a provider-issued ID token.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let identity = match (&payload.id_token, &payload.email, &payload.password) {
        (Some(id_token), _, _) => state.auth.verify_id_token(id_token).await?,
        (None, Some(email), Some(password)) => {
            state
                .auth
                .verify_credential(&email.to_lowercase(), password)
                .await?
        }
        _ => {
            return Err(AppError::Validation(
                "Either id_token or email and password are required".to_string(),
            ))
        }
    };

    // The profile document is authoritative; a credential without one is
    // treated as an invalid login.
    let user = state
        .user_service
        .get_user(&identity.uid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let token = state.auth.issue_token(&identity.uid)?;
    Ok(ApiResponse::data(LoginResponse { token, user }))
}

/// Return the profile of the authenticated caller.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state
        .user_service
        .get_user(&auth_user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::data(user))
}
