// SPDX-License-Identifier: MIT

//! User lifecycle routes.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::routes::ApiResponse;
use crate::services::users::{CreateUserPayload, UpdateUserPayload};
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    // Signup has no session yet
    Router::new().route("/api/v1/users", post(create_user))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users/{uid}", get(get_user))
        .route("/api/v1/users/{uid}", put(update_user))
        .route("/api/v1/users/{uid}", delete(delete_user))
        .route("/api/v1/users/{uid}/photo", post(upload_photo))
        .route("/api/v1/users/{uid}/onboarding", put(update_onboarding))
}

/// Create a new user account.
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.user_service.create_user(payload, true).await?;
    Ok(ApiResponse::data_with_message(
        user,
        "User created successfully",
    ))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state
        .user_service
        .get_user(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
    Ok(ApiResponse::data(user))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Vec<User>>>> {
    let users = state.user_service.list_users().await?;
    Ok(ApiResponse::data(users))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.user_service.update_user(&uid, payload).await?;
    Ok(ApiResponse::data_with_message(
        user,
        "User updated successfully",
    ))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    let (deleted, _cleanup) = state.user_service.delete_user(&uid).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("User {} not found", uid)));
    }
    Ok(ApiResponse::message("User deleted successfully"))
}

#[derive(Deserialize)]
struct PhotoPayload {
    /// Base64 image data or an already-hosted URL
    photo: String,
}

async fn upload_photo(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(payload): Json<PhotoPayload>,
) -> Result<Json<ApiResponse<User>>> {
    let (_url, user) = state
        .user_service
        .process_user_photo(&uid, &payload.photo)
        .await?;
    Ok(ApiResponse::data_with_message(
        user,
        "Profile photo updated",
    ))
}

#[derive(Deserialize)]
struct OnboardingPayload {
    onboarding_completed: bool,
}

async fn update_onboarding(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(payload): Json<OnboardingPayload>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state
        .user_service
        .update_onboarding_status(&uid, payload.onboarding_completed)
        .await?;
    Ok(ApiResponse::data(user))
}
