// SPDX-License-Identifier: MIT

//! User lifecycle service.
//!
//! Orchestrates user create/update/delete across the Firestore user
//! collection and the identity provider, enforcing email uniqueness,
//! cross-system consistency, and profile-picture upload side effects.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::services::identity::FirebaseAuthClient;
use crate::services::storage::{self, StorageService};
use crate::validators;
use serde::{Deserialize, Serialize};

/// Payload for user creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserPayload {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Required unless a pre-existing credential id is supplied
    pub password: Option<String>,
    pub role: Option<String>,
    pub phone_number: Option<String>,
    /// Base64 image data or an already-hosted URL
    pub profile_picture: Option<String>,
    pub language: Option<String>,
    pub location: Option<serde_json::Value>,
    pub bio: Option<String>,
    /// Pre-existing identity provider UID, if the account already exists
    pub firebase_uid: Option<String>,
}

/// Payload for partial user update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserPayload {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
    pub language: Option<String>,
    pub location: Option<serde_json::Value>,
    pub bio: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notification: Option<bool>,
    pub is_active: Option<bool>,
}

/// Counts of related records removed alongside a user.
///
/// Related-data cleanup was descoped when the complex entity relationships
/// were removed; this stays informational for API compatibility.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanupCounts {
    pub notifications: usize,
    pub device_tokens: usize,
}

/// Service for user-related operations.
#[derive(Clone)]
pub struct UserService {
    db: FirestoreDb,
    auth: FirebaseAuthClient,
    storage: StorageService,
}

impl UserService {
    pub fn new(db: FirestoreDb, auth: FirebaseAuthClient, storage: StorageService) -> Self {
        Self { db, auth, storage }
    }

    // ─── Lookup ──────────────────────────────────────────────────

    /// Get a user by identity provider UID.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        if uid.is_empty() {
            return Err(AppError::Validation("User ID cannot be empty".to_string()));
        }
        self.db.get_user(uid).await
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        if !validators::validate_email(email) {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        self.db.find_user_by_email(email).await
    }

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.db.list_users().await
    }

    // ─── Create ──────────────────────────────────────────────────

    /// Create a new user.
    ///
    /// Provisions an identity provider account first (unless a credential id
    /// is supplied), then persists the user document keyed by the UID. No
    /// partial user document is left behind on any failure path; an identity
    /// account created before a failed document write is not compensated and
    /// is logged as an inconsistency.
    pub async fn create_user(
        &self,
        payload: CreateUserPayload,
        create_auth_user: bool,
    ) -> Result<User, AppError> {
        let mut required = vec![
            ("email", payload.email.as_deref()),
            ("first_name", payload.first_name.as_deref()),
        ];
        if create_auth_user && payload.firebase_uid.is_none() {
            required.push(("password", payload.password.as_deref()));
        }
        let missing = validators::missing_required_fields(&required);
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let raw_email = payload.email.as_deref().unwrap_or_default();
        if !validators::validate_email(raw_email) {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        // Store email in lowercase for consistent lookups
        let email = raw_email.to_lowercase();

        if let Some(phone) = payload.phone_number.as_deref() {
            if !phone.is_empty() && !validators::validate_phone_number(phone) {
                return Err(AppError::Validation(
                    "Invalid phone number format".to_string(),
                ));
            }
        }

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User with email {} already exists",
                email
            )));
        }

        let first_name = normalize_name(payload.first_name.as_deref().unwrap_or_default());
        let last_name = normalize_name(payload.last_name.as_deref().unwrap_or_default());

        // Upload the profile picture before the user document exists; an
        // upload failure aborts the whole operation.
        let profile_picture = match payload.profile_picture.as_deref() {
            Some(data) if !data.is_empty() && !storage::is_url(data) => {
                self.storage
                    .validate_image(data)
                    .map_err(AppError::Validation)?;
                let file_name = format!("profile_{}.jpg", uuid::Uuid::new_v4());
                let url = self.storage.upload(data, &file_name, "profile_photos").await?;
                tracing::info!("Profile picture uploaded during user creation");
                Some(url)
            }
            Some(data) if !data.is_empty() => Some(validators::sanitize_input(data)),
            _ => None,
        };

        let uid = match payload.firebase_uid {
            Some(uid) if !uid.is_empty() => uid,
            _ => {
                if !create_auth_user {
                    return Err(AppError::Validation(
                        "A credential id is required to create a user".to_string(),
                    ));
                }
                let password = payload.password.as_deref().unwrap_or_default();
                validators::validate_password_strength(password)
                    .map_err(|msg| AppError::Validation(msg.to_string()))?;

                let display_name = format!("{} {}", first_name, last_name);
                self.auth
                    .create_identity(&email, password, Some(display_name.trim()))
                    .await?
            }
        };

        let mut user = User::new(uid.clone(), email, first_name, last_name);
        if let Some(role) = payload.role {
            user.role = role;
        }
        user.phone_number = payload.phone_number.filter(|p| !p.is_empty());
        user.profile_picture = profile_picture;
        user.language = payload.language;
        user.location = payload.location;
        user.bio = payload.bio.as_deref().map(validators::sanitize_input);

        if let Err(e) = self.db.upsert_user(&user).await {
            // Known inconsistency window: the identity account exists but the
            // document write failed. Not compensated, matching the original
            // system's behavior.
            tracing::error!(
                uid = %uid,
                error = %e,
                "User document write failed after identity creation"
            );
            return Err(e);
        }

        tracing::info!(uid = %uid, "User created");
        Ok(user)
    }

    // ─── Update ──────────────────────────────────────────────────

    /// Update an existing user with a partial payload.
    pub async fn update_user(
        &self,
        uid: &str,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        let mut user = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        if let Some(raw_email) = payload.email.as_deref() {
            if !validators::validate_email(raw_email) {
                return Err(AppError::Validation("Invalid email format".to_string()));
            }
            let email = raw_email.to_lowercase();

            if email != user.email.to_lowercase() {
                if let Some(other) = self.db.find_user_by_email(&email).await? {
                    if other.id.as_deref() != Some(uid) {
                        return Err(AppError::Conflict(format!(
                            "Email {} is already in use",
                            email
                        )));
                    }
                }

                // Propagate to the identity provider before persisting
                self.auth.update_email(uid, &email).await?;
                user.email = email;
            }
        }

        if let Some(phone) = payload.phone_number {
            if phone.is_empty() {
                user.phone_number = None;
            } else {
                if !validators::validate_phone_number(&phone) {
                    return Err(AppError::Validation(
                        "Invalid phone number format".to_string(),
                    ));
                }
                user.phone_number = Some(phone);
            }
        }

        if let Some(first_name) = payload.first_name.as_deref() {
            user.first_name = normalize_name(first_name);
        }
        if let Some(last_name) = payload.last_name.as_deref() {
            user.last_name = normalize_name(last_name);
        }

        if let Some(data) = payload.profile_picture.as_deref() {
            if !data.is_empty() {
                user.profile_picture = Some(self.process_photo_data(uid, data).await?);
            }
        }

        if let Some(role) = payload.role {
            user.role = role;
        }
        if let Some(language) = payload.language {
            user.language = Some(language);
        }
        if let Some(location) = payload.location {
            user.location = Some(location);
        }
        if let Some(bio) = payload.bio.as_deref() {
            user.bio = Some(validators::sanitize_input(bio));
        }
        if let Some(flag) = payload.email_notifications {
            user.email_notifications = flag;
        }
        if let Some(flag) = payload.push_notification {
            user.push_notification = flag;
        }
        if let Some(flag) = payload.is_active {
            user.is_active = flag;
        }

        user.touch();
        self.db.upsert_user(&user).await?;

        tracing::info!(uid = %uid, "User updated");
        Ok(user)
    }

    /// Update a user's onboarding completion status.
    pub async fn update_onboarding_status(
        &self,
        uid: &str,
        onboarding_completed: bool,
    ) -> Result<User, AppError> {
        let mut user = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        user.onboarding_completed = onboarding_completed;
        user.touch();
        self.db.upsert_user(&user).await?;

        tracing::info!(uid = %uid, onboarding_completed, "Onboarding status updated");
        Ok(user)
    }

    /// Process a profile photo (upload if base64, sanitize if URL) and store
    /// the resulting URL on the user.
    pub async fn process_user_photo(
        &self,
        uid: &str,
        photo_data: &str,
    ) -> Result<(String, User), AppError> {
        let mut user = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        let photo_url = self.process_photo_data(uid, photo_data).await?;

        user.profile_picture = Some(photo_url.clone());
        user.touch();
        self.db.upsert_user(&user).await?;

        Ok((photo_url, user))
    }

    /// Validate and upload photo data, or sanitize an already-hosted URL.
    async fn process_photo_data(&self, uid: &str, data: &str) -> Result<String, AppError> {
        if storage::is_url(data) {
            return Ok(validators::sanitize_input(data));
        }

        self.storage
            .validate_image(data)
            .map_err(AppError::Validation)?;
        let file_name = format!("profile_{}_{}.jpg", uid, uuid::Uuid::new_v4());
        let url = self.storage.upload(data, &file_name, "profile_photos").await?;
        tracing::info!(uid = %uid, "Profile picture uploaded");
        Ok(url)
    }

    // ─── Delete ──────────────────────────────────────────────────

    /// Delete a user.
    ///
    /// The document delete is authoritative. Identity provider deletion is
    /// best-effort: a failure there is logged but the operation still
    /// reports success.
    pub async fn delete_user(
        &self,
        uid: &str,
    ) -> Result<(bool, Option<CleanupCounts>), AppError> {
        if self.db.get_user(uid).await?.is_none() {
            tracing::warn!(uid = %uid, "Attempted to delete non-existent user");
            return Ok((false, None));
        }

        let deleted = self.db.delete_user(uid).await?;
        if !deleted {
            return Ok((false, None));
        }

        if let Err(e) = self.auth.delete_identity(uid).await {
            tracing::warn!(
                uid = %uid,
                error = %e,
                "User deleted from database but not from identity provider"
            );
        }

        tracing::info!(uid = %uid, "User deleted");
        Ok((true, None))
    }
}

/// Sanitize a name field and re-titlecase fully-uppercase input.
fn normalize_name(name: &str) -> String {
    validators::normalize_name_case(&validators::sanitize_input(name))
}
