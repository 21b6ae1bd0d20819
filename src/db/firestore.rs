// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile documents keyed by identity provider UID)
//! - Password resets (token records with expiry/used state)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{PasswordReset, User};
use chrono::{DateTime, Utc};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

// Hard ceiling for the legacy case-insensitive email scan. This fallback is
// O(n) and only correct for datasets within the cap; all new writes store
// lowercase so the primary lookup never reaches it.
const EMAIL_SCAN_LIMIT: u32 = 1000;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by identity provider UID (direct document lookup).
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user document, keyed by the UID in `user.id`.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let uid = user
            .id
            .as_deref()
            .ok_or_else(|| AppError::Database("User document has no ID".to_string()))?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user document. Returns false if it did not exist.
    pub async fn delete_user(&self, uid: &str) -> Result<bool, AppError> {
        if self.get_user(uid).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email, case-insensitively.
    ///
    /// Lookup order:
    /// 1. exact match on the lowercased email (all new writes store lowercase)
    /// 2. exact match on the literal input casing (legacy rows)
    /// 3. bounded full-collection scan comparing lowercased stored emails;
    ///    the legacy slow path, capped at EMAIL_SCAN_LIMIT documents.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let lower = email.to_lowercase();

        if let Some(user) = self.query_user_by_exact_email(&lower).await? {
            return Ok(Some(user));
        }

        if email != lower {
            if let Some(user) = self.query_user_by_exact_email(email).await? {
                return Ok(Some(user));
            }
        }

        tracing::debug!("No exact email match, falling back to bounded scan");

        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .limit(EMAIL_SCAN_LIMIT)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().find(|u| u.email.to_lowercase() == lower))
    }

    async fn query_user_by_exact_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut results: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(results.pop())
    }

    // ─── Password Reset Operations ───────────────────────────────

    /// Create a password reset record with a generated document ID.
    ///
    /// Returns the record with `id` populated.
    pub async fn create_password_reset(
        &self,
        mut reset: PasswordReset,
    ) -> Result<PasswordReset, AppError> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        reset.id = Some(doc_id.clone());

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PASSWORD_RESETS)
            .document_id(&doc_id)
            .object(&reset)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(reset)
    }

    /// Get a reset record by exact token match.
    pub async fn get_reset_by_token(&self, token: &str) -> Result<Option<PasswordReset>, AppError> {
        let token = token.to_string();
        let mut results: Vec<PasswordReset> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PASSWORD_RESETS)
            .filter(move |q| q.for_all([q.field("token").eq(token.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(results.pop())
    }

    /// Get the newest active (unused, unexpired) reset record for an email.
    pub async fn get_active_reset_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PasswordReset>, AppError> {
        let email = email.to_string();
        let now_str = now.to_rfc3339();

        let mut results: Vec<PasswordReset> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PASSWORD_RESETS)
            .filter(move |q| {
                q.for_all([
                    q.field("email").eq(email.clone()),
                    q.field("used").eq(false),
                    q.field("expires_at").greater_than(now_str.clone()),
                ])
            })
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(results.pop())
    }

    /// Persist a mutated reset record (e.g. after marking it used).
    pub async fn update_password_reset(&self, reset: &PasswordReset) -> Result<(), AppError> {
        let doc_id = reset
            .id
            .as_deref()
            .ok_or_else(|| AppError::Database("Password reset has no ID".to_string()))?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PASSWORD_RESETS)
            .document_id(doc_id)
            .object(reset)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a reset record (compensation after failed email delivery).
    pub async fn delete_password_reset(&self, reset_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PASSWORD_RESETS)
            .document_id(reset_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete all reset records whose expiry has passed.
    ///
    /// Deletes in bounded transaction batches, committing incrementally.
    /// Idempotent, safe to run repeatedly or concurrently.
    pub async fn delete_expired_resets(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let now_str = now.to_rfc3339();

        let expired: Vec<PasswordReset> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PASSWORD_RESETS)
            .filter(move |q| q.for_all([q.field("expires_at").less_than(now_str.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = expired.len();
        self.batch_delete(&expired, collections::PASSWORD_RESETS, |r: &PasswordReset| {
            r.id.clone().unwrap_or_default()
        })
        .await?;

        tracing::info!(count, "Deleted expired password reset tokens");
        Ok(count)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}
