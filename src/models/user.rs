// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

fn default_role() -> String {
    "user".to_string()
}

fn default_true() -> bool {
    true
}

/// User profile stored in Firestore.
///
/// The document ID equals the identity provider's UID; `id` mirrors it in
/// the document body. Optional fields are omitted from the stored document
/// when absent and reconstruct to the same defaults on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity provider UID (also used as document ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Email address, stored lowercase
    pub email: String,
    /// First name
    pub first_name: String,
    /// Last name
    #[serde(default)]
    pub last_name: String,
    /// Role, defaults to "user"
    #[serde(default = "default_role")]
    pub role: String,
    /// Profile picture URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Account active flag
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether the user finished onboarding
    #[serde(default)]
    pub onboarding_completed: bool,
    /// Preferred language code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Free-form location structure (address, city, coordinates, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
    /// Email notification preference
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    /// Push notification preference
    #[serde(default = "default_true")]
    pub push_notification: bool,
    /// Short free-form bio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Creation timestamp (RFC 3339), set once
    pub created_at: String,
    /// Last mutation timestamp (RFC 3339)
    pub updated_at: String,
}

impl User {
    /// Create a new user with defaults, keyed by the identity provider UID.
    pub fn new(uid: String, email: String, first_name: String, last_name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Some(uid),
            email,
            first_name,
            last_name,
            role: default_role(),
            profile_picture: None,
            phone_number: None,
            is_active: true,
            onboarding_completed: false,
            language: None,
            location: None,
            email_notifications: true,
            push_notification: true,
            bio: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Refresh the mutation timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
