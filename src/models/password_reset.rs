// SPDX-License-Identifier: MIT

//! Password reset token model.
//!
//! State machine per record: created → used (terminal) or created → expired
//! (terminal, evaluated lazily at consumption time; expired rows are only
//! removed by the cleanup sweep).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long a reset token stays valid.
pub const TOKEN_TTL_HOURS: i64 = 1;

/// Password reset record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    /// Document ID (assigned by the repository on create)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Email the reset was requested for
    pub email: String,
    /// Owning user's identity provider UID
    pub user_id: String,
    /// Opaque random token (never logged in cleartext)
    pub token: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Absolute expiry (RFC 3339), created_at + TTL
    pub expires_at: String,
    /// Single-use flag; once true the token can never authorize a change
    #[serde(default)]
    pub used: bool,
    /// When the token was consumed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<String>,
}

impl PasswordReset {
    /// Create a new unused reset record expiring after the fixed TTL.
    pub fn new(email: String, user_id: String, token: String, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            email,
            user_id,
            token,
            created_at: now.to_rfc3339(),
            expires_at: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).to_rfc3339(),
            used: false,
            used_at: None,
        }
    }

    /// Whether the token has passed its absolute expiry.
    ///
    /// An unparseable expiry counts as expired rather than valid forever.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires) => now > expires.with_timezone(&Utc),
            Err(_) => true,
        }
    }

    /// Unused and unexpired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }

    /// Mark the token as consumed.
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        self.used = true;
        self.used_at = Some(now.to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> PasswordReset {
        PasswordReset::new(
            "x@y.com".to_string(),
            "uid-1".to_string(),
            "sometoken".to_string(),
            now,
        )
    }

    #[test]
    fn test_fresh_token_is_active() {
        let now = Utc::now();
        let reset = sample(now);
        assert!(!reset.used);
        assert!(!reset.is_expired(now));
        assert!(reset.is_active(now));
    }

    #[test]
    fn test_expiry_is_absolute_wall_clock() {
        let now = Utc::now();
        let reset = sample(now);

        let just_before = now + chrono::Duration::minutes(59);
        assert!(!reset.is_expired(just_before));

        let after = now + chrono::Duration::hours(1) + chrono::Duration::seconds(1);
        assert!(reset.is_expired(after));
        // Expired even though never used
        assert!(!reset.used);
        assert!(!reset.is_active(after));
    }

    #[test]
    fn test_mark_used_is_terminal() {
        let now = Utc::now();
        let mut reset = sample(now);
        reset.mark_used(now);
        assert!(reset.used);
        assert!(reset.used_at.is_some());
        assert!(!reset.is_active(now));
    }

    #[test]
    fn test_unparseable_expiry_counts_as_expired() {
        let now = Utc::now();
        let mut reset = sample(now);
        reset.expires_at = "garbage".to_string();
        assert!(reset.is_expired(now));
    }

    #[test]
    fn test_round_trip_omits_unset_fields() {
        let now = Utc::now();
        let reset = sample(now);
        let json = serde_json::to_value(&reset).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("used_at").is_none());

        let back: PasswordReset = serde_json::from_value(json).unwrap();
        assert_eq!(back.token, reset.token);
        assert!(!back.used);
    }
}
