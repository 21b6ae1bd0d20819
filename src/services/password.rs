// SPDX-License-Identifier: MIT

//! Password reset and change workflows.
//!
//! Reset tokens are 32-character alphanumeric values from a CSPRNG, valid
//! for one hour and single-use. Requests for unknown emails return the same
//! generic message as successful ones so the endpoint cannot be used to
//! enumerate accounts.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::PasswordReset;
use crate::services::identity::FirebaseAuthClient;
use crate::services::mail::MailgunClient;
use crate::validators::{self, MIN_PASSWORD_LENGTH};
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};

/// Length of generated reset tokens.
const TOKEN_LENGTH: usize = 32;

/// Returned for every reset request, whether or not the account exists.
const GENERIC_RESET_MESSAGE: &str =
    "If an account exists with this email, a reset link has been sent.";

/// Service for password reset and change operations.
#[derive(Clone)]
pub struct PasswordService {
    db: FirestoreDb,
    auth: FirebaseAuthClient,
    mail: MailgunClient,
    /// Frontend page the emailed link points at; the token is appended as a
    /// query parameter.
    reset_base_url: String,
}

impl PasswordService {
    pub fn new(
        db: FirestoreDb,
        auth: FirebaseAuthClient,
        mail: MailgunClient,
        reset_base_url: String,
    ) -> Self {
        Self {
            db,
            auth,
            mail,
            reset_base_url,
        }
    }

    // ─── Reset Request ───────────────────────────────────────────

    /// Start a password reset for an email address.
    ///
    /// Always returns the same generic message when no email is sent, so
    /// callers learn nothing about account existence. A mail delivery
    /// failure deletes the freshly created token record before reporting
    /// the error.
    pub async fn request_reset(&self, email: &str) -> Result<String, AppError> {
        if !validators::validate_email(email) {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        let email = email.to_lowercase();

        let Some(identity) = self.auth.get_identity_by_email(&email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(GENERIC_RESET_MESSAGE.to_string());
        };

        // One active token per email. Checked-then-acted: two concurrent
        // requests can both pass this check and create two tokens, which is
        // acceptable since both expire on the same schedule.
        if self
            .db
            .get_active_reset_by_email(&email, Utc::now())
            .await?
            .is_some()
        {
            tracing::info!(uid = %identity.uid, "Active reset token already exists");
            return Ok(GENERIC_RESET_MESSAGE.to_string());
        }

        let token = generate_reset_token(TOKEN_LENGTH);
        let reset = PasswordReset::new(email.clone(), identity.uid.clone(), token.clone(), Utc::now());
        let created = self.db.create_password_reset(reset).await?;

        let reset_link = format!(
            "{}?token={}",
            self.reset_base_url,
            urlencoding::encode(&token)
        );

        if let Err(e) = self
            .mail
            .send_password_reset_email(&email, &reset_link, identity.display_name.as_deref())
            .await
        {
            // Compensate: without the email the token is unreachable, and
            // leaving it would block retries for the next hour.
            if let Some(id) = created.id.as_deref() {
                if let Err(del_err) = self.db.delete_password_reset(id).await {
                    tracing::error!(
                        error = %del_err,
                        "Failed to delete reset token after mail failure"
                    );
                }
            }
            tracing::error!(uid = %identity.uid, error = %e, "Password reset email failed");
            return Err(e);
        }

        tracing::info!(uid = %identity.uid, "Password reset email sent");
        Ok(GENERIC_RESET_MESSAGE.to_string())
    }

    // ─── Reset Completion ────────────────────────────────────────

    /// Complete a password reset with a token from the emailed link.
    ///
    /// The token is consumed only after the credential update succeeds, so
    /// a provider failure leaves it valid for a retry.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, AppError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        let Some(mut reset) = self.db.get_reset_by_token(token).await? else {
            return Err(AppError::NotFound(
                "Invalid or expired reset token".to_string(),
            ));
        };

        // Expiry wins over the used flag when both apply
        let now = Utc::now();
        if reset.is_expired(now) {
            return Err(AppError::Validation(
                "Reset token has expired. Please request a new one".to_string(),
            ));
        }
        if reset.used {
            return Err(AppError::Validation(
                "This reset token has already been used".to_string(),
            ));
        }

        self.auth
            .update_password(&reset.user_id, new_password)
            .await?;

        reset.mark_used(now);
        self.db.update_password_reset(&reset).await?;

        tracing::info!(uid = %reset.user_id, "Password reset completed");
        Ok("Password has been reset successfully".to_string())
    }

    // ─── Authenticated Change ────────────────────────────────────

    /// Change the password of an authenticated user.
    ///
    /// The current password is re-verified against the identity provider
    /// before the update, so a hijacked session alone is not enough.
    pub async fn change_password(
        &self,
        uid: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, AppError> {
        validators::validate_password_strength(new_password)
            .map_err(|msg| AppError::Validation(msg.to_string()))?;

        if current_password == new_password {
            return Err(AppError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let identity = self
            .auth
            .get_identity(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let email = identity.email.as_deref().ok_or(AppError::Unauthorized)?;
        self.auth.verify_credential(email, current_password).await?;

        self.auth.update_password(uid, new_password).await?;

        tracing::info!(uid = %uid, "Password changed");
        Ok("Password changed successfully".to_string())
    }

    // ─── Maintenance ─────────────────────────────────────────────

    /// Delete all expired reset tokens. Returns the number removed.
    pub async fn cleanup_expired_tokens(&self) -> Result<usize, AppError> {
        self.db.delete_expired_resets(Utc::now()).await
    }
}

/// Generate a random alphanumeric token of the given length.
///
/// Uses rejection sampling over CSPRNG bytes to keep the character
/// distribution uniform.
pub fn generate_reset_token(length: usize) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    // Largest multiple of 62 below 256; bytes at or above it are rejected.
    const LIMIT: u8 = (256 / 62 * 62) as u8;

    let rng = SystemRandom::new();
    let mut token = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while token.len() < length {
        rng.fill(&mut buf).expect("system CSPRNG failure");
        for &byte in &buf {
            if token.len() == length {
                break;
            }
            if byte < LIMIT {
                token.push(ALPHABET[(byte % 62) as usize] as char);
            }
        }
    }

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_and_alphabet() {
        let token = generate_reset_token(TOKEN_LENGTH);
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_reset_token(TOKEN_LENGTH);
        let b = generate_reset_token(TOKEN_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_survives_url_encoding() {
        // Alphanumeric tokens must pass through URL encoding unchanged
        let token = generate_reset_token(TOKEN_LENGTH);
        assert_eq!(urlencoding::encode(&token), token);
    }
}
