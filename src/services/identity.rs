// SPDX-License-Identifier: MIT

//! Identity provider client (Firebase Auth / Identity Toolkit REST API).
//!
//! Handles:
//! - Account provisioning and deletion
//! - Email/password updates
//! - Credential verification (sign-in)
//! - Session token issuance for authenticated clients
//!
//! Admin operations authenticate with a service bearer token injected by the
//! deployment environment (`GOOGLE_ACCESS_TOKEN`); under the Auth emulator
//! (`FIREBASE_AUTH_EMULATOR_HOST`) the literal token `owner` is accepted.

use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

/// Outbound request timeout (seconds).
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Session token lifetime (30 days).
const SESSION_TOKEN_TTL_SECS: usize = 30 * 24 * 60 * 60;

/// Identity provider account record.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityRecord {
    #[serde(rename = "localId")]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(rename = "localId")]
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<IdentityRecord>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Firebase Auth client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    admin_token: Option<String>,
    jwt_signing_key: Vec<u8>,
}

impl FirebaseAuthClient {
    /// Create a new client.
    ///
    /// Honors `FIREBASE_AUTH_EMULATOR_HOST` for local development and tests.
    pub fn new(api_key: String, jwt_signing_key: Vec<u8>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let (base_url, admin_token) =
            if let Ok(host) = std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                (
                    format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                    Some("owner".to_string()),
                )
            } else {
                (
                    "https://identitytoolkit.googleapis.com/v1".to_string(),
                    std::env::var("GOOGLE_ACCESS_TOKEN").ok(),
                )
            };

        Ok(Self {
            http,
            base_url,
            api_key,
            admin_token,
            jwt_signing_key,
        })
    }

    fn endpoint(&self, op: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, op, self.api_key)
    }

    /// POST a JSON body to an Identity Toolkit operation.
    ///
    /// Admin operations attach the service bearer token when available.
    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        op: &str,
        body: &serde_json::Value,
        admin: bool,
    ) -> Result<T, AppError> {
        let mut request = self.http.post(self.endpoint(op)).json(body);
        if admin {
            if let Some(token) = &self.admin_token {
                request = request.bearer_auth(token);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::IdentityProvider(format!("Invalid response: {}", e)));
        }

        let text = response.text().await.unwrap_or_default();
        let code = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.error.message)
            .unwrap_or_default();

        Err(Self::map_provider_error(&code, status, &text))
    }

    /// Translate provider error codes into the application taxonomy.
    ///
    /// Authentication failures collapse to a generic error so that raw
    /// provider text never reaches the client (no credential oracle).
    fn map_provider_error(
        code: &str,
        status: reqwest::StatusCode,
        raw: &str,
    ) -> AppError {
        if code.starts_with("EMAIL_EXISTS") {
            return AppError::Conflict("Email is already registered".to_string());
        }
        if code.starts_with("EMAIL_NOT_FOUND")
            || code.starts_with("INVALID_PASSWORD")
            || code.starts_with("INVALID_LOGIN_CREDENTIALS")
            || code.starts_with("USER_DISABLED")
            || code.starts_with("INVALID_ID_TOKEN")
            || code.starts_with("TOKEN_EXPIRED")
        {
            tracing::warn!(code = %code, "Identity provider rejected credentials");
            return AppError::Unauthorized;
        }
        if code.starts_with("USER_NOT_FOUND") {
            return AppError::NotFound("User not found".to_string());
        }
        if code.starts_with("WEAK_PASSWORD") {
            return AppError::Validation("Password is too weak".to_string());
        }
        AppError::IdentityProvider(format!("{} {}: {}", status, code, raw))
    }

    // ─── Account Provisioning ────────────────────────────────────

    /// Create a new identity account, returning the assigned UID.
    pub async fn create_identity(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, AppError> {
        let mut body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": false,
        });
        if let Some(name) = display_name {
            body["displayName"] = serde_json::Value::String(name.to_string());
        }

        let created: SignUpResponse = self.post("signUp", &body, false).await?;
        tracing::info!(uid = %created.local_id, "Identity account created");
        Ok(created.local_id)
    }

    /// Update an account's email.
    pub async fn update_email(&self, uid: &str, email: &str) -> Result<(), AppError> {
        let body = serde_json::json!({
            "localId": uid,
            "email": email,
        });
        let _: serde_json::Value = self.post("update", &body, true).await?;
        tracing::info!(uid = %uid, "Identity email updated");
        Ok(())
    }

    /// Update an account's password.
    pub async fn update_password(&self, uid: &str, password: &str) -> Result<(), AppError> {
        let body = serde_json::json!({
            "localId": uid,
            "password": password,
        });
        let _: serde_json::Value = self.post("update", &body, true).await?;
        tracing::info!(uid = %uid, "Identity password updated");
        Ok(())
    }

    /// Delete an identity account.
    pub async fn delete_identity(&self, uid: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "localId": uid });
        let _: serde_json::Value = self.post("delete", &body, true).await?;
        tracing::info!(uid = %uid, "Identity account deleted");
        Ok(())
    }

    // ─── Lookup ──────────────────────────────────────────────────

    /// Look up an account by email. Returns None if no account exists.
    pub async fn get_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityRecord>, AppError> {
        let body = serde_json::json!({ "email": [email] });
        match self.post::<LookupResponse>("lookup", &body, true).await {
            Ok(response) => Ok(response.users.into_iter().next()),
            Err(AppError::NotFound(_)) | Err(AppError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up an account by UID. Returns None if no account exists.
    pub async fn get_identity(&self, uid: &str) -> Result<Option<IdentityRecord>, AppError> {
        let body = serde_json::json!({ "localId": [uid] });
        match self.post::<LookupResponse>("lookup", &body, true).await {
            Ok(response) => Ok(response.users.into_iter().next()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Verify a provider-issued ID token and return the account it belongs
    /// to. Used by clients that sign in through the provider SDK directly.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<IdentityRecord, AppError> {
        let body = serde_json::json!({ "idToken": id_token });
        let response: LookupResponse = self.post("lookup", &body, false).await?;
        response.users.into_iter().next().ok_or(AppError::Unauthorized)
    }

    // ─── Credential Verification ─────────────────────────────────

    /// Verify an email/password pair.
    ///
    /// Any mismatch surfaces as a generic unauthorized error.
    pub async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityRecord, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let signin: SignInResponse = self.post("signInWithPassword", &body, false).await?;
        Ok(IdentityRecord {
            uid: signin.local_id,
            email: signin.email,
            display_name: signin.display_name,
            email_verified: false,
        })
    }

    // ─── Session Tokens ──────────────────────────────────────────

    /// Issue a signed session token for an authenticated user.
    pub fn issue_token(&self, uid: &str) -> Result<String, AppError> {
        create_session_jwt(uid, &self.jwt_signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }
}

/// JWT claims for session tokens.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity provider UID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create a session JWT for a user.
pub fn create_session_jwt(uid: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        iat: now,
        exp: now + SESSION_TOKEN_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_jwt_round_trip() {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

        let key = b"test_jwt_key_32_bytes_minimum!!";
        let token = create_session_jwt("uid-123", key).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(key),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "uid-123");
        assert!(decoded.claims.exp > decoded.claims.iat);
    }

    #[test]
    fn test_auth_failures_are_generic() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        for code in [
            "EMAIL_NOT_FOUND",
            "INVALID_PASSWORD",
            "INVALID_LOGIN_CREDENTIALS",
            "USER_DISABLED",
        ] {
            let err = FirebaseAuthClient::map_provider_error(code, status, "raw detail");
            // Provider detail must never leak for credential failures
            assert!(matches!(err, AppError::Unauthorized), "code {}", code);
        }
    }

    #[test]
    fn test_duplicate_email_maps_to_conflict() {
        let err = FirebaseAuthClient::map_provider_error(
            "EMAIL_EXISTS",
            reqwest::StatusCode::BAD_REQUEST,
            "",
        );
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
