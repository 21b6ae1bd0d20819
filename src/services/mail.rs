// SPDX-License-Identifier: MIT

//! Outbound email via Mailgun.

use crate::error::AppError;
use std::time::Duration;

/// Outbound request timeout (seconds).
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Mailgun API client.
#[derive(Clone)]
pub struct MailgunClient {
    /// None in offline/mock mode.
    http: Option<reqwest::Client>,
    /// Mock mode: when false, every send reports failure.
    mock_delivers: bool,
    base_url: String,
    domain: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl MailgunClient {
    /// Create a new Mailgun client.
    pub fn new(
        domain: String,
        api_key: String,
        from_email: String,
        from_name: String,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http: Some(http),
            mock_delivers: true,
            base_url: "https://api.mailgun.net/v3".to_string(),
            domain,
            api_key,
            from_email,
            from_name,
        })
    }

    /// Create a mock client for testing: sends succeed without network.
    pub fn new_mock() -> Self {
        Self {
            http: None,
            mock_delivers: true,
            base_url: "https://api.mailgun.net/v3".to_string(),
            domain: "mg.test.example".to_string(),
            api_key: String::new(),
            from_email: "noreply@test.example".to_string(),
            from_name: "Test App".to_string(),
        }
    }

    /// Create a mock client whose sends always fail (delivery-failure paths).
    pub fn new_mock_failing() -> Self {
        Self {
            mock_delivers: false,
            ..Self::new_mock()
        }
    }

    /// Send an email.
    pub async fn send(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(http) = &self.http else {
            if self.mock_delivers {
                tracing::debug!(to = %to_email, "Mock mail send");
                return Ok(());
            }
            return Err(AppError::Mail("Mock delivery failure".to_string()));
        };

        let url = format!("{}/{}/messages", self.base_url, self.domain);

        let mut form = vec![
            (
                "from",
                format!("{} <{}>", self.from_name, self.from_email),
            ),
            ("to", to_email.to_string()),
            ("subject", subject.to_string()),
            ("html", html_body.to_string()),
        ];
        if let Some(text) = text_body {
            form.push(("text", text.to_string()));
        }

        let response = http
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Mail(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!(
                "Send failed with {}: {}",
                status, text
            )));
        }

        tracing::info!(to = %to_email, "Email sent");
        Ok(())
    }

    /// Send the password reset email with the tokenized link.
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_link: &str,
        user_name: Option<&str>,
    ) -> Result<(), AppError> {
        let greeting = match user_name {
            Some(name) if !name.is_empty() => format!("Hi {},", name),
            _ => "Hi,".to_string(),
        };

        let html = format!(
            "<p>{greeting}</p>\
             <p>We received a request to reset your password. Click the link \
             below to choose a new one. The link expires in 1 hour.</p>\
             <p><a href=\"{reset_link}\">Reset your password</a></p>\
             <p>If you did not request this, you can safely ignore this email.</p>",
        );
        let text = format!(
            "{greeting}\n\nWe received a request to reset your password. \
             Open the link below to choose a new one (expires in 1 hour):\n\n\
             {reset_link}\n\nIf you did not request this, ignore this email.",
        );

        self.send(to_email, "Reset your password", &html, Some(&text))
            .await
    }
}
