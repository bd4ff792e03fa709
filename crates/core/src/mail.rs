//! Mail endpoint client.
//!
//! Outgoing mail is handed to an HTTP endpoint that accepts
//! `{from, to, subject, text, html}` as JSON and takes care of delivery.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur when sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint rejected the message.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Mail endpoint settings.
#[derive(Clone)]
pub struct MailConfig {
    /// Full URL of the send endpoint.
    pub endpoint: String,
    /// Optional bearer token.
    pub api_key: Option<SecretString>,
    /// Default sender address.
    pub from: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

/// Client for the mail endpoint.
#[derive(Clone)]
pub struct MailClient {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl MailClient {
    /// Create a new mail client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        if let Some(key) = &config.api_key {
            let auth_value = format!("Bearer {}", key.expose_secret());
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| MailError::Config(format!("Invalid API key format: {e}")))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            from: config.from.clone(),
        })
    }

    /// Default sender address.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Build a message from the default sender.
    #[must_use]
    pub fn compose(
        &self,
        to: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
        html: impl Into<String>,
    ) -> OutgoingMail {
        OutgoingMail {
            from: self.from.clone(),
            to: to.into(),
            subject: subject.into(),
            text: text.into(),
            html: html.into(),
        }
    }

    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the endpoint answers non-2xx.
    #[instrument(skip(self, mail), fields(to = %mail.to, subject = %mail.subject))]
    pub async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let response = self.client.post(&self.endpoint).json(mail).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!("Mail sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_uses_default_sender() {
        let client = MailClient::new(&MailConfig {
            endpoint: "http://localhost/send".to_string(),
            api_key: None,
            from: "studio@example.com".to_string(),
        })
        .unwrap();
        let mail = client.compose("a@b.co", "Hi", "text", "<p>html</p>");
        assert_eq!(mail.from, "studio@example.com");
        let json = serde_json::to_value(&mail).unwrap();
        assert_eq!(json["to"], "a@b.co");
        assert_eq!(json["html"], "<p>html</p>");
    }

    #[test]
    fn test_rejects_bad_key() {
        let result = MailClient::new(&MailConfig {
            endpoint: "http://localhost/send".to_string(),
            api_key: Some(SecretString::from("bad\nkey")),
            from: "studio@example.com".to_string(),
        });
        assert!(matches!(result, Err(MailError::Config(_))));
    }
}
