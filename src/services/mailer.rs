//! Outbound transactional email.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

const BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";
/// Upper bound on one delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email request failed: {0}")]
    RequestFailed(String),
    #[error("email request timed out")]
    TimedOut,
    #[error("email provider returned {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub name: String,
    /// Base64 of the file bytes.
    pub content: String,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            content: STANDARD.encode(bytes),
        }
    }
}

/// Message in the shape Brevo's `smtp/email` endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub sender: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub html_content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachment: Vec<Attachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError>;
}

/// Sends through the Brevo transactional email API.
#[derive(Clone)]
pub struct BrevoMailer {
    client: Client,
    api_key: String,
    api_url: String,
}

impl BrevoMailer {
    pub fn new(api_key: String) -> Result<Self, DeliveryError> {
        Self::with_url(api_key, BREVO_API_URL.to_string(), DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_url(
        api_key: String,
        api_url: String,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_url,
        })
    }
}

fn request_error(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::TimedOut
    } else {
        DeliveryError::RequestFailed(err.to_string())
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(email)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Logs emails instead of sending them. Used when no API key is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        let recipients: Vec<&str> = email.to.iter().map(|m| m.email.as_str()).collect();
        let attachments: Vec<&str> = email.attachment.iter().map(|a| a.name.as_str()).collect();
        info!(
            to = ?recipients,
            subject = %email.subject,
            attachments = ?attachments,
            "Email delivery disabled, not sending"
        );
        Ok(())
    }
}
