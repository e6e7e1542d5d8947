use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub to: String,
    pub sid: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("'{0}' is not a dialable phone number")]
    InvalidPhone(String),
    #[error("'{0}' is not a deliverable email address")]
    InvalidEmail(String),
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("gateway misconfigured: {0}")]
    Configuration(String),
}

/// Outbound SMS transport.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Sends `body` to an already E.164-formatted number.
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

/// Logs messages instead of sending them and remembers what it was asked to send.
#[derive(Debug, Default)]
pub struct DryRunGateway {
    sent: Mutex<Vec<SentMessage>>,
}

impl DryRunGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SmsGateway for DryRunGateway {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let preview: String = body.chars().take(50).collect();
        info!(to, preview = %preview, "dry run: sms not sent");

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DeliveryError::Configuration("dry-run outbox poisoned".to_string()))?;
        sent.push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
        });

        Ok(DeliveryReceipt {
            to: to.to_string(),
            sid: None,
        })
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
