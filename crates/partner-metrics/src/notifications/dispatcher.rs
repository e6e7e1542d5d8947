use super::email::{normalize_email, EmailGateway};
use super::gateway::{DeliveryError, SmsGateway};
use super::phone::format_phone_number;
use super::planner::{OutboundEmail, OutboundMessage};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent { to: String, sid: Option<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub message: OutboundMessage,
    pub status: DeliveryStatus,
}

/// What happened to each message of one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub gateway: &'static str,
    pub sent: usize,
    pub failed: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

/// Partner emails go out in batches of this size with the dispatch delay between batches.
pub const EMAIL_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailOutcome {
    pub email: OutboundEmail,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailReport {
    pub gateway: &'static str,
    pub sent: usize,
    pub failed: usize,
    pub outcomes: Vec<EmailOutcome>,
}

/// Sends planned messages one at a time, pausing between sends to stay under provider rate limits.
#[derive(Clone)]
pub struct NotificationDispatcher {
    gateway: Arc<dyn SmsGateway>,
    delay: Duration,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn SmsGateway>, delay: Duration) -> Self {
        Self { gateway, delay }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    async fn send_one(&self, message: &OutboundMessage) -> Result<(String, Option<String>), DeliveryError> {
        let to = format_phone_number(&message.to)
            .ok_or_else(|| DeliveryError::InvalidPhone(message.to.clone()))?;
        let receipt = self.gateway.send(&to, &message.body).await?;
        Ok((receipt.to, receipt.sid))
    }

    /// Never stops early: a failed send is recorded and the next message still goes out.
    pub async fn deliver(&self, messages: Vec<OutboundMessage>) -> DeliveryReport {
        let mut report = DeliveryReport {
            gateway: self.gateway.name(),
            ..DeliveryReport::default()
        };
        let total = messages.len();

        for (index, message) in messages.into_iter().enumerate() {
            let status = match self.send_one(&message).await {
                Ok((to, sid)) => {
                    report.sent += 1;
                    info!(kind = message.kind.label(), recipient = %message.recipient, "notification sent");
                    DeliveryStatus::Sent { to, sid }
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(kind = message.kind.label(), recipient = %message.recipient, error = %err, "notification failed");
                    DeliveryStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            report.outcomes.push(DeliveryOutcome { message, status });

            if index + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            gateway = report.gateway,
            sent = report.sent,
            failed = report.failed,
            "notification run finished"
        );
        report
    }
}

/// Sends partner report emails; like SMS delivery, one failure never stops the run.
#[derive(Clone)]
pub struct EmailDispatcher {
    mailer: Arc<dyn EmailGateway>,
    delay: Duration,
}

impl EmailDispatcher {
    pub fn new(mailer: Arc<dyn EmailGateway>, delay: Duration) -> Self {
        Self { mailer, delay }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.mailer.name()
    }

    async fn send_one(&self, email: &OutboundEmail) -> Result<(String, Option<String>), DeliveryError> {
        let to = normalize_email(&email.to).ok_or_else(|| DeliveryError::InvalidEmail(email.to.clone()))?;
        let receipt = self.mailer.send(&to, &email.subject, &email.html).await?;
        Ok((receipt.to, receipt.sid))
    }

    pub async fn deliver(&self, emails: Vec<OutboundEmail>) -> EmailReport {
        let mut report = EmailReport {
            gateway: self.mailer.name(),
            ..EmailReport::default()
        };
        let total = emails.len();

        for (index, email) in emails.into_iter().enumerate() {
            let status = match self.send_one(&email).await {
                Ok((to, sid)) => {
                    report.sent += 1;
                    info!(partner = %email.partner, "report email sent");
                    DeliveryStatus::Sent { to, sid }
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(partner = %email.partner, error = %err, "report email failed");
                    DeliveryStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            report.outcomes.push(EmailOutcome { email, status });

            let batch_done = (index + 1) % EMAIL_BATCH_SIZE == 0;
            if batch_done && index + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            gateway = report.gateway,
            sent = report.sent,
            failed = report.failed,
            "email run finished"
        );
        report
    }
}
