use super::gateway::{DeliveryError, DeliveryReceipt};
use crate::config::EmailConfig;
use async_trait::async_trait;
use reqwest::header::HeaderName;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

/// Outbound HTML email transport.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, DeliveryError>;

    fn name(&self) -> &'static str;
}

/// Trims the address and checks it has a local part and a dotted domain.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (local, domain) = trimmed.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !trimmed.chars().any(char::is_whitespace)
        && !domain.contains('@');
    valid.then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Logs emails instead of sending them and remembers what it was asked to send.
#[derive(Debug, Default)]
pub struct DryRunMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl DryRunMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailGateway for DryRunMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, DeliveryError> {
        info!(to, subject, bytes = html.len(), "dry run: email not sent");

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DeliveryError::Configuration("dry-run mailbox poisoned".to_string()))?;
        sent.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
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

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

/// SendGrid v3 mail send over a JSON POST with a bearer key.
#[derive(Debug, Clone)]
pub struct SendGridMailer {
    client: Client,
    config: EmailConfig,
    api_base: String,
}

impl SendGridMailer {
    pub fn new(config: EmailConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| DeliveryError::Configuration(format!("http client: {err}")))?;

        Ok(Self {
            client,
            config,
            api_base: SENDGRID_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_url(&self) -> String {
        format!("{}/v3/mail/send", self.api_base)
    }

    fn payload<'a>(&'a self, to: &'a str, subject: &'a str, html: &'a str) -> MailSend<'a> {
        MailSend {
            personalizations: [Personalization {
                to: [Address {
                    email: to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.config.from_email,
                name: Some(&self.config.from_name),
            },
            subject,
            content: [Content {
                kind: "text/html",
                value: html,
            }],
        }
    }
}

#[async_trait]
impl EmailGateway for SendGridMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(to, subject, html))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|body| !body.trim().is_empty())
                .unwrap_or_else(|| status.to_string());
            warn!(to, status = status.as_u16(), %message, "sendgrid rejected email");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let message_id = response
            .headers()
            .get(HeaderName::from_static("x-message-id"))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        info!(to, id = message_id.as_deref().unwrap_or("-"), "email sent");
        Ok(DeliveryReceipt {
            to: to.to_string(),
            sid: message_id,
        })
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            api_key: "SG.key".to_string(),
            from_email: "reports@example.com".to_string(),
            from_name: "Partner Reports".to_string(),
        }
    }

    #[test]
    fn normalizes_and_rejects_addresses() {
        assert_eq!(normalize_email(" dana@example.com ").as_deref(), Some("dana@example.com"));
        assert_eq!(normalize_email("dana@example"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("dana smith@example.com"), None);
        assert_eq!(normalize_email("n/a"), None);
    }

    #[test]
    fn payload_matches_mail_send_shape() {
        let mailer = SendGridMailer::new(config()).expect("client builds");
        let payload = serde_json::to_value(mailer.payload("dana@example.com", "Report", "<p>hi</p>"))
            .expect("payload serializes");

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "dana@example.com");
        assert!(payload["personalizations"][0]["to"][0].get("name").is_none());
        assert_eq!(payload["from"]["name"], "Partner Reports");
        assert_eq!(payload["content"][0]["type"], "text/html");
        assert_eq!(payload["subject"], "Report");
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_http_error() {
        let mailer = SendGridMailer::new(config())
            .expect("client builds")
            .with_api_base("http://127.0.0.1:9/");
        assert_eq!(mailer.send_url(), "http://127.0.0.1:9/v3/mail/send");
        let err = mailer
            .send("dana@example.com", "Report", "<p>hi</p>")
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, DeliveryError::Http(_)));
    }

    #[tokio::test]
    async fn dry_run_records_emails() {
        let mailer = DryRunMailer::new();
        mailer
            .send("dana@example.com", "Report", "<p>hi</p>")
            .await
            .expect("dry run send succeeds");
        assert_eq!(mailer.sent()[0].subject, "Report");
    }
}
