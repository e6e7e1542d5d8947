use super::gateway::{DeliveryError, DeliveryReceipt, SmsGateway};
use crate::config::TwilioConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio Messages API over a form-encoded POST with basic auth.
#[derive(Debug, Clone)]
pub struct TwilioGateway {
    client: Client,
    config: TwilioConfig,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

impl TwilioGateway {
    pub fn new(config: TwilioConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| DeliveryError::Configuration(format!("http client: {err}")))?;

        Ok(Self {
            client,
            config,
            api_base: TWILIO_API_BASE.to_string(),
        })
    }

    /// Points the gateway at another Twilio-compatible endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.config.account_sid
        )
    }

    fn form<'a>(&'a self, to: &'a str, body: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("To", to), ("From", self.config.from_phone.as_str()), ("Body", body)];
        if let Some(sid) = &self.config.messaging_service_sid {
            form.push(("MessagingServiceSid", sid.as_str()));
        }
        form
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.form(to, body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|error| error.message)
                .unwrap_or_else(|| status.to_string());
            warn!(to, status = status.as_u16(), %message, "twilio rejected sms");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let sid = response.json::<MessageResponse>().await?.sid;
        info!(to, sid = sid.as_deref().unwrap_or("-"), "sms sent");
        Ok(DeliveryReceipt {
            to: to.to_string(),
            sid,
        })
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}
