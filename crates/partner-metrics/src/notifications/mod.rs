//! SMS and email delivery for partner reports and the management digest.

mod dispatcher;
mod email;
mod gateway;
mod phone;
mod planner;
mod twilio;

pub use dispatcher::{
    DeliveryOutcome, DeliveryReport, DeliveryStatus, EmailDispatcher, EmailOutcome, EmailReport,
    NotificationDispatcher, EMAIL_BATCH_SIZE,
};
pub use email::{normalize_email, DryRunMailer, EmailGateway, SendGridMailer, SentEmail};
pub use gateway::{DeliveryError, DeliveryReceipt, DryRunGateway, SentMessage, SmsGateway};
pub use phone::format_phone_number;
pub use planner::{MessageKind, NotificationPlanner, OutboundEmail, OutboundMessage};
pub use twilio::TwilioGateway;

use crate::config::{EmailConfig, NotificationConfig, TwilioConfig};
use std::sync::Arc;
use tracing::warn;

/// Picks the real gateway only when not in dry-run mode and credentials exist.
pub fn gateway_for(
    notifications: &NotificationConfig,
    twilio: Option<&TwilioConfig>,
    force_dry_run: bool,
) -> Result<Arc<dyn SmsGateway>, DeliveryError> {
    if force_dry_run || notifications.dry_run {
        return Ok(Arc::new(DryRunGateway::new()));
    }

    match twilio {
        Some(config) => Ok(Arc::new(TwilioGateway::new(config.clone())?)),
        None => {
            warn!("SMS_DRY_RUN is off but Twilio credentials are missing; using dry run");
            Ok(Arc::new(DryRunGateway::new()))
        }
    }
}

/// Email counterpart of [`gateway_for`]: SendGrid only when live and configured.
pub fn mailer_for(
    notifications: &NotificationConfig,
    email: Option<&EmailConfig>,
    force_dry_run: bool,
) -> Result<Arc<dyn EmailGateway>, DeliveryError> {
    if force_dry_run || notifications.dry_run {
        return Ok(Arc::new(DryRunMailer::new()));
    }

    match email {
        Some(config) => Ok(Arc::new(SendGridMailer::new(config.clone())?)),
        None => {
            warn!("SMS_DRY_RUN is off but SendGrid settings are missing; emails use dry run");
            Ok(Arc::new(DryRunMailer::new()))
        }
    }
}
