use crate::config::{ManagementRecipient, NotificationConfig, RouteRepresentative};
use crate::import::{ContactDirectory, PartnerContact};
use crate::metrics::{PartnerKey, PartnerMetrics, RollupTable};
use crate::reports::html::render_partner_html;
use crate::reports::sms::{management_partner_sms, partner_link_sms, route_rep_sms};
use crate::reports::{
    detailed_report, split_into_chunks, with_part_headers, ManagementSummary, SMS_CHUNK_LIMIT,
};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Partner,
    InternalRep,
    Management,
    Dashboard,
    DetailedReport,
}

impl MessageKind {
    pub const fn label(self) -> &'static str {
        match self {
            MessageKind::Partner => "partner",
            MessageKind::InternalRep => "internal_rep",
            MessageKind::Management => "management",
            MessageKind::Dashboard => "dashboard",
            MessageKind::DetailedReport => "detailed_report",
        }
    }
}

/// One SMS waiting to be dispatched. `to` is the number as configured, formatted at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub partner: Option<PartnerKey>,
    pub recipient: String,
    pub to: String,
    pub body: String,
}

/// A partner's full HTML report addressed to the email on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub partner: PartnerKey,
    pub to: String,
    pub subject: String,
    #[serde(skip)]
    pub html: String,
}

/// Decides who hears about each partner's report.
#[derive(Debug, Clone, Default)]
pub struct NotificationPlanner {
    management: Vec<ManagementRecipient>,
    internal_reps: Vec<RouteRepresentative>,
}

impl NotificationPlanner {
    pub fn new(management: Vec<ManagementRecipient>, internal_reps: Vec<RouteRepresentative>) -> Self {
        Self {
            management,
            internal_reps,
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(config.management.clone(), config.internal_reps.clone())
    }

    /// Partner link, matching route reps, then every management recipient.
    pub fn plan_partner(
        &self,
        metrics: &PartnerMetrics,
        contact: Option<&PartnerContact>,
        report_url: &str,
    ) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();

        match contact.and_then(|contact| contact.phone.as_deref()) {
            Some(phone) => messages.push(OutboundMessage {
                kind: MessageKind::Partner,
                partner: Some(metrics.key.clone()),
                recipient: metrics.key.to_string(),
                to: phone.to_string(),
                body: partner_link_sms(metrics, report_url),
            }),
            None => debug!(partner = %metrics.key, "no phone on file, partner message skipped"),
        }

        if let Some(route) = contact.and_then(|contact| contact.route.as_deref()) {
            let route = route.to_lowercase();
            for rep in self
                .internal_reps
                .iter()
                .filter(|rep| route.contains(&rep.route_keyword))
            {
                messages.push(OutboundMessage {
                    kind: MessageKind::InternalRep,
                    partner: Some(metrics.key.clone()),
                    recipient: rep.route_keyword.clone(),
                    to: rep.phone.clone(),
                    body: route_rep_sms(metrics, report_url),
                });
            }
        }

        let management_body = management_partner_sms(metrics, contact);
        for recipient in &self.management {
            messages.push(OutboundMessage {
                kind: MessageKind::Management,
                partner: Some(metrics.key.clone()),
                recipient: recipient.role.clone(),
                to: recipient.phone.clone(),
                body: management_body.clone(),
            });
        }

        messages
    }

    /// Plans messages for every partner active in the trailing week, in key order.
    pub fn plan_daily<F>(
        &self,
        table: &RollupTable,
        contacts: &ContactDirectory,
        report_url: F,
    ) -> Vec<OutboundMessage>
    where
        F: Fn(&PartnerKey) -> String,
    {
        table
            .active_in_trailing_window()
            .filter(|metrics| !metrics.key.is_unknown())
            .flat_map(|metrics| {
                self.plan_partner(metrics, contacts.get(&metrics.key), &report_url(&metrics.key))
            })
            .collect()
    }

    /// HTML reports for recently active partners with an email address on file, in key order.
    pub fn plan_partner_emails(
        &self,
        table: &RollupTable,
        contacts: &ContactDirectory,
        generated_at: DateTime<Tz>,
    ) -> Vec<OutboundEmail> {
        let date = generated_at.format("%b %-d, %Y").to_string();
        table
            .active_in_trailing_window()
            .filter(|metrics| !metrics.key.is_unknown())
            .filter_map(|metrics| {
                let to = contacts.get(&metrics.key)?.email.as_deref()?;
                Some(OutboundEmail {
                    partner: metrics.key.clone(),
                    to: to.to_string(),
                    subject: format!("Partner Report - {} - {date}", metrics.key),
                    html: render_partner_html(metrics, generated_at),
                })
            })
            .collect()
    }

    pub fn plan_dashboard(&self, summary: &ManagementSummary, dashboard_url: &str) -> Vec<OutboundMessage> {
        let body = summary.dashboard_sms(dashboard_url);
        self.management
            .iter()
            .map(|recipient| OutboundMessage {
                kind: MessageKind::Dashboard,
                partner: None,
                recipient: recipient.role.clone(),
                to: recipient.phone.clone(),
                body: body.clone(),
            })
            .collect()
    }

    /// Full text report split into `[Part i/n]` chunks for each management recipient.
    pub fn plan_detailed_report(&self, table: &RollupTable, report_date: NaiveDate) -> Vec<OutboundMessage> {
        let chunks = with_part_headers(split_into_chunks(
            &detailed_report(table, report_date),
            SMS_CHUNK_LIMIT,
        ));
        self.management
            .iter()
            .flat_map(|recipient| {
                chunks.iter().map(move |chunk| OutboundMessage {
                    kind: MessageKind::DetailedReport,
                    partner: None,
                    recipient: recipient.role.clone(),
                    to: recipient.phone.clone(),
                    body: chunk.clone(),
                })
            })
            .collect()
    }
}
