use crate::infra::parse_timestamp;
use chrono::{DateTime, Utc};
use clap::Args;
use partner_metrics::access::TokenRegistry;
use partner_metrics::config::AppConfig;
use partner_metrics::error::AppError;
use partner_metrics::import::{AppointmentImporter, ContactDirectory};
use partner_metrics::metrics::{AggregationOutcome, Aggregator, PartnerMetricsView};
use partner_metrics::notifications::{
    gateway_for, mailer_for, DeliveryStatus, EmailDispatcher, NotificationDispatcher,
    NotificationPlanner,
};
use partner_metrics::reports::sms::partner_sms;
use partner_metrics::reports::ManagementSummary;
use partner_metrics::telemetry;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug, Default)]
pub(crate) struct RollupArgs {
    /// Closer-app CSV export (defaults to APPOINTMENTS_CSV)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Reference time as RFC 3339 (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Print JSON instead of the SMS-style text report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct NotifyArgs {
    /// Closer-app CSV export (defaults to APPOINTMENTS_CSV)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Partner phone/email/route directory (defaults to CONTACTS_CSV)
    #[arg(long)]
    pub(crate) contacts: Option<PathBuf>,
    /// Reference time as RFC 3339 (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Log messages instead of sending them
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Also send management the full multi-part text report
    #[arg(long)]
    pub(crate) detailed: bool,
}

#[derive(Debug, Serialize)]
struct RollupOutput<'a> {
    now: DateTime<Utc>,
    summary: &'a ManagementSummary,
    partners: Vec<PartnerMetricsView>,
    skipped: usize,
}

fn appointments_path(arg: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf, AppError> {
    arg.or_else(|| config.reporting.appointments_csv.clone())
        .ok_or_else(|| {
            AppError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no appointments CSV given; pass --csv or set APPOINTMENTS_CSV",
            ))
        })
}

fn load_outcome(
    config: &AppConfig,
    csv: PathBuf,
    now: DateTime<Utc>,
) -> Result<AggregationOutcome, AppError> {
    let records = AppointmentImporter::new(config.reporting.timezone).from_path(&csv)?;
    let outcome = Aggregator::new(config.reporting.timezone)
        .with_revenue_per_kw(config.reporting.revenue_per_kw)
        .aggregate(&records, now);
    info!(
        path = %csv.display(),
        records = records.len(),
        partners = outcome.table.len(),
        skipped = outcome.skipped.len(),
        "appointments aggregated"
    );
    Ok(outcome)
}

pub(crate) fn run_rollup(args: RollupArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let csv = appointments_path(args.csv, &config)?;
    let now = args.now.unwrap_or_else(Utc::now);
    let outcome = load_outcome(&config, csv, now)?;
    let summary = ManagementSummary::from_table(&outcome.table);

    if args.json {
        let output = RollupOutput {
            now,
            summary: &summary,
            partners: outcome.table.views(),
            skipped: outcome.skipped.len(),
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(io::Error::from)?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Partner rollup as of {}",
        now.with_timezone(&config.reporting.timezone)
            .format("%Y-%m-%d %H:%M %Z")
    );
    for metrics in &outcome.table {
        println!("\n{}", partner_sms(metrics));
    }
    println!("\n{}", summary.digest_sms());
    for skipped in &outcome.skipped {
        println!(
            "skipped row {} ({}): {}",
            skipped.index + 2,
            skipped.partner,
            skipped.reason
        );
    }
    Ok(())
}

pub(crate) async fn run_notify(args: NotifyArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let csv = appointments_path(args.csv, &config)?;
    let now = args.now.unwrap_or_else(Utc::now);
    let outcome = load_outcome(&config, csv, now)?;
    let report_date = now.with_timezone(&config.reporting.timezone).date_naive();

    let contacts = match args.contacts.or_else(|| config.reporting.contacts_csv.clone()) {
        Some(path) => ContactDirectory::from_path(path)?,
        None => {
            warn!("no contacts directory configured; partner messages will be skipped");
            ContactDirectory::new()
        }
    };

    let base_url = &config.reporting.public_base_url;
    let tokens = TokenRegistry::with_secret(config.reporting.token_secret.clone());
    if !tokens.is_keyed() {
        warn!("REPORT_TOKEN_SECRET is not set; partner links only resolve within this process");
    }

    let planner = NotificationPlanner::from_config(&config.notifications);
    let mut messages = planner.plan_daily(&outcome.table, &contacts, |key| {
        format!("{}/partner/{}", base_url, tokens.token_for(key))
    });
    if let Some(key) = &config.reporting.management_key {
        let summary = ManagementSummary::from_table(&outcome.table);
        messages.extend(planner.plan_dashboard(&summary, &format!("{base_url}/management/{key}")));
    }
    if args.detailed {
        messages.extend(planner.plan_detailed_report(&outcome.table, report_date));
    }

    let emails = planner.plan_partner_emails(
        &outcome.table,
        &contacts,
        now.with_timezone(&config.reporting.timezone),
    );

    let gateway = gateway_for(&config.notifications, config.twilio.as_ref(), args.dry_run)?;
    let dispatcher = NotificationDispatcher::new(gateway, config.notifications.delay);
    info!(
        messages = messages.len(),
        gateway = dispatcher.gateway_name(),
        "dispatching notifications"
    );
    let report = dispatcher.deliver(messages).await;

    println!(
        "{} sent, {} failed via {}",
        report.sent, report.failed, report.gateway
    );
    for outcome in &report.outcomes {
        if let DeliveryStatus::Failed { error } = &outcome.status {
            println!(
                "- {} to {}: {}",
                outcome.message.kind.label(),
                outcome.message.recipient,
                error
            );
        }
    }

    if !emails.is_empty() {
        let mailer = mailer_for(&config.notifications, config.email.as_ref(), args.dry_run)?;
        let emails = EmailDispatcher::new(mailer, config.notifications.delay)
            .deliver(emails)
            .await;
        println!(
            "{} emails sent, {} failed via {}",
            emails.sent, emails.failed, emails.gateway
        );
        for outcome in &emails.outcomes {
            if let DeliveryStatus::Failed { error } = &outcome.status {
                println!("- email to {}: {}", outcome.email.partner, error);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_csv_is_reported() {
        let config = AppConfig::load().expect("defaults load");
        if config.reporting.appointments_csv.is_some() {
            return;
        }
        let err = appointments_path(None, &config).expect_err("no path available");
        assert!(err.to_string().contains("--csv"));

        let path = appointments_path(Some(PathBuf::from("a.csv")), &config).expect("arg wins");
        assert_eq!(path, PathBuf::from("a.csv"));
    }
}
