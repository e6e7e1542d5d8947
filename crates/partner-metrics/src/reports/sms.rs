use super::{format_currency, format_rate};
use crate::import::PartnerContact;
use crate::metrics::{PartnerMetrics, Window, WindowCounters};
use std::fmt::Write;

fn today_line(counters: &WindowCounters) -> String {
    format!(
        "Today: {} assigned, {} sat\nSIT Rate: {}%\nCLOSE Rate: {}%",
        counters.appointments,
        counters.sat,
        format_rate(counters.sit_rate()),
        format_rate(counters.close_rate()),
    )
}

/// Four-window performance text for one partner.
pub fn partner_sms(metrics: &PartnerMetrics) -> String {
    let mut text = format!("{} Report\n{}\n", metrics.key, "=".repeat(20));
    for window in Window::ordered() {
        let counters = metrics.window(window);
        let _ = writeln!(
            text,
            "{}: {} appts, {} sat, {} closed (SIT {}% / CLOSE {}%)",
            window.label(),
            counters.appointments,
            counters.sat,
            counters.closed,
            format_rate(counters.sit_rate()),
            format_rate(counters.close_rate()),
        );
    }
    let _ = write!(
        text,
        "Revenue (YTD): {}",
        format_currency(metrics.year_to_date.revenue_cents)
    );
    text
}

/// Greeting sent to the partner with a link to their private report.
pub fn partner_link_sms(metrics: &PartnerMetrics, report_url: &str) -> String {
    format!(
        "Hi {}! Your daily performance report is ready.\n\nView your report: {}\n\n{}\n\nThis link is secure and shows only your data.",
        metrics.key.first_name(),
        report_url,
        today_line(&metrics.today),
    )
}

/// Heads-up for the internal rep who owns the partner's route.
pub fn route_rep_sms(metrics: &PartnerMetrics, report_url: &str) -> String {
    format!(
        "Partner Update - Your Route\n\nPartner: {}\n{}\n\nPartner's report: {}",
        metrics.key,
        today_line(&metrics.today),
        report_url,
    )
}

/// Oversight copy sent to management for every partner report.
pub fn management_partner_sms(metrics: &PartnerMetrics, contact: Option<&PartnerContact>) -> String {
    let phone = contact
        .and_then(|contact| contact.phone.as_deref())
        .unwrap_or("None");
    let route = contact
        .and_then(|contact| contact.route.as_deref())
        .unwrap_or("None");
    let today = &metrics.today;

    format!(
        "Partner Report Sent\n\nPartner: {}\nPhone: {}\nRoute: {}\nToday: {} assigned, {} sat\nSIT: {}%\nCLOSE: {}%",
        metrics.key,
        phone,
        route,
        today.appointments,
        today.sat,
        format_rate(today.sit_rate()),
        format_rate(today.close_rate()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::identity::key_for;

    fn metrics() -> PartnerMetrics {
        let mut metrics = PartnerMetrics::new(key_for("Bob Smith"));
        metrics.today = WindowCounters {
            appointments: 10,
            sat: 7,
            closed: 2,
            revenue_cents: 0,
        };
        metrics.year_to_date = WindowCounters {
            appointments: 40,
            sat: 20,
            closed: 5,
            revenue_cents: 4_500_000,
        };
        metrics
    }

    #[test]
    fn partner_sms_lists_every_window() {
        let text = partner_sms(&metrics());
        assert!(text.starts_with("Bob Smith Report\n"));
        assert!(text.contains("Today: 10 appts, 7 sat, 2 closed (SIT 70.0% / CLOSE 28.6%)"));
        assert!(text.contains("Week: 0 appts, 0 sat, 0 closed (SIT 0.0% / CLOSE 0.0%)"));
        assert!(text.contains("YTD: 40 appts, 20 sat, 5 closed (SIT 50.0% / CLOSE 25.0%)"));
        assert!(text.ends_with("Revenue (YTD): $45,000"));
    }

    #[test]
    fn link_sms_greets_by_first_name() {
        let text = partner_link_sms(&metrics(), "https://reports.example/partner/abc");
        assert!(text.starts_with("Hi Bob! "));
        assert!(text.contains("View your report: https://reports.example/partner/abc"));
        assert!(text.contains("Today: 10 assigned, 7 sat\nSIT Rate: 70.0%\nCLOSE Rate: 28.6%"));
    }

    #[test]
    fn management_copy_falls_back_when_contact_missing() {
        let text = management_partner_sms(&metrics(), None);
        assert!(text.contains("Phone: None\nRoute: None"));

        let contact = PartnerContact {
            phone: Some("9725550100".into()),
            email: None,
            route: Some("Robert".into()),
        };
        let text = management_partner_sms(&metrics(), Some(&contact));
        assert!(text.contains("Phone: 9725550100\nRoute: Robert"));
    }

    #[test]
    fn route_rep_sms_names_partner() {
        let text = route_rep_sms(&metrics(), "https://x/partner/abc");
        assert!(text.contains("Partner: Bob Smith"));
        assert!(text.ends_with("Partner's report: https://x/partner/abc"));
    }
}
