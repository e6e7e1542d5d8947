use super::{format_currency, format_rate};
use crate::metrics::{PartnerMetrics, RollupTable, Window, WindowCounters};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt::Write;

const TOP_PERFORMERS: usize = 10;

/// Company-wide totals for the management dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagementSummary {
    pub total_partners: usize,
    pub active_today: usize,
    pub today: TodayTotals,
    pub overall_sit_rate: f64,
    pub overall_close_rate: f64,
    pub ytd_revenue: f64,
    #[serde(skip)]
    pub ytd_revenue_cents: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodayTotals {
    pub appointments: u32,
    pub sat: u32,
    pub closed: u32,
}

impl ManagementSummary {
    pub fn from_table(table: &RollupTable) -> Self {
        let today = table.totals(Window::Today);
        let ytd = table.totals(Window::YearToDate);

        Self {
            total_partners: table.len(),
            active_today: table
                .iter()
                .filter(|metrics| metrics.today.appointments > 0)
                .count(),
            today: TodayTotals {
                appointments: today.appointments,
                sat: today.sat,
                closed: today.closed,
            },
            overall_sit_rate: today.sit_rate(),
            overall_close_rate: today.close_rate(),
            ytd_revenue: ytd.revenue(),
            ytd_revenue_cents: ytd.revenue_cents,
        }
    }

    /// Dashboard link message for each management recipient.
    pub fn dashboard_sms(&self, dashboard_url: &str) -> String {
        format!(
            "Management Dashboard Ready!\n\nView Full Dashboard: {}\n\nToday's Summary:\n{} total partners\n{} active today\n{} appts assigned\n{} appts sat\n{} deals closed\nOverall SIT: {}%\nOverall CLOSE: {}%",
            dashboard_url,
            self.total_partners,
            self.active_today,
            self.today.appointments,
            self.today.sat,
            self.today.closed,
            format_rate(self.overall_sit_rate),
            format_rate(self.overall_close_rate),
        )
    }

    /// Four-line digest used when the full report is too long to be useful.
    pub fn digest_sms(&self) -> String {
        format!(
            "Daily Summary: {} partners\nActive Today: {}\nTotal Appts: {}\nYTD Revenue: {}",
            self.total_partners,
            self.active_today,
            self.today.appointments,
            format_currency(self.ytd_revenue_cents),
        )
    }
}

fn summary_line(text: &mut String, window: Window, counters: &WindowCounters) {
    let _ = writeln!(
        text,
        "{}: {} appts / {}",
        window.label(),
        counters.appointments,
        format_currency(counters.revenue_cents)
    );
}

/// Multi-section management report: per-window totals, today's active partners, top ten by YTD revenue.
pub fn detailed_report(table: &RollupTable, report_date: NaiveDate) -> String {
    let mut text = format!(
        "PARTNER REPORT {}\n{}\n\n",
        report_date.format("%b %-d, %Y"),
        "=".repeat(30)
    );

    let _ = writeln!(text, "SUMMARY ({} Partners)", table.len());
    for window in Window::ordered() {
        summary_line(&mut text, window, &table.totals(window));
    }
    text.push('\n');

    let active_today: Vec<&PartnerMetrics> = table
        .iter()
        .filter(|metrics| metrics.today.appointments > 0)
        .collect();
    if !active_today.is_empty() {
        let _ = writeln!(text, "TODAY'S APPOINTMENTS\n{}", "-".repeat(30));
        for metrics in active_today {
            let _ = writeln!(
                text,
                "{}: {} appts, {} sat, {} closed",
                metrics.key, metrics.today.appointments, metrics.today.sat, metrics.today.closed
            );
        }
        text.push('\n');
    }

    // Stable sort over key order, so ties stay alphabetical.
    let mut ranked: Vec<&PartnerMetrics> = table.iter().collect();
    ranked.sort_by_key(|metrics| Reverse(metrics.year_to_date.revenue_cents));

    let _ = writeln!(text, "TOP PERFORMERS (YTD)\n{}", "-".repeat(30));
    for (rank, metrics) in ranked.into_iter().take(TOP_PERFORMERS).enumerate() {
        let _ = writeln!(
            text,
            "{}. {}\n   Appts: {} | Rev: {}",
            rank + 1,
            metrics.key,
            metrics.year_to_date.appointments,
            format_currency(metrics.year_to_date.revenue_cents)
        );
    }

    text.trim_end().to_string()
}

/// Packs whole lines into chunks of at most `max_len` bytes.
///
/// A single line longer than `max_len` becomes its own oversized chunk rather than being cut.
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        if !current.is_empty() && current.len() + line.len() + 1 > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Prefixes `[Part i/n]` headers when there is more than one chunk.
pub fn with_part_headers(chunks: Vec<String>) -> Vec<String> {
    let total = chunks.len();
    if total < 2 {
        return chunks;
    }
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| format!("[Part {}/{}]\n{}", index + 1, total, chunk))
        .collect()
}
