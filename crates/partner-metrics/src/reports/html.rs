use super::{format_currency, format_rate, ManagementSummary};
use crate::metrics::{PartnerMetrics, RollupTable, Window, WindowCounters};
use chrono::DateTime;
use chrono_tz::Tz;
use std::cmp::Reverse;
use std::fmt::{self, Write};

const STYLE: &str = "body{font-family:-apple-system,Segoe UI,Roboto,sans-serif;background:#f4f6fb;color:#1f2937;margin:0;padding:24px}\
.container{max-width:960px;margin:0 auto;background:#fff;border-radius:12px;padding:24px}\
.header{border-bottom:2px solid #e5e7eb;margin-bottom:16px}\
.timestamp{color:#6b7280;font-size:0.9em}\
table{width:100%;border-collapse:collapse}th,td{padding:8px;border-bottom:1px solid #e5e7eb;text-align:left}\
.good{color:#15803d;font-weight:600}.warning{color:#b45309;font-weight:600}.bad{color:#b91c1c;font-weight:600}";

#[derive(Debug, Clone, Copy)]
enum RateKind {
    Sit,
    Close,
}

impl RateKind {
    const fn thresholds(self) -> (f64, f64) {
        match self {
            RateKind::Sit => (70.0, 50.0),
            RateKind::Close => (30.0, 20.0),
        }
    }
}

/// Rate cell text and CSS class; `-` when the denominator is zero.
fn rate_cell(kind: RateKind, counters: &WindowCounters) -> (String, &'static str) {
    let (defined, rate) = match kind {
        RateKind::Sit => (counters.appointments > 0, counters.sit_rate()),
        RateKind::Close => (counters.sat > 0, counters.close_rate()),
    };
    if !defined {
        return ("-".to_string(), "");
    }

    let (good, warning) = kind.thresholds();
    let class = if rate >= good {
        "good"
    } else if rate >= warning {
        "warning"
    } else {
        "bad"
    };
    (format!("{}%", format_rate(rate)), class)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_head(html: &mut String, title: &str) -> fmt::Result {
    writeln!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<meta name=\"robots\" content=\"noindex, nofollow\">\n<title>{}</title>\n<style>{}</style>\n</head>",
        escape_html(title),
        STYLE
    )
}

fn write_rate_td(html: &mut String, kind: RateKind, counters: &WindowCounters) -> fmt::Result {
    let (text, class) = rate_cell(kind, counters);
    if class.is_empty() {
        write!(html, "<td>{text}</td>")
    } else {
        write!(html, "<td class=\"{class}\">{text}</td>")
    }
}

fn write_partner_page(
    html: &mut String,
    metrics: &PartnerMetrics,
    generated_at: DateTime<Tz>,
) -> fmt::Result {
    let name = escape_html(metrics.key.as_str());
    write_head(html, &format!("Performance Report - {}", metrics.key))?;
    writeln!(html, "<body>\n<div class=\"container\">\n<div class=\"header\">")?;
    writeln!(html, "<h1>Performance Report</h1>")?;
    writeln!(html, "<div class=\"partner-name\">{name}</div>")?;
    writeln!(
        html,
        "<div class=\"timestamp\">Generated: {}</div>\n</div>",
        generated_at.format("%B %-d, %Y at %-I:%M %p %Z")
    )?;

    writeln!(html, "<table class=\"summary-table\">\n<thead><tr><th>Metric</th>")?;
    for window in Window::ordered() {
        write!(html, "<th>{}</th>", window.label())?;
    }
    writeln!(html, "</tr></thead>\n<tbody>")?;

    let count_rows: [(&str, fn(&WindowCounters) -> String); 4] = [
        ("Appts Assigned", |c| c.appointments.to_string()),
        ("Appts Sat", |c| c.sat.to_string()),
        ("Deals Closed", |c| c.closed.to_string()),
        ("Revenue", |c| format_currency(c.revenue_cents)),
    ];
    for (label, value) in count_rows {
        write!(html, "<tr><td><strong>{label}</strong></td>")?;
        for window in Window::ordered() {
            write!(html, "<td>{}</td>", value(metrics.window(window)))?;
        }
        writeln!(html, "</tr>")?;
    }
    for (label, kind) in [("SIT Rate", RateKind::Sit), ("CLOSE Rate", RateKind::Close)] {
        write!(html, "<tr><td><strong>{label}</strong></td>")?;
        for window in Window::ordered() {
            write_rate_td(html, kind, metrics.window(window))?;
        }
        writeln!(html, "</tr>")?;
    }

    writeln!(html, "</tbody>\n</table>")?;
    writeln!(
        html,
        "<div class=\"footer\">This report is private to {name}.</div>\n</div>\n</body>\n</html>"
    )
}

/// Self-contained HTML page for one partner's four windows.
pub fn render_partner_html(metrics: &PartnerMetrics, generated_at: DateTime<Tz>) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write_partner_page(&mut html, metrics, generated_at);
    html
}

fn write_dashboard(
    html: &mut String,
    table: &RollupTable,
    generated_at: DateTime<Tz>,
) -> fmt::Result {
    let summary = ManagementSummary::from_table(table);
    write_head(html, "Management Dashboard")?;
    writeln!(html, "<body>\n<div class=\"container\">\n<div class=\"header\">")?;
    writeln!(html, "<h1>Management Dashboard</h1>")?;
    writeln!(
        html,
        "<div class=\"timestamp\">Generated: {}</div>\n</div>",
        generated_at.format("%B %-d, %Y at %-I:%M %p %Z")
    )?;

    writeln!(html, "<div class=\"overview-grid\">")?;
    let cards = [
        ("Total Partners", summary.total_partners.to_string()),
        ("Active Today", summary.active_today.to_string()),
        ("Today's Assigned", summary.today.appointments.to_string()),
        ("Today's Sat", summary.today.sat.to_string()),
        ("Today's Closed", summary.today.closed.to_string()),
        ("Overall SIT Rate", format!("{}%", format_rate(summary.overall_sit_rate))),
        ("Overall CLOSE Rate", format!("{}%", format_rate(summary.overall_close_rate))),
        ("YTD Revenue", format_currency(summary.ytd_revenue_cents)),
    ];
    for (label, value) in cards {
        writeln!(
            html,
            "<div class=\"overview-card\"><h3>{label}</h3><div class=\"value\">{value}</div></div>"
        )?;
    }
    writeln!(html, "</div>")?;

    writeln!(
        html,
        "<table class=\"partner-table\">\n<thead><tr><th>Partner</th><th>Today</th><th>Sat</th>\
<th>Closed</th><th>SIT</th><th>CLOSE</th><th>YTD Appts</th><th>YTD SIT</th><th>YTD CLOSE</th>\
<th>YTD Revenue</th></tr></thead>\n<tbody>"
    )?;

    let mut ranked: Vec<&PartnerMetrics> = table.iter().collect();
    ranked.sort_by_key(|metrics| {
        Reverse(
            u64::from(metrics.year_to_date.closed) * 100 + u64::from(metrics.year_to_date.sat),
        )
    });
    for metrics in ranked {
        let today = &metrics.today;
        let ytd = &metrics.year_to_date;
        write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape_html(metrics.key.as_str()),
            today.appointments,
            today.sat,
            today.closed
        )?;
        write_rate_td(html, RateKind::Sit, today)?;
        write_rate_td(html, RateKind::Close, today)?;
        write!(html, "<td>{}</td>", ytd.appointments)?;
        write_rate_td(html, RateKind::Sit, ytd)?;
        write_rate_td(html, RateKind::Close, ytd)?;
        writeln!(html, "<td>{}</td></tr>", format_currency(ytd.revenue_cents))?;
    }

    writeln!(html, "</tbody>\n</table>\n</div>\n</body>\n</html>")
}

/// Management dashboard listing every partner, strongest YTD performers first.
pub fn render_management_dashboard(table: &RollupTable, generated_at: DateTime<Tz>) -> String {
    let mut html = String::new();
    let _ = write_dashboard(&mut html, table, generated_at);
    html
}
