//! Text and HTML renderings of a [`RollupTable`](crate::metrics::RollupTable).
//!
//! Everything here is a pure function of already-aggregated metrics; delivery lives in
//! [`notifications`](crate::notifications).

pub mod html;
pub mod sms;
mod summary;

pub use summary::{detailed_report, split_into_chunks, with_part_headers, ManagementSummary};

/// SMS segments are capped at 1600 characters; leave room for the part header.
pub const SMS_CHUNK_LIMIT: usize = 1500;

/// Whole dollars with thousands separators, e.g. `$12,345`.
pub fn format_currency(cents: u64) -> String {
    let dollars = cents.saturating_add(50) / 100;
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}")
}

/// One-decimal percentage text without the `%` sign.
pub fn format_rate(rate: f64) -> String {
    format!("{rate:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0), "$0");
        assert_eq!(format_currency(99_949), "$999");
        assert_eq!(format_currency(100_000), "$1,000");
        assert_eq!(format_currency(1_234_567_800), "$12,345,678");
    }

    #[test]
    fn currency_handles_saturated_totals() {
        assert_eq!(format_currency(u64::MAX), "$184,467,440,737,095,516");
    }

    #[test]
    fn rate_keeps_one_decimal() {
        assert_eq!(format_rate(70.0), "70.0");
        assert_eq!(format_rate(28.6), "28.6");
    }
}
