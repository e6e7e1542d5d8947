/// Normalizes a US phone number to E.164: digits only, `+1` prefixed unless it already leads with `1`.
///
/// Returns `None` when the input has no digits at all.
pub fn format_phone_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    if digits.starts_with('1') {
        Some(format!("+{digits}"))
    } else {
        Some(format!("+1{digits}"))
    }
}
