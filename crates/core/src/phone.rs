//! Phone number helpers: digit extraction, shape checks, display
//! formatting and E.164 conversion.
//!
//! All functions are total; none of them fail on unexpected input.

/// Strip everything except ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A US number: 10 digits, or 11 with a leading country digit `1`.
pub fn is_valid_us_phone(input: &str) -> bool {
    let digits = digits_only(input);
    match digits.len() {
        10 => true,
        11 => digits.starts_with('1'),
        _ => false,
    }
}

/// Convert a user-entered phone number to E.164.
///
/// - 10 digits: `+1` prefix.
/// - 11 digits starting with `1`: `+` prefix.
/// - anything else: `+` prefix over whatever digits remain.
pub fn to_e164(input: &str) -> String {
    let digits = digits_only(input);
    // 11-digit numbers already carry the country digit, so they share the
    // plain `+` branch with the fallback.
    if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    }
}

/// Format partial input as the user types: `(720) 918-7465`.
///
/// A leading country digit is dropped and input beyond ten digits is
/// truncated.
pub fn format_display(input: &str) -> String {
    let mut digits = digits_only(input);
    if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }
    digits.truncate(10);

    match digits.len() {
        0 => String::new(),
        1..=3 => format!("({digits}"),
        4..=6 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}
