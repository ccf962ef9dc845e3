//! Display formatting for asset records.
//!
//! Records reach the dashboard with loose types (spreadsheet cells come back as
//! numbers, strings or nothing at all), so every function here takes raw JSON
//! values and degrades to a fixed fallback instead of failing:
//!
//! - unparsable amounts count as `0`
//! - unparsable or zero quantities count as `1`
//! - unparsable dates render as [`DATE_PLACEHOLDER`]

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use rust_decimal::prelude::*;
use serde_json::Value;

/// Currency symbol of the deployment (Malaysian ringgit)
pub const CURRENCY_SYMBOL: &str = "RM";

/// Rendered for empty or unparsable dates
pub const DATE_PLACEHOLDER: &str = "-";

/// Rendered for an empty type or the `N/A` sentinel
pub const TYPE_LABEL_PLACEHOLDER: &str = "No Data";

/// Sentinel some sheets use for "no type recorded"
pub const UNKNOWN_TYPE_SENTINEL: &str = "N/A";

/// Rendered when an asset has no location
pub const LOCATION_PLACEHOLDER: &str = "Unassigned";

/// Dates are shown in the deployment's local offset (UTC+8)
pub const DISPLAY_UTC_OFFSET_SECS: i32 = 8 * 3600;

const MAX_FRACTION_DIGITS: u32 = 20;

/// Parse the numeric prefix of a string the way JavaScript's `parseFloat` does.
///
/// Leading whitespace is skipped and trailing garbage is ignored (`"12.5kg"` is
/// `12.5`). Non-finite results are rejected.
pub fn parse_float_str(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut cursor = frac_start;
        while cursor < len && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        digits += cursor - frac_start;
        if digits > 0 {
            end = cursor;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < len && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exp_start = cursor;
        while cursor < len && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exp_start {
            end = cursor;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the integer prefix of a string the way JavaScript's `parseInt` does
/// (including the `0x` hexadecimal prefix).
pub fn parse_int_str(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let mut magnitude: i128 = 0;
    let mut seen = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        seen = true;
        magnitude = magnitude.saturating_mul(radix as i128).saturating_add(d as i128);
    }

    if !seen {
        return None;
    }

    let signed = if negative { -magnitude } else { magnitude };
    Some(signed.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
}

/// `parseFloat` over a raw record field
pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_float_str(s),
        _ => None,
    }
}

/// `parseInt` over a raw record field
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)),
        Value::String(s) => parse_int_str(s),
        _ => None,
    }
}

/// `parseFloat(value) || default`
pub fn safe_float(value: &Value, default: f64) -> f64 {
    parse_float(value).filter(|v| *v != 0.0).unwrap_or(default)
}

/// `parseInt(value) || default`
pub fn safe_int(value: &Value, default: i64) -> i64 {
    parse_int(value).filter(|v| *v != 0).unwrap_or(default)
}

/// Total value of a record: unit value times quantity.
///
/// Never fails: a bad value counts as 0, and a bad or zero quantity counts as 1.
pub fn calculate_total_value(value: &Value, quantity: &Value) -> f64 {
    safe_float(value, 0.0) * safe_int(quantity, 1) as f64
}

/// Format a raw field as currency with exactly `fraction_digits` decimals.
///
/// Input that does not parse as a number is treated as zero.
pub fn format_currency(value: &Value, fraction_digits: u32) -> String {
    format_amount(parse_float(value).unwrap_or(0.0), fraction_digits)
}

/// Format an already-computed amount as currency, e.g. `RM1,234.50`.
pub fn format_amount(amount: f64, fraction_digits: u32) -> String {
    let digits = fraction_digits.min(MAX_FRACTION_DIGITS);

    // Round the shortest decimal form, so 1.005 rounds up like it reads
    let decimal = amount
        .to_string()
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_f64_retain(amount));
    let fixed = match decimal {
        Some(decimal) => {
            let rounded =
                decimal.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.*}", digits as usize, rounded)
        }
        None => format!("{:.*}", digits as usize, amount),
    };

    let (negative, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, fixed.as_str()),
    };
    // -0.00 renders as a plain zero
    let negative = negative && unsigned.chars().any(|c| c.is_ascii_digit() && c != '0');

    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut out = String::with_capacity(fixed.len() + 8);
    if negative {
        out.push('-');
    }
    out.push_str(CURRENCY_SYMBOL);
    out.push_str(&group_thousands(integer));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(integer: &str) -> String {
    let len = integer.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Render a number the way JavaScript's `String(number)` does for ordinary values
/// (`15` rather than `15.0`, `25.5`, and `0` for negative zero).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// The deployment's display offset
pub fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse an acquisition date field into a calendar date in `offset`.
///
/// Accepts:
/// - `YYYY-MM-DD` and `YYYY/MM/DD` (taken as calendar dates, no shifting)
/// - RFC 3339 timestamps (converted into `offset`)
/// - naive ISO date-times
/// - epoch milliseconds
pub fn parse_date(value: &Value, offset: FixedOffset) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s.trim(), offset),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.with_timezone(&offset).date_naive()),
        _ => None,
    }
}

fn parse_date_str(s: &str, offset: FixedOffset) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
        return Some(timestamp.with_timezone(&offset).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y/%m/%d").ok()
}

/// Format a date field as `DD Mon YYYY` in the deployment offset, or `-`.
pub fn format_date(value: &Value) -> String {
    format_date_in(value, display_offset())
}

pub fn format_date_in(value: &Value, offset: FixedOffset) -> String {
    // Zero is "no date", not the epoch
    if value.as_f64() == Some(0.0) {
        return DATE_PLACEHOLDER.to_string();
    }
    match parse_date(value, offset) {
        Some(date) => date.format("%d %b %Y").to_string(),
        None => DATE_PLACEHOLDER.to_string(),
    }
}

/// Human-readable label for an asset type: `office_supplies` -> `Office Supplies`.
pub fn get_type_label(asset_type: &str) -> String {
    if asset_type.trim().is_empty() || asset_type == UNKNOWN_TYPE_SENTINEL {
        return TYPE_LABEL_PLACEHOLDER.to_string();
    }

    asset_type
        .split(|c| matches!(c, '_' | '-' | ' '))
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Location text, or the "unassigned" placeholder
pub fn location_label(location: Option<&str>) -> String {
    match location.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => LOCATION_PLACEHOLDER.to_string(),
    }
}
