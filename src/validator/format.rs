//! `format` keyword checks.
//!
//! Recognized formats are checked exactly; anything else passes.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Number;
use std::net::{Ipv4Addr, Ipv6Addr};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("email regex should be valid")
});

static BASE64_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
        .expect("base64 regex should be valid")
});

/// Whether `value` satisfies a string `format`. Unknown formats pass.
#[must_use]
pub fn check_string(format: &str, value: &str) -> bool {
    match format {
        "date-time" => is_date_time(value),
        "date" => is_date(value),
        "time" => is_time(value),
        "email" => EMAIL_REGEX.is_match(value),
        "uuid" => is_uuid(value),
        "uri" => url::Url::parse(value).is_ok(),
        "hostname" => is_hostname(value),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        "byte" => BASE64_REGEX.is_match(value),
        _ => true,
    }
}

/// Whether a number satisfies a numeric `format`. Unknown formats pass.
#[must_use]
pub fn check_number(format: &str, value: &Number) -> bool {
    match format {
        "int32" => value
            .as_i64()
            .is_some_and(|n| i32::try_from(n).is_ok()),
        "int64" => value.is_i64() || value.as_f64().is_some_and(|f| f.fract() == 0.0 && f.abs() < 9.2e18),
        _ => true,
    }
}

/// RFC 3339 `full-date`.
fn is_date(value: &str) -> bool {
    // chrono accepts single-digit months and days
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// RFC 3339 `full-time`: `HH:MM:SS[.frac](Z|±HH:MM)`, checked as the time
/// part of a date-time on a fixed day.
fn is_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(&format!("1970-01-01T{value}")).is_ok()
}

fn is_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_uuid(value: &str) -> bool {
    let b = value.as_bytes();
    b.len() == 36
        && b.iter().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => *c == b'-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// RFC 1123 host name.
fn is_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    !value.is_empty()
        && value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'-')
        })
}
