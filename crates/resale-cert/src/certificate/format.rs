use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::warn;

use super::rules::RuleFault;

/// Date layout printed on the certificate.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Resolve the requested IANA zone, falling back to UTC for blanks and unknown names.
pub fn resolve_timezone(requested: Option<&str>) -> Tz {
    let Some(raw) = requested.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Tz::UTC;
    };

    match raw.parse::<Tz>() {
        Ok(zone) => zone,
        Err(_) => {
            warn!(timezone = raw, "unknown timezone, formatting dates in UTC");
            Tz::UTC
        }
    }
}

/// Plain text rendering of a scalar; containers are a fault.
pub fn text_of(value: &Value) -> Result<String, RuleFault> {
    match value {
        Value::String(raw) => Ok(raw.trim().to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(if *flag { "Yes" } else { "No" }.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(RuleFault::UnexpectedType {
            expected: "text",
            found: kind_name(value),
        }),
    }
}

/// `$` followed by the amount with thousands separators and two decimals.
///
/// Blank input renders as an empty string.
pub fn currency(value: &Value) -> Result<String, RuleFault> {
    Ok(parse_amount(value)?.map(format_currency).unwrap_or_default())
}

/// Numeric reading of an amount that may arrive as a JSON number or as a string that
/// already carries `$` or `,`. Blank input is `None`.
pub fn parse_amount(value: &Value) -> Result<Option<f64>, RuleFault> {
    let amount = match value {
        Value::Number(number) => number.as_f64().ok_or_else(|| RuleFault::InvalidNumber {
            raw: number.to_string(),
        })?,
        Value::String(raw) => {
            let cleaned: String = raw
                .trim()
                .chars()
                .filter(|ch| !matches!(ch, '$' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| RuleFault::InvalidNumber { raw: raw.clone() })?
        }
        Value::Null => return Ok(None),
        other => {
            return Err(RuleFault::UnexpectedType {
                expected: "number",
                found: kind_name(other),
            })
        }
    };

    if !amount.is_finite() {
        return Err(RuleFault::InvalidNumber {
            raw: amount.to_string(),
        });
    }

    Ok(Some(amount))
}

pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = group_thousands(cents / 100);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${whole}.{:02}", cents % 100)
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Render a stored date in the certificate layout.
///
/// Timestamps are shifted into `zone` before formatting; bare calendar dates are printed
/// as-is since they carry no time of day to shift.
pub fn date(value: &Value, zone: Tz) -> Result<String, RuleFault> {
    let raw = match value {
        Value::String(raw) => raw.trim(),
        Value::Null => return Ok(String::new()),
        other => {
            return Err(RuleFault::UnexpectedType {
                expected: "date",
                found: kind_name(other),
            })
        }
    };

    if raw.is_empty() {
        return Ok(String::new());
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&zone).format(DATE_FORMAT).to_string());
    }

    for layout in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, layout) {
            return Ok(date.format(DATE_FORMAT).to_string());
        }
    }

    Err(RuleFault::InvalidDate {
        raw: raw.to_string(),
    })
}

pub fn today(now: DateTime<Utc>, zone: Tz) -> String {
    now.with_timezone(&zone).format(DATE_FORMAT).to_string()
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
