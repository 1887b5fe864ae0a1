//! Field normalization rules shared by source loaders and the combiner.
//!
//! Each rule is total: bad input degrades to the documented default (healthy,
//! not adopted, unresolved bucket, null) and never fails a run.

use chrono::{NaiveDate, NaiveDateTime};

use crate::constants::normalize::{
    SPECIES_CODES, SPEED_DAY_BREAKS, SPEED_UNRESOLVED, TRUTHY_STATUS, UNHEALTHY_CODES,
    UNHEALTHY_KEYWORDS,
};
use crate::table::{Value, format_number};

/// Binary health flag from a coded severity field.
///
/// Codes 2 and 3 (minor/serious condition) count as unhealthy. Null,
/// non-integral, and unparseable values count as healthy.
pub fn health_from_code(value: &Value) -> u8 {
    let Some(number) = value.coerced_number() else {
        return 0;
    };
    if number.fract() != 0.0 {
        return 0;
    }
    if UNHEALTHY_CODES.contains(&(number as i64)) {
        1
    } else {
        0
    }
}

/// Binary health flag from a free-text condition field.
///
/// Any case-insensitive keyword hit (injury/sickness/illness/medical terms)
/// counts as unhealthy.
pub fn health_from_text(value: &Value) -> u8 {
    let Some(text) = value.as_text() else {
        return 0;
    };
    let lowered = text.to_lowercase();
    if UNHEALTHY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        1
    } else {
        0
    }
}

/// Map elapsed days between intake and outcome to the 0-4 speed bucket.
///
/// Null elapsed time means never adopted or unknown, which lands in the
/// slowest bucket.
pub fn speed_from_days(days: Option<f64>) -> u8 {
    let Some(days) = days else {
        return SPEED_UNRESOLVED;
    };
    if days.is_nan() {
        return SPEED_UNRESOLVED;
    }
    let [same_day, week, month, quarter] = SPEED_DAY_BREAKS;
    if days <= same_day as f64 {
        0
    } else if days <= week as f64 {
        1
    } else if days <= month as f64 {
        2
    } else if days <= quarter as f64 {
        3
    } else {
        SPEED_UNRESOLVED
    }
}

/// Collapse a speed bucket to a binary adoption outcome.
///
/// Any bounded bucket counts as adopted; only the unresolved bucket (and
/// null) count as not adopted.
pub fn status_from_speed(speed: Option<f64>) -> u8 {
    match speed {
        Some(value) if value == 0.0 || value == 1.0 || value == 2.0 || value == 3.0 => 1,
        _ => 0,
    }
}

/// Normalize a species label: trim, lowercase, and map numeric codes to
/// names. Idempotent; null stays null.
pub fn normalize_type(value: &Value) -> Value {
    let text = match value {
        Value::Text(text) => text.trim().to_lowercase(),
        Value::Number(number) => format_number(*number),
        Value::Null => return Value::Null,
    };
    for (code, name) in SPECIES_CODES {
        if text == code {
            return Value::text(name);
        }
    }
    Value::text(text)
}

/// Normalize heterogeneous truthy encodings (1/true/yes/y, any case) to 1;
/// everything else, including null, to 0.
pub fn truthy_status(value: &Value) -> u8 {
    let text = match value {
        Value::Text(text) => text.trim().to_lowercase(),
        Value::Number(number) => format_number(*number),
        Value::Null => return 0,
    };
    if TRUTHY_STATUS.contains(&text.as_str()) { 1 } else { 0 }
}

/// Fail-soft datetime parsing across the formats seen in shelter exports.
///
/// Returns `None` for null, non-text, and unparseable values.
pub fn parse_date_permissive(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_text()?.trim();
    if text.is_empty() {
        return None;
    }
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Whole days elapsed between two parsed timestamps, when both are present.
pub fn days_between(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Option<i64> {
    Some((end? - start?).num_days())
}

/// Convert a year-unit age to rounded months.
pub fn years_to_months(value: &Value) -> Value {
    match value.coerced_number() {
        Some(years) => Value::number((years * 12.0).round()),
        None => Value::Null,
    }
}

/// Coerce a cell to numeric; unparseable values become null.
pub fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::Number(number) => Value::Number(*number),
        Value::Null => Value::Null,
        Value::Text(_) => match value.coerced_number() {
            Some(number) => Value::Number(number),
            None => Value::Null,
        },
    }
}

/// True when every non-null cell parses as a number.
///
/// Mirrors CSV dtype inference: an all-null column still counts as numeric,
/// so coded health rules apply to it (and produce the healthy default).
pub fn is_numeric_column<'a>(values: impl IntoIterator<Item = &'a Value>) -> bool {
    values
        .into_iter()
        .all(|value| value.is_null() || value.coerced_number().is_some())
}
