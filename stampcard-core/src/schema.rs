//! Boundary validation for completion output.
//!
//! The completion service is untyped. Nothing past this module sees a
//! `serde_json::Value`: either a fully typed [`RawExtraction`] comes out, or an
//! [`ExtractionError`] naming the first violation.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;

use crate::error::{ExtractionError, ValidationError};

/// An end date as the completion service reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDate {
    /// `YYYY-MM-DD`
    Full(NaiveDate),
    /// `MM-DD` or `--MM-DD`; the year is inferred at resolution time.
    MonthDay { month: u32, day: u32 },
}

impl TargetDate {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Self::Full(d));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Full(dt.date_naive()));
        }

        let md = s.strip_prefix("--").unwrap_or(s);
        let (m, d) = md.split_once('-')?;
        if m.is_empty() || d.is_empty() || m.len() > 2 || d.len() > 2 {
            return None;
        }
        let month: u32 = m.parse().ok()?;
        let day: u32 = d.parse().ok()?;
        // 2000 is a leap year, so this admits Feb 29.
        NaiveDate::from_ymd_opt(2000, month, day)?;
        Some(Self::MonthDay { month, day })
    }
}

impl fmt::Display for TargetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::MonthDay { month, day } => write!(f, "--{month:02}-{day:02}"),
        }
    }
}

/// Structured output of the completion service, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawExtraction {
    pub target_date: Option<TargetDate>,
    pub total_stamps: Option<i64>,
    pub is_daily: bool,
}

const MAX_RECEIVED_LEN: usize = 80;

fn describe(value: Option<&Value>) -> String {
    let Some(v) = value else {
        return "nothing (field missing)".to_string();
    };
    let kind = match v {
        Value::Null => return "null".to_string(),
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    let mut rendered = v.to_string();
    if rendered.chars().count() > MAX_RECEIVED_LEN {
        rendered = rendered.chars().take(MAX_RECEIVED_LEN).collect::<String>() + "…";
    }
    format!("{kind} {rendered}")
}

fn violation(field: &str, expected: &str, received: Option<&Value>) -> ExtractionError {
    ValidationError::new(field, expected, describe(received)).into()
}

fn as_integer(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Check a completion response against the [`RawExtraction`] shape.
///
/// `None` and JSON `null` mean the service produced nothing, which is reported
/// as [`ExtractionError::EmptyResponse`] rather than a schema violation.
pub fn validate(response: Option<&Value>) -> Result<RawExtraction, ExtractionError> {
    let value = match response {
        None | Some(Value::Null) => return Err(ExtractionError::EmptyResponse),
        Some(v) => v,
    };
    let Value::Object(obj) = value else {
        return Err(violation("response", "object", Some(value)));
    };

    let is_daily = match obj.get("is_daily") {
        Some(Value::Bool(b)) => *b,
        other => return Err(violation("is_daily", "boolean", other)),
    };

    let total_stamps = match obj.get("total_stamps") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match as_integer(n) {
            Some(i) => Some(i),
            None => return Err(violation("total_stamps", "integer", obj.get("total_stamps"))),
        },
        other => return Err(violation("total_stamps", "integer", other)),
    };

    let target_date = match obj.get("target_date") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match TargetDate::parse(s) {
            Some(d) => Some(d),
            None => {
                return Err(violation(
                    "target_date",
                    "ISO calendar date (YYYY-MM-DD or MM-DD)",
                    obj.get("target_date"),
                ));
            }
        },
        other => return Err(violation("target_date", "string", other)),
    };

    Ok(RawExtraction {
        target_date,
        total_stamps,
        is_daily,
    })
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("valid fence regex"));

/// Turn free completion text into a JSON value for [`validate`].
///
/// Blank text is `None`. Text that is not JSON comes back as a JSON string so
/// validation can report what was received.
pub fn parse_completion_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let body = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);
    if body.is_empty() {
        return None;
    }

    if let Ok(v) = serde_json::from_str::<Value>(body) {
        return Some(v);
    }
    // Models sometimes wrap the object in a sentence.
    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<Value>(&body[start..=end]) {
                return Some(v);
            }
        }
    }
    Some(Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_of(err: ExtractionError) -> String {
        match err {
            ExtractionError::Validation(v) => v.field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_full_extraction() {
        let v = json!({"target_date": "2026-10-30", "total_stamps": 12, "is_daily": false});
        let raw = validate(Some(&v)).unwrap();
        assert_eq!(raw.target_date, Some(TargetDate::Full(NaiveDate::from_ymd_opt(2026, 10, 30).unwrap())));
        assert_eq!(raw.total_stamps, Some(12));
        assert!(!raw.is_daily);
    }

    #[test]
    fn optional_fields_may_be_missing_or_null() {
        let v = json!({"is_daily": true, "total_stamps": null});
        let raw = validate(Some(&v)).unwrap();
        assert_eq!(raw, RawExtraction { target_date: None, total_stamps: None, is_daily: true });
    }

    #[test]
    fn empty_response_is_distinct() {
        assert_eq!(validate(None), Err(ExtractionError::EmptyResponse));
        assert_eq!(validate(Some(&Value::Null)), Err(ExtractionError::EmptyResponse));
    }

    #[test]
    fn non_object_is_rejected() {
        let err = validate(Some(&json!("sure, here you go"))).unwrap_err();
        assert_eq!(field_of(err), "response");
    }

    #[test]
    fn missing_is_daily_is_rejected() {
        let err = validate(Some(&json!({"total_stamps": 3}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "completion output did not match the schema: is_daily: expected boolean, received nothing (field missing)"
        );
    }

    #[test]
    fn wrong_type_reports_received_value() {
        let err = validate(Some(&json!({"is_daily": "yes"}))).unwrap_err();
        match err {
            ExtractionError::Validation(v) => {
                assert_eq!(v.field, "is_daily");
                assert_eq!(v.expected, "boolean");
                assert_eq!(v.received, "string \"yes\"");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn total_stamps_must_be_integral() {
        let ok = validate(Some(&json!({"is_daily": false, "total_stamps": 5.0}))).unwrap();
        assert_eq!(ok.total_stamps, Some(5));

        let err = validate(Some(&json!({"is_daily": false, "total_stamps": 2.5}))).unwrap_err();
        assert_eq!(field_of(err), "total_stamps");

        let err = validate(Some(&json!({"is_daily": false, "total_stamps": "5"}))).unwrap_err();
        assert_eq!(field_of(err), "total_stamps");
    }

    #[test]
    fn target_date_must_be_a_date() {
        let err = validate(Some(&json!({"is_daily": false, "target_date": "next tuesday"}))).unwrap_err();
        assert_eq!(field_of(err), "target_date");

        let err = validate(Some(&json!({"is_daily": false, "target_date": 20261030}))).unwrap_err();
        assert_eq!(field_of(err), "target_date");

        let blank = validate(Some(&json!({"is_daily": false, "target_date": ""}))).unwrap();
        assert_eq!(blank.target_date, None);
    }

    #[test]
    fn first_violation_wins() {
        let err = validate(Some(&json!({"is_daily": 1, "total_stamps": "x"}))).unwrap_err();
        assert_eq!(field_of(err), "is_daily");
    }

    #[test]
    fn input_is_left_untouched() {
        let v = json!({"is_daily": true, "extra": [1, 2]});
        let before = v.clone();
        validate(Some(&v)).unwrap();
        assert_eq!(v, before);
    }

    #[test]
    fn parses_yearless_dates() {
        assert_eq!(TargetDate::parse("10-30"), Some(TargetDate::MonthDay { month: 10, day: 30 }));
        assert_eq!(TargetDate::parse("--02-29"), Some(TargetDate::MonthDay { month: 2, day: 29 }));
        assert_eq!(TargetDate::parse("13-01"), None);
        assert_eq!(TargetDate::parse("02-30"), None);
        assert_eq!(TargetDate::MonthDay { month: 9, day: 7 }.to_string(), "--09-07");
    }

    #[test]
    fn parses_datetime_as_its_date() {
        assert_eq!(
            TargetDate::parse("2026-10-30T00:00:00Z"),
            Some(TargetDate::Full(NaiveDate::from_ymd_opt(2026, 10, 30).unwrap()))
        );
    }

    #[test]
    fn completion_text_handling() {
        assert_eq!(parse_completion_text("   \n"), None);
        assert_eq!(parse_completion_text("```json\n```"), None);
        assert_eq!(
            parse_completion_text("```json\n{\"is_daily\": true}\n```"),
            Some(json!({"is_daily": true}))
        );
        assert_eq!(
            parse_completion_text("Here it is: {\"is_daily\": false} hope that helps"),
            Some(json!({"is_daily": false}))
        );
        assert_eq!(parse_completion_text("no idea"), Some(json!("no idea")));
    }
}
