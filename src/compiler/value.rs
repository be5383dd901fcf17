//! Bound parameter values and coercion to field types

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use super::error::{CompileError, CompileResult};
use crate::metadata::{FieldMetadata, FieldType};
use crate::rules::{Operator, Scalar};

/// Storage format for date fields
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value bound to one `?` placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(x: f64) -> Self {
        SqlValue::Real(x)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

/// Convert a rule scalar into the representation the field's column stores
pub fn coerce(field: &FieldMetadata, scalar: &Scalar) -> CompileResult<SqlValue> {
    let mismatch = || CompileError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type.to_string(),
        value: scalar_repr(scalar),
    };

    match field.field_type {
        FieldType::Number => match scalar {
            Scalar::Integer(i) => Ok(SqlValue::Integer(*i)),
            Scalar::Float(x) => Ok(SqlValue::Real(*x)),
            Scalar::Text(s) => parse_number(s).ok_or_else(mismatch),
            Scalar::Bool(_) => Err(mismatch()),
        },
        FieldType::Boolean => match scalar {
            Scalar::Bool(b) => Ok(SqlValue::Bool(*b)),
            Scalar::Integer(0) => Ok(SqlValue::Bool(false)),
            Scalar::Integer(1) => Ok(SqlValue::Bool(true)),
            Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(SqlValue::Bool(true)),
                "false" | "0" => Ok(SqlValue::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        FieldType::Date => match scalar {
            Scalar::Text(s) => normalize_date(s).map(SqlValue::Text).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldType::Text | FieldType::Select => match scalar {
            Scalar::Text(s) => Ok(SqlValue::Text(s.clone())),
            Scalar::Integer(_) | Scalar::Float(_) => Ok(SqlValue::Text(scalar.to_string())),
            Scalar::Bool(_) => Err(mismatch()),
        },
    }
}

/// Bind value for a LIKE operator: the pattern with wildcards escaped
pub fn like_pattern(operator: Operator, scalar: &Scalar) -> SqlValue {
    let raw = scalar.to_string();
    let escaped = raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    let pattern = match operator {
        Operator::BeginsWith | Operator::DoesNotBeginWith => format!("{}%", escaped),
        Operator::EndsWith | Operator::DoesNotEndWith => format!("%{}", escaped),
        _ => format!("%{}%", escaped),
    };
    SqlValue::Text(pattern)
}

fn parse_number(text: &str) -> Option<SqlValue> {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Some(SqlValue::Integer(i));
    }
    t.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .map(SqlValue::Real)
}

/// Normalize RFC 3339, ISO or plain-date text to `DATE_FORMAT` (UTC)
pub fn normalize_date(text: &str) -> Option<String> {
    let t = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc).format(DATE_FORMAT).to_string());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt.format(DATE_FORMAT).to_string());
        }
    }

    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
}

fn scalar_repr(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Text(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field_type: FieldType) -> FieldMetadata {
        FieldMetadata::new("f", "F", field_type)
    }

    #[test]
    fn test_number_coercion() {
        let f = field(FieldType::Number);

        assert_eq!(coerce(&f, &Scalar::Integer(5)).unwrap(), SqlValue::Integer(5));
        assert_eq!(coerce(&f, &Scalar::from(" 42 ")).unwrap(), SqlValue::Integer(42));
        assert_eq!(coerce(&f, &Scalar::from("9.5")).unwrap(), SqlValue::Real(9.5));
        assert!(matches!(
            coerce(&f, &Scalar::from("abc")),
            Err(CompileError::TypeMismatch { .. })
        ));
        assert!(coerce(&f, &Scalar::from("NaN")).is_err());
        assert!(coerce(&f, &Scalar::Bool(true)).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        let f = field(FieldType::Boolean);

        assert_eq!(coerce(&f, &Scalar::from("TRUE")).unwrap(), SqlValue::Bool(true));
        assert_eq!(coerce(&f, &Scalar::Integer(0)).unwrap(), SqlValue::Bool(false));
        assert!(coerce(&f, &Scalar::Integer(2)).is_err());
        assert!(coerce(&f, &Scalar::from("yes")).is_err());
    }

    #[test]
    fn test_date_coercion() {
        let f = field(FieldType::Date);

        assert_eq!(
            coerce(&f, &Scalar::from("2024-03-01")).unwrap(),
            SqlValue::Text("2024-03-01 00:00:00".into())
        );
        assert_eq!(
            coerce(&f, &Scalar::from("2024-03-01T10:30:00+02:00")).unwrap(),
            SqlValue::Text("2024-03-01 08:30:00".into())
        );
        assert_eq!(
            coerce(&f, &Scalar::from("2024-03-01T10:30:15.250")).unwrap(),
            SqlValue::Text("2024-03-01 10:30:15".into())
        );
        assert!(coerce(&f, &Scalar::from("March 1st")).is_err());
        assert!(coerce(&f, &Scalar::Integer(20240301)).is_err());
    }

    #[test]
    fn test_text_accepts_numbers() {
        let f = field(FieldType::Text);
        assert_eq!(coerce(&f, &Scalar::Integer(7)).unwrap(), SqlValue::Text("7".into()));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(
            like_pattern(Operator::Contains, &Scalar::from("50%_off\\")),
            SqlValue::Text("%50\\%\\_off\\\\%".into())
        );
        assert_eq!(
            like_pattern(Operator::BeginsWith, &Scalar::from("Jo")),
            SqlValue::Text("Jo%".into())
        );
        assert_eq!(
            like_pattern(Operator::DoesNotEndWith, &Scalar::from(".com")),
            SqlValue::Text("%.com".into())
        );
    }
}
