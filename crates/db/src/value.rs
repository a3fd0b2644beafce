//! Conversion of client supplied JSON into values bound to dynamic queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;

use crate::metadata::{ColumnDef, ColumnKind};

/// Matches what `datetime('now', 'subsec')` writes, so stored timestamps sort as text
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("{column} cannot be null")]
    NotNullable { column: &'static str },
    #[error("invalid value for {column}: expected {expected}")]
    Invalid {
        column: &'static str,
        expected: ColumnKind,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Datetime(DateTime<Utc>),
    Json(Value),
}

impl SqlValue {
    pub fn push_bind(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            SqlValue::Null => builder.push_bind(Option::<i64>::None),
            SqlValue::Integer(v) => builder.push_bind(v),
            SqlValue::Real(v) => builder.push_bind(v),
            SqlValue::Text(v) => builder.push_bind(v),
            SqlValue::Bool(v) => builder.push_bind(v),
            SqlValue::Datetime(v) => builder.push_bind(v.format(DATETIME_FORMAT).to_string()),
            SqlValue::Json(v) => builder.push_bind(v.to_string()),
        };
    }
}

impl ColumnDef {
    /// Convert a JSON value into the column's storage type
    pub fn coerce(&self, value: &Value) -> Result<SqlValue, ValueError> {
        let invalid = || ValueError::Invalid {
            column: self.name,
            expected: self.kind,
        };

        if value.is_null() {
            return self.null();
        }
        if let Value::String(s) = value {
            return self.coerce_str(s);
        }

        match self.kind {
            ColumnKind::Json => Ok(SqlValue::Json(value.clone())),
            ColumnKind::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(SqlValue::Integer)
                    .ok_or_else(invalid),
                Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
                _ => Err(invalid()),
            },
            ColumnKind::Real => value.as_f64().map(SqlValue::Real).ok_or_else(invalid),
            ColumnKind::Boolean => match value {
                Value::Bool(b) => Ok(SqlValue::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(SqlValue::Bool(false)),
                    Some(1) => Ok(SqlValue::Bool(true)),
                    _ => Err(invalid()),
                },
                _ => Err(invalid()),
            },
            ColumnKind::Text => match value {
                Value::Number(n) => Ok(SqlValue::Text(n.to_string())),
                Value::Bool(b) => Ok(SqlValue::Text(b.to_string())),
                _ => Err(invalid()),
            },
            ColumnKind::Datetime => Err(invalid()),
        }
    }

    /// Convert a query-string value into the column's storage type.
    ///
    /// An empty string counts as null for every kind except text.
    pub fn coerce_str(&self, raw: &str) -> Result<SqlValue, ValueError> {
        let invalid = || ValueError::Invalid {
            column: self.name,
            expected: self.kind,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() && self.kind != ColumnKind::Text {
            return self.null();
        }

        match self.kind {
            ColumnKind::Text => Ok(SqlValue::Text(raw.to_string())),
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(SqlValue::Integer)
                .map_err(|_| invalid()),
            ColumnKind::Real => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(SqlValue::Real)
                .ok_or_else(invalid),
            ColumnKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(SqlValue::Bool(true)),
                "false" | "0" => Ok(SqlValue::Bool(false)),
                _ => Err(invalid()),
            },
            ColumnKind::Datetime => parse_datetime(trimmed)
                .map(SqlValue::Datetime)
                .ok_or_else(invalid),
            ColumnKind::Json => Ok(serde_json::from_str(trimmed)
                .map(SqlValue::Json)
                .unwrap_or_else(|_| SqlValue::Json(Value::String(raw.to_string())))),
        }
    }

    fn null(&self) -> Result<SqlValue, ValueError> {
        if self.nullable {
            Ok(SqlValue::Null)
        } else {
            Err(ValueError::NotNullable { column: self.name })
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` and bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
