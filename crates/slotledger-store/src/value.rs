//! Dynamically typed column values.
//!
//! Used wherever the column is only known at runtime: filters, DTO field
//! lists, aggregate results and eagerly loaded relation trees.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::schema::FieldKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value may be stored in a column of `kind`.
    ///
    /// Null is accepted here; nullability is checked separately.
    pub const fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _)
                | (Self::Text(_), FieldKind::Text)
                | (Self::Int(_), FieldKind::Int | FieldKind::Float)
                | (Self::Float(_), FieldKind::Float)
                | (Self::DateTime(_), FieldKind::DateTime)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(n) => serde_json::Value::from(*n),
            Self::DateTime(dt) => {
                serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }

    /// Decode column `index` of `row`, interpreting it as `kind`.
    pub(crate) fn decode<I>(row: &SqliteRow, index: I, kind: FieldKind) -> Result<Self, sqlx::Error>
    where
        I: sqlx::ColumnIndex<SqliteRow>,
    {
        let value = match kind {
            FieldKind::Text => row.try_get::<Option<String>, _>(index)?.map(Self::Text),
            FieldKind::Int => row.try_get::<Option<i64>, _>(index)?.map(Self::Int),
            FieldKind::Float => row.try_get::<Option<f64>, _>(index)?.map(Self::Float),
            FieldKind::DateTime => row
                .try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(Self::DateTime),
        };
        Ok(value.unwrap_or(Self::Null))
    }
}

/// Bind `value` as a parameter destined for a column of `kind`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn push_bind(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value, kind: FieldKind) {
    match (value, kind) {
        (Value::Null, _) => {
            qb.push_bind(Option::<String>::None);
        }
        (Value::Text(s), _) => {
            qb.push_bind(s.clone());
        }
        (Value::Int(n), FieldKind::Float) => {
            qb.push_bind(*n as f64);
        }
        (Value::Int(n), _) => {
            qb.push_bind(*n);
        }
        (Value::Float(n), _) => {
            qb.push_bind(*n);
        }
        (Value::DateTime(dt), _) => {
            qb.push_bind(*dt);
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
