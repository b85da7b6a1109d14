//! Traits tying a model struct to its table and request DTOs.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::FromRow;
use sqlx::sqlite::SqliteRow;

use crate::error::{Result, StoreError};
use crate::schema::{EntityKind, TableSchema};
use crate::value::Value;

/// A persisted record type.
pub trait Entity:
    for<'r> FromRow<'r, SqliteRow>
    + Serialize
    + DeserializeOwned
    + Clone
    + Debug
    + Send
    + Sync
    + Unpin
    + 'static
{
    const KIND: EntityKind;

    /// Lookup by one of the table's unique constraints.
    type Key: UniqueKey;
    type Create: CreateInput;
    type Update: UpdateInput;

    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Rules spanning several columns, checked on the row as written.
    ///
    /// Runs inside the write's transaction, so an `Err` leaves the store as
    /// it was. Partial updates are caught here even when their payload alone
    /// looks fine.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn schema() -> &'static TableSchema {
        Self::KIND.schema()
    }
}

/// A value of a declared unique constraint (single column or compound).
pub trait UniqueKey: Debug + Send + Sync {
    /// Column/value pairs that must all match.
    fn predicates(&self) -> Vec<(&'static str, Value)>;
}

/// Insert payload.
pub trait CreateInput: Send + Sync {
    /// Domain checks that run before any SQL is issued.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Columns to insert. Omitted defaulted columns take their SQL default.
    fn values(&self) -> Vec<(&'static str, Value)>;
}

/// Partial update payload: only the listed columns change.
pub trait UpdateInput: Send + Sync {
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)>;
}

/// Lookup by primary key; the only unique key of the standalone entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdKey(pub String);

impl UniqueKey for IdKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        vec![("id", Value::Text(self.0.clone()))]
    }
}

impl From<&str> for IdKey {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for IdKey {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// Field checks shared by the DTO `validate` implementations.

pub(crate) fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::invalid_field(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn non_empty_opt(field: &str, value: Option<&str>) -> Result<()> {
    value.map_or(Ok(()), |v| non_empty(field, v))
}

pub(crate) fn in_range(field: &str, value: Option<f64>, low: f64, high: f64) -> Result<()> {
    match value {
        Some(v) if !(low..=high).contains(&v) => Err(StoreError::invalid_field(
            field,
            format_args!("must be between {low} and {high}, got {v}"),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn non_negative(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if v.is_nan() || v < 0.0 => Err(StoreError::invalid_field(
            field,
            format_args!("must not be negative, got {v}"),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn at_least(field: &str, value: Option<i64>, min: i64) -> Result<()> {
    match value {
        Some(v) if v < min => Err(StoreError::invalid_field(
            field,
            format_args!("must be at least {min}, got {v}"),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn ordered_dates(
    issued: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
) -> Result<()> {
    match (issued, expires) {
        (Some(issued), Some(expires)) if expires < issued => Err(StoreError::invalid_field(
            "data_expirare",
            "must not precede data_emitere",
        )),
        _ => Ok(()),
    }
}

/// Push `column = value` for a set optional field.
pub(crate) fn set<T: Into<Value> + Clone>(
    out: &mut Vec<(&'static str, Value)>,
    column: &'static str,
    value: Option<&T>,
) {
    if let Some(value) = value {
        out.push((column, value.clone().into()));
    }
}
