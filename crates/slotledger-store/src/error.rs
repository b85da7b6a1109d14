//! Error taxonomy for the storage layer.
//!
//! Every rejection a caller may want to branch on has its own variant.
//! Raw `sqlx` errors are classified here so that constraint failures raised by
//! `SQLite` itself surface the same way as the ones caught by pre-checks.

use std::fmt;

use slotledger_core::db::DatabaseError;
use sqlx::error::ErrorKind;

use crate::schema::TableSchema;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Records still referencing an entity that was about to be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    /// Dependent entity name, e.g. `Cabinet`.
    pub entity: &'static str,
    /// Foreign-key column on the dependent table.
    pub field: &'static str,
    pub count: i64,
}

impl fmt::Display for Dependent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.count, self.entity, self.field)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique lookup matched nothing (only raised by `*_or_throw`, update and delete).
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Insert or update collided with a unique constraint.
    #[error("Unique constraint `{constraint}` violated on {entity} ({})", .fields.join(", "))]
    ConstraintViolation {
        entity: &'static str,
        constraint: String,
        fields: Vec<String>,
    },

    /// Insert or update referenced a record that does not exist.
    #[error("Foreign key violation on {entity}{}", describe_reference(.field.as_deref(), .references.as_deref()))]
    ForeignKeyViolation {
        entity: &'static str,
        field: Option<String>,
        references: Option<&'static str>,
    },

    /// Delete blocked because other records still reference the target.
    #[error("Cannot delete {entity}: still referenced by {}", describe_dependents(.dependents))]
    ReferentialIntegrityViolation {
        entity: &'static str,
        dependents: Vec<Dependent>,
    },

    /// Input rejected before reaching storage.
    #[error("Validation error: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_field(field: &str, message: impl fmt::Display) -> Self {
        Self::Validation {
            field: Some(field.to_string()),
            message: format!("`{field}` {message}"),
        }
    }

    /// True for the constraint-related variants (unique, foreign key, dependents).
    pub const fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::ConstraintViolation { .. }
                | Self::ForeignKeyViolation { .. }
                | Self::ReferentialIntegrityViolation { .. }
        )
    }
}

fn describe_reference(field: Option<&str>, references: Option<&str>) -> String {
    match (field, references) {
        (Some(field), Some(target)) => format!(": `{field}` references a missing {target}"),
        (Some(field), None) => format!(": `{field}`"),
        _ => String::new(),
    }
}

fn describe_dependents(dependents: &[Dependent]) -> String {
    if dependents.is_empty() {
        return "existing records".to_string();
    }
    dependents
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What the failing statement was doing; decides how a foreign-key failure reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Write,
    Delete,
}

/// Classify a `sqlx` error raised by a statement against `schema`'s table.
pub(crate) fn classify(err: sqlx::Error, schema: &TableSchema, op: Operation) -> StoreError {
    let entity = schema.kind.name();
    let sqlx::Error::Database(db_err) = &err else {
        return StoreError::Query(err);
    };

    match db_err.kind() {
        ErrorKind::UniqueViolation => {
            let fields = unique_columns(db_err.message());
            let constraint = schema
                .unique_constraint_for(&fields)
                .map_or_else(|| fields.join("_"), |c| c.name.to_string());
            StoreError::ConstraintViolation {
                entity,
                constraint,
                fields,
            }
        }
        ErrorKind::ForeignKeyViolation => match op {
            Operation::Write => StoreError::ForeignKeyViolation {
                entity,
                field: None,
                references: None,
            },
            Operation::Delete => StoreError::ReferentialIntegrityViolation {
                entity,
                dependents: Vec::new(),
            },
        },
        ErrorKind::NotNullViolation => StoreError::validation(db_err.message().to_string()),
        _ => StoreError::Query(err),
    }
}

/// Columns named by `SQLite`'s `UNIQUE constraint failed: t.a, t.b` message.
fn unique_columns(message: &str) -> Vec<String> {
    let Some((_, list)) = message.split_once(':') else {
        return Vec::new();
    };
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|qualified| {
            qualified
                .rsplit_once('.')
                .map_or(qualified, |(_, column)| column)
                .to_string()
        })
        .collect()
}
