//! Generic filter expressions: field → operator → value.
//!
//! A [`Filter`] is checked against the [`TableSchema`] while it is rendered,
//! so an unknown field or a mistyped operand is a validation error and never
//! reaches `SQLite`. Column names written into SQL always come from the
//! static catalog, never from the caller's string.

use sqlx::{QueryBuilder, Sqlite};

use crate::error::{Result, StoreError};
use crate::schema::{Column, FieldKind, TableSchema};
use crate::value::{Value, push_bind};

/// String comparison mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// Case-sensitive.
    #[default]
    Default,
    /// ASCII case-insensitive.
    Insensitive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    NotEquals(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Field {
        field: String,
        condition: Condition,
        mode: QueryMode,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Self::Field {
            field: field.into(),
            condition,
            mode: QueryMode::Default,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Equals(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::NotEquals(value.into()))
    }

    pub fn in_list<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(field, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(field, Condition::NotIn(values.into_iter().map(Into::into).collect()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Lt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Lte(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Gt(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Gte(value.into()))
    }

    /// Inclusive range.
    pub fn between(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        let field = field.into();
        Self::And(vec![Self::gte(field.clone(), low), Self::lte(field, high)])
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::field(field, Condition::Contains(needle.into()))
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::field(field, Condition::StartsWith(prefix.into()))
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::field(field, Condition::EndsWith(suffix.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::field(field, Condition::IsNull)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::field(field, Condition::IsNotNull)
    }

    pub fn negate(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Switch a field filter to case-insensitive comparison.
    #[must_use]
    pub fn insensitive(self) -> Self {
        match self {
            Self::Field {
                field, condition, ..
            } => Self::Field {
                field,
                condition,
                mode: QueryMode::Insensitive,
            },
            other => other,
        }
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut any) => {
                any.push(other);
                Self::Or(any)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Check the filter against `schema` without building any SQL.
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        let mut qb = QueryBuilder::<Sqlite>::new("");
        push_filter(&mut qb, schema, self)
    }
}

/// Append `filter` as a boolean SQL expression.
pub(crate) fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, schema: &TableSchema, filter: &Filter) -> Result<()> {
    match filter {
        Filter::Field {
            field,
            condition,
            mode,
        } => {
            let column = lookup(schema, field)?;
            push_condition(qb, column, condition, *mode)
        }
        Filter::And(all) => push_group(qb, schema, all, " AND ", "1 = 1"),
        Filter::Or(any) => push_group(qb, schema, any, " OR ", "1 = 0"),
        Filter::Not(inner) => {
            qb.push("NOT (");
            push_filter(qb, schema, inner)?;
            qb.push(")");
            Ok(())
        }
    }
}

/// Append ` WHERE <filter>` when a filter is present.
pub(crate) fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, schema: &TableSchema, filter: Option<&Filter>) -> Result<()> {
    if let Some(filter) = filter {
        qb.push(" WHERE ");
        push_filter(qb, schema, filter)?;
    }
    Ok(())
}

pub(crate) fn lookup(schema: &TableSchema, field: &str) -> Result<&'static Column> {
    schema.column(field).ok_or_else(|| {
        StoreError::invalid_field(field, format_args!("is not a field of {}", schema.kind))
    })
}

fn push_group(
    qb: &mut QueryBuilder<'_, Sqlite>,
    schema: &TableSchema,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) -> Result<()> {
    if filters.is_empty() {
        qb.push(empty);
        return Ok(());
    }
    qb.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_filter(qb, schema, filter)?;
    }
    qb.push(")");
    Ok(())
}

fn check_operand(column: &Column, value: &Value) -> Result<()> {
    if value.is_null() {
        return Err(StoreError::invalid_field(
            column.name,
            "cannot be compared with null; use a null check",
        ));
    }
    if !value.fits(column.kind) {
        return Err(StoreError::invalid_field(
            column.name,
            format_args!("is a {} field, got {value:?}", column.kind),
        ));
    }
    Ok(())
}

fn check_nullable(column: &Column) -> Result<()> {
    if column.nullable {
        Ok(())
    } else {
        Err(StoreError::invalid_field(column.name, "is not nullable"))
    }
}

fn push_column(qb: &mut QueryBuilder<'_, Sqlite>, column: &Column, mode: QueryMode) {
    match mode {
        QueryMode::Default => qb.push(column.name),
        QueryMode::Insensitive => qb.push("LOWER(").push(column.name).push(")"),
    };
}

fn push_operand(qb: &mut QueryBuilder<'_, Sqlite>, column: &Column, value: &Value, mode: QueryMode) {
    match mode {
        QueryMode::Default => push_bind(qb, value, column.kind),
        QueryMode::Insensitive => {
            qb.push("LOWER(");
            push_bind(qb, value, column.kind);
            qb.push(")");
        }
    }
}

fn push_comparison(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &Column,
    operator: &str,
    value: &Value,
    mode: QueryMode,
) -> Result<()> {
    check_operand(column, value)?;
    push_column(qb, column, mode);
    qb.push(operator);
    push_operand(qb, column, value, mode);
    Ok(())
}

fn push_list(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &Column,
    values: &[Value],
    negated: bool,
    mode: QueryMode,
) -> Result<()> {
    for value in values {
        check_operand(column, value)?;
    }
    if values.is_empty() {
        qb.push(if negated { "1 = 1" } else { "1 = 0" });
        return Ok(());
    }
    push_column(qb, column, mode);
    qb.push(if negated { " NOT IN (" } else { " IN (" });
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_operand(qb, column, value, mode);
    }
    qb.push(")");
    Ok(())
}

fn push_text_match(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &Column,
    condition: &Condition,
    needle: &str,
    mode: QueryMode,
) -> Result<()> {
    if column.kind != FieldKind::Text {
        return Err(StoreError::invalid_field(
            column.name,
            format_args!("is a {} field; string matching needs text", column.kind),
        ));
    }
    let needle = Value::Text(needle.to_string());
    match condition {
        Condition::Contains(_) | Condition::StartsWith(_) => {
            qb.push("instr(");
            push_column(qb, column, mode);
            qb.push(", ");
            push_operand(qb, column, &needle, mode);
            qb.push(if matches!(condition, Condition::Contains(_)) {
                ") > 0"
            } else {
                ") = 1"
            });
        }
        _ => {
            if needle.as_str().is_some_and(str::is_empty) {
                qb.push(column.name).push(" IS NOT NULL");
                return Ok(());
            }
            qb.push("substr(");
            push_column(qb, column, mode);
            qb.push(", -length(");
            push_bind(qb, &needle, column.kind);
            qb.push(")) = ");
            push_operand(qb, column, &needle, mode);
        }
    }
    Ok(())
}

fn push_condition(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &Column,
    condition: &Condition,
    mode: QueryMode,
) -> Result<()> {
    if mode == QueryMode::Insensitive && column.kind != FieldKind::Text {
        return Err(StoreError::invalid_field(
            column.name,
            "only text fields support case-insensitive mode",
        ));
    }

    match condition {
        Condition::Equals(Value::Null) | Condition::IsNull => {
            check_nullable(column)?;
            qb.push(column.name).push(" IS NULL");
            Ok(())
        }
        Condition::NotEquals(Value::Null) | Condition::IsNotNull => {
            check_nullable(column)?;
            qb.push(column.name).push(" IS NOT NULL");
            Ok(())
        }
        Condition::Equals(value) => push_comparison(qb, column, " = ", value, mode),
        Condition::NotEquals(value) => push_comparison(qb, column, " <> ", value, mode),
        Condition::Lt(value) => push_comparison(qb, column, " < ", value, mode),
        Condition::Lte(value) => push_comparison(qb, column, " <= ", value, mode),
        Condition::Gt(value) => push_comparison(qb, column, " > ", value, mode),
        Condition::Gte(value) => push_comparison(qb, column, " >= ", value, mode),
        Condition::In(values) => push_list(qb, column, values, false, mode),
        Condition::NotIn(values) => push_list(qb, column, values, true, mode),
        Condition::Contains(needle) | Condition::StartsWith(needle) | Condition::EndsWith(needle) => {
            push_text_match(qb, column, condition, needle, mode)
        }
    }
}
