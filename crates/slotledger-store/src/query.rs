//! Read-side request shapes: listing, ordering, pagination and aggregates.

use std::collections::BTreeMap;

use sqlx::{QueryBuilder, Sqlite};

use crate::error::{Result, StoreError};
use crate::filter::{Filter, lookup};
use crate::schema::TableSchema;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Arguments of `find_many`: filter, sort and offset pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindMany {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
}

impl FindMany {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Add a filter, AND-ed with any filter already present.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    #[must_use]
    pub const fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub(crate) fn check_pagination(&self) -> Result<()> {
        for (name, value) in [("take", self.take), ("skip", self.skip)] {
            if value.is_some_and(|n| n < 0) {
                return Err(StoreError::invalid_field(name, "must not be negative"));
            }
        }
        Ok(())
    }
}

/// Append ` ORDER BY ...`; insertion order breaks ties and is the default.
pub(crate) fn push_order_by(qb: &mut QueryBuilder<'_, Sqlite>, schema: &TableSchema, order_by: &[OrderBy]) -> Result<()> {
    qb.push(" ORDER BY ");
    for order in order_by {
        let column = lookup(schema, &order.field)?;
        qb.push(column.name);
        qb.push(match order.order {
            SortOrder::Asc => " ASC, ",
            SortOrder::Desc => " DESC, ",
        });
    }
    qb.push("rowid ASC");
    Ok(())
}

/// Append ` LIMIT .. OFFSET ..` for whichever bounds are set.
pub(crate) fn push_pagination(qb: &mut QueryBuilder<'_, Sqlite>, take: Option<i64>, skip: Option<i64>) {
    if take.is_none() && skip.is_none() {
        return;
    }
    qb.push(" LIMIT ");
    qb.push_bind(take.unwrap_or(-1));
    qb.push(" OFFSET ");
    qb.push_bind(skip.unwrap_or(0));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AggregateFn {
    Min,
    Max,
    Avg,
    Sum,
}

impl AggregateFn {
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::Sum => "SUM",
        }
    }
}

/// Whole-table (or filtered) aggregate. The row count is always returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateQuery {
    pub filter: Option<Filter>,
    pub fields: Vec<(AggregateFn, String)>,
}

impl AggregateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn min(self, field: impl Into<String>) -> Self {
        self.with(AggregateFn::Min, field)
    }

    #[must_use]
    pub fn max(self, field: impl Into<String>) -> Self {
        self.with(AggregateFn::Max, field)
    }

    #[must_use]
    pub fn avg(self, field: impl Into<String>) -> Self {
        self.with(AggregateFn::Avg, field)
    }

    #[must_use]
    pub fn sum(self, field: impl Into<String>) -> Self {
        self.with(AggregateFn::Sum, field)
    }

    fn with(mut self, function: AggregateFn, field: impl Into<String>) -> Self {
        self.fields.push((function, field.into()));
        self
    }
}

/// `GROUP BY` over one or more fields with per-group count and aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupBy {
    pub by: Vec<String>,
    pub filter: Option<Filter>,
    pub aggregates: Vec<(AggregateFn, String)>,
    /// Only grouping fields may be ordered on.
    pub order_by: Vec<OrderBy>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
}

impl GroupBy {
    pub fn new<S: Into<String>>(by: impl IntoIterator<Item = S>) -> Self {
        Self {
            by: by.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn aggregate(mut self, function: AggregateFn, field: impl Into<String>) -> Self {
        self.aggregates.push((function, field.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    #[must_use]
    pub const fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateValue {
    pub function: AggregateFn,
    pub field: String,
    pub value: Value,
}

/// One aggregate result: the whole selection, or one group of a `group_by`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRow {
    /// Grouping field values; empty for `aggregate`.
    pub group: BTreeMap<String, Value>,
    pub count: i64,
    pub values: Vec<AggregateValue>,
}

impl AggregateRow {
    pub fn get(&self, function: AggregateFn, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|v| v.function == function && v.field == field)
            .map(|v| &v.value)
    }

    pub fn min(&self, field: &str) -> Option<&Value> {
        self.get(AggregateFn::Min, field)
    }

    pub fn max(&self, field: &str) -> Option<&Value> {
        self.get(AggregateFn::Max, field)
    }

    pub fn avg(&self, field: &str) -> Option<&Value> {
        self.get(AggregateFn::Avg, field)
    }

    pub fn sum(&self, field: &str) -> Option<&Value> {
        self.get(AggregateFn::Sum, field)
    }

    pub fn key(&self, field: &str) -> Option<&Value> {
        self.group.get(field)
    }
}
