//! `aggregate` and `group_by`.

use std::collections::BTreeMap;

use sqlx::{QueryBuilder, Row, Sqlite};

use crate::entity::Entity;
use crate::error::{Result, StoreError};
use crate::filter::{lookup, push_where};
use crate::query::{
    AggregateFn, AggregateQuery, AggregateRow, AggregateValue, GroupBy, SortOrder,
    push_pagination,
};
use crate::repository::Repository;
use crate::schema::{Column, FieldKind, TableSchema};
use crate::value::Value;

/// A requested aggregate resolved against the catalog.
struct Resolved<'a> {
    function: AggregateFn,
    field: &'a str,
    column: &'static Column,
}

impl Resolved<'_> {
    /// Kind of the aggregate's result.
    const fn result_kind(&self) -> FieldKind {
        match self.function {
            AggregateFn::Avg => FieldKind::Float,
            AggregateFn::Min | AggregateFn::Max | AggregateFn::Sum => self.column.kind,
        }
    }
}

fn resolve<'a>(schema: &TableSchema, fields: &'a [(AggregateFn, String)]) -> Result<Vec<Resolved<'a>>> {
    fields
        .iter()
        .map(|(function, field)| {
            let column = lookup(schema, field)?;
            if matches!(function, AggregateFn::Avg | AggregateFn::Sum) && !column.kind.is_numeric() {
                return Err(StoreError::invalid_field(
                    field,
                    format_args!("cannot be aggregated with {} ({} field)", function.sql(), column.kind),
                ));
            }
            Ok(Resolved {
                function: *function,
                field,
                column,
            })
        })
        .collect()
}

fn push_aggregates(qb: &mut QueryBuilder<'_, Sqlite>, resolved: &[Resolved<'_>]) {
    qb.push("COUNT(*)");
    for aggregate in resolved {
        qb.push(format!(
            ", {}({})",
            aggregate.function.sql(),
            aggregate.column.name
        ));
    }
}

fn decode_values(
    row: &sqlx::sqlite::SqliteRow,
    offset: usize,
    resolved: &[Resolved<'_>],
) -> Result<Vec<AggregateValue>> {
    resolved
        .iter()
        .enumerate()
        .map(|(i, aggregate)| {
            Ok(AggregateValue {
                function: aggregate.function,
                field: aggregate.field.to_string(),
                value: Value::decode(row, offset + i, aggregate.result_kind())?,
            })
        })
        .collect()
}

impl<E: Entity> Repository<'_, E> {
    /// Row count plus the requested aggregates over the filtered records.
    ///
    /// Aggregates over no rows (or only nulls) are [`Value::Null`].
    pub async fn aggregate(&self, query: &AggregateQuery) -> Result<AggregateRow> {
        let schema = E::schema();
        let resolved = resolve(schema, &query.fields)?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        push_aggregates(&mut qb, &resolved);
        qb.push(format!(" FROM {}", schema.table));
        push_where(&mut qb, schema, query.filter.as_ref())?;

        let row = qb.build().fetch_one(self.database().pool()).await?;
        Ok(AggregateRow {
            group: BTreeMap::new(),
            count: row.try_get(0)?,
            values: decode_values(&row, 1, &resolved)?,
        })
    }

    /// One row per distinct combination of `group.by`, ordered by the
    /// grouping fields unless an explicit order is given.
    pub async fn group_by(&self, group: &GroupBy) -> Result<Vec<AggregateRow>> {
        let schema = E::schema();
        if group.by.is_empty() {
            return Err(StoreError::validation("group_by needs at least one field"));
        }
        for (name, value) in [("take", group.take), ("skip", group.skip)] {
            if value.is_some_and(|n| n < 0) {
                return Err(StoreError::invalid_field(name, "must not be negative"));
            }
        }
        let keys = group
            .by
            .iter()
            .map(|field| lookup(schema, field))
            .collect::<Result<Vec<_>>>()?;
        for order in &group.order_by {
            if !group.by.contains(&order.field) {
                return Err(StoreError::invalid_field(
                    &order.field,
                    "can only be ordered on when grouped by",
                ));
            }
        }
        let resolved = resolve(schema, &group.aggregates)?;

        let columns = keys.iter().map(|c| c.name).collect::<Vec<_>>().join(", ");
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {columns}, "));
        push_aggregates(&mut qb, &resolved);
        qb.push(format!(" FROM {}", schema.table));
        push_where(&mut qb, schema, group.filter.as_ref())?;
        qb.push(format!(" GROUP BY {columns} ORDER BY "));
        if group.order_by.is_empty() {
            qb.push(&columns);
        } else {
            let order = group
                .order_by
                .iter()
                .map(|o| match o.order {
                    SortOrder::Asc => format!("{} ASC", o.field),
                    SortOrder::Desc => format!("{} DESC", o.field),
                })
                .collect::<Vec<_>>()
                .join(", ");
            qb.push(order);
        }
        push_pagination(&mut qb, group.take, group.skip);

        let rows = qb.build().fetch_all(self.database().pool()).await?;
        rows.iter()
            .map(|row| {
                let mut key = BTreeMap::new();
                for (i, (field, column)) in group.by.iter().zip(&keys).enumerate() {
                    key.insert(field.clone(), Value::decode(row, i, column.kind)?);
                }
                Ok(AggregateRow {
                    group: key,
                    count: row.try_get(keys.len())?,
                    values: decode_values(row, keys.len() + 1, &resolved)?,
                })
            })
            .collect()
    }
}
