//! Typed CRUD over one entity's table.
//!
//! A [`Repository`] is a cheap handle borrowed from [`Database`]. Every write
//! runs in its own transaction: foreign keys are checked against their target
//! tables first so the error can name the offending field, then the statement
//! runs and any constraint `SQLite` still raises is classified.

use std::marker::PhantomData;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, warn};

use crate::db::Database;
use crate::entity::{CreateInput, Entity, UniqueKey, UpdateInput};
use crate::error::{Dependent, Operation, Result, StoreError, classify};
use crate::filter::{Filter, lookup, push_where};
use crate::query::{FindMany, push_order_by, push_pagination};
use crate::schema::TableSchema;
use crate::value::{Value, push_bind};

pub struct Repository<'db, E> {
    db: &'db Database,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Repository<'_, E> {}

impl<'db, E: Entity> Repository<'db, E> {
    pub(crate) const fn new(db: &'db Database) -> Self {
        Self {
            db,
            entity: PhantomData,
        }
    }

    pub(crate) const fn database(&self) -> &'db Database {
        self.db
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find_by_id(&self, id: &str) -> Result<Option<E>> {
        let mut qb = select(E::schema());
        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());
        Ok(qb.build_query_as::<E>().fetch_optional(self.db.pool()).await?)
    }

    /// Look up by a declared unique constraint. No match is `Ok(None)`.
    pub async fn find_unique(&self, key: &E::Key) -> Result<Option<E>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_by_key::<E>(&mut conn, &key.predicates()).await
    }

    /// Like [`Self::find_unique`], but no match is [`StoreError::NotFound`].
    pub async fn find_unique_or_throw(&self, key: &E::Key) -> Result<E> {
        let predicates = key.predicates();
        let mut conn = self.db.pool().acquire().await?;
        fetch_by_key::<E>(&mut conn, &predicates)
            .await?
            .ok_or_else(|| not_found::<E>(&predicates))
    }

    /// First record of `query`'s ordering, honouring `skip`.
    pub async fn find_first(&self, query: &FindMany) -> Result<Option<E>> {
        query.check_pagination()?;
        let take = query.take.map_or(1, |take| take.min(1));
        let schema = E::schema();
        let mut qb = select(schema);
        push_where(&mut qb, schema, query.filter.as_ref())?;
        push_order_by(&mut qb, schema, &query.order_by)?;
        push_pagination(&mut qb, Some(take), query.skip);
        Ok(qb.build_query_as::<E>().fetch_optional(self.db.pool()).await?)
    }

    pub async fn find_first_or_throw(&self, query: &FindMany) -> Result<E> {
        self.find_first(query).await?.ok_or_else(|| StoreError::NotFound {
            entity: E::KIND.name(),
            key: query
                .filter
                .as_ref()
                .map_or_else(|| "any record".to_string(), |f| format!("{f:?}")),
        })
    }

    /// Records matching `query`, in its ordering (insertion order by default).
    pub async fn find_many(&self, query: &FindMany) -> Result<Vec<E>> {
        query.check_pagination()?;
        let schema = E::schema();
        let mut qb = select(schema);
        push_where(&mut qb, schema, query.filter.as_ref())?;
        push_order_by(&mut qb, schema, &query.order_by)?;
        push_pagination(&mut qb, query.take, query.skip);
        Ok(qb.build_query_as::<E>().fetch_all(self.db.pool()).await?)
    }

    pub async fn count(&self, filter: Option<&Filter>) -> Result<i64> {
        let schema = E::schema();
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", schema.table));
        push_where(&mut qb, schema, filter)?;
        Ok(qb.build_query_scalar::<i64>().fetch_one(self.db.pool()).await?)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a record. `id`, `created_at` and `updated_at` are assigned here.
    pub async fn create(&self, input: &E::Create) -> Result<E> {
        input.validate()?;
        let mut tx = self.db.pool().begin().await?;
        let record = insert_row::<E>(&mut tx, &input.values(), false)
            .await?
            .ok_or_else(|| StoreError::validation("insert returned no row"))?;
        tx.commit().await?;

        debug!(entity = %E::KIND, id = record.id(), "Record created");
        Ok(record)
    }

    /// Apply a partial update to the record matching `key`.
    ///
    /// `updated_at` always advances, even when no column changes.
    pub async fn update(&self, key: &E::Key, input: &E::Update) -> Result<E> {
        input.validate()?;
        let predicates = key.predicates();
        let mut tx = self.db.pool().begin().await?;
        let current = fetch_by_key::<E>(&mut tx, &predicates)
            .await?
            .ok_or_else(|| not_found::<E>(&predicates))?;
        let record = update_row::<E>(&mut tx, &current, &input.assignments()).await?;
        tx.commit().await?;

        debug!(entity = %E::KIND, id = record.id(), "Record updated");
        Ok(record)
    }

    /// Update the record matching `key`, or insert `create` when there is none.
    pub async fn upsert(&self, key: &E::Key, create: &E::Create, update: &E::Update) -> Result<E> {
        let predicates = key.predicates();
        let mut tx = self.db.pool().begin().await?;
        let record = match fetch_by_key::<E>(&mut tx, &predicates).await? {
            Some(current) => {
                update.validate()?;
                update_row::<E>(&mut tx, &current, &update.assignments()).await?
            }
            None => {
                create.validate()?;
                insert_row::<E>(&mut tx, &create.values(), false)
                    .await?
                    .ok_or_else(|| StoreError::validation("insert returned no row"))?
            }
        };
        tx.commit().await?;

        debug!(entity = %E::KIND, id = record.id(), "Record upserted");
        Ok(record)
    }

    /// Delete the record matching `key` and return it.
    ///
    /// Rejected with [`StoreError::ReferentialIntegrityViolation`] while any
    /// other record references it.
    pub async fn delete(&self, key: &E::Key) -> Result<E> {
        let schema = E::schema();
        let predicates = key.predicates();
        let mut tx = self.db.pool().begin().await?;
        let record = fetch_by_key::<E>(&mut tx, &predicates)
            .await?
            .ok_or_else(|| not_found::<E>(&predicates))?;

        let dependents = count_dependents(&mut tx, schema, Selection::Id(record.id())).await?;
        if !dependents.is_empty() {
            warn!(entity = %E::KIND, id = record.id(), "Delete rejected: record still referenced");
            return Err(StoreError::ReferentialIntegrityViolation {
                entity: E::KIND.name(),
                dependents,
            });
        }

        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", schema.table))
            .bind(record.id())
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, schema, Operation::Delete))?;
        tx.commit().await?;

        debug!(entity = %E::KIND, id = record.id(), "Record deleted");
        Ok(record)
    }
}

// =============================================================================
// Connection-level helpers shared with batch and relation loading
// =============================================================================

/// Which rows of a table an operation targets.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Selection<'a> {
    Id(&'a str),
    Filter(Option<&'a Filter>),
}

pub(crate) fn select(schema: &TableSchema) -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(format!("SELECT * FROM {}", schema.table))
}

fn not_found<E: Entity>(predicates: &[(&'static str, Value)]) -> StoreError {
    let key = predicates
        .iter()
        .map(|(column, value)| format!("{column}={}", value.to_json()))
        .collect::<Vec<_>>()
        .join(", ");
    StoreError::NotFound {
        entity: E::KIND.name(),
        key,
    }
}

async fn fetch_by_key<E: Entity>(
    conn: &mut SqliteConnection,
    predicates: &[(&'static str, Value)],
) -> Result<Option<E>> {
    let schema = E::schema();
    if predicates.is_empty() {
        return Err(StoreError::validation("unique key has no fields"));
    }
    let mut qb = select(schema);
    qb.push(" WHERE ");
    for (i, (field, value)) in predicates.iter().enumerate() {
        let column = lookup(schema, field)?;
        if i > 0 {
            qb.push(" AND ");
        }
        qb.push(column.name);
        qb.push(" = ");
        push_bind(&mut qb, value, column.kind);
    }
    Ok(qb.build_query_as::<E>().fetch_optional(&mut *conn).await?)
}

/// Reject values that reference a missing row, naming the field.
pub(crate) async fn check_references(
    conn: &mut SqliteConnection,
    schema: &TableSchema,
    values: &[(&'static str, Value)],
) -> Result<()> {
    for (column, value) in values {
        let Some(fk) = schema.foreign_key(column) else {
            continue;
        };
        let Some(id) = value.as_str() else {
            continue;
        };
        let target = fk.references.schema();
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)",
            target.table
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(StoreError::ForeignKeyViolation {
                entity: schema.kind.name(),
                field: Some(fk.column.to_string()),
                references: Some(fk.references.name()),
            });
        }
    }
    Ok(())
}

/// Count rows of every table that reference the selected rows.
pub(crate) async fn count_dependents(
    conn: &mut SqliteConnection,
    schema: &TableSchema,
    selection: Selection<'_>,
) -> Result<Vec<Dependent>> {
    let mut dependents = Vec::new();
    for (child, fk) in schema.dependents() {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COUNT(*) FROM {} WHERE {} ",
            child.table, fk.column
        ));
        match selection {
            Selection::Id(id) => {
                qb.push("= ");
                qb.push_bind(id.to_string());
            }
            Selection::Filter(filter) => {
                qb.push(format!("IN (SELECT id FROM {}", schema.table));
                push_where(&mut qb, schema, filter)?;
                qb.push(")");
            }
        }
        let count = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
        if count > 0 {
            dependents.push(Dependent {
                entity: child.kind.name(),
                field: fk.column,
                count,
            });
        }
    }
    Ok(dependents)
}

/// Type-check written values against the catalog.
pub(crate) fn check_columns(schema: &TableSchema, values: &[(&'static str, Value)]) -> Result<()> {
    for (field, value) in values {
        let column = lookup(schema, field)?;
        if matches!(column.name, "id" | "created_at" | "updated_at") {
            return Err(StoreError::invalid_field(field, "is assigned by the store"));
        }
        if !value.fits(column.kind) {
            return Err(StoreError::invalid_field(
                field,
                format_args!("expects a {} value", column.kind),
            ));
        }
        if value.is_null() && !column.nullable {
            return Err(StoreError::invalid_field(field, "must not be null"));
        }
    }
    Ok(())
}

/// Insert one row. With `skip_duplicates`, a unique collision yields `Ok(None)`.
pub(crate) async fn insert_row<E: Entity>(
    conn: &mut SqliteConnection,
    values: &[(&'static str, Value)],
    skip_duplicates: bool,
) -> Result<Option<E>> {
    let schema = E::schema();
    check_columns(schema, values)?;
    check_references(conn, schema, values).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = slotledger_core::db::now();

    let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (id", schema.table));
    for (column, _) in values {
        qb.push(", ");
        qb.push(*column);
    }
    qb.push(", created_at, updated_at) VALUES (");
    qb.push_bind(id);
    for (column, value) in values {
        qb.push(", ");
        push_bind(&mut qb, value, lookup(schema, column)?.kind);
    }
    qb.push(", ");
    qb.push_bind(now);
    qb.push(", ");
    qb.push_bind(now);
    qb.push(")");
    if skip_duplicates {
        qb.push(" ON CONFLICT DO NOTHING");
    }
    qb.push(" RETURNING *");

    let record = qb
        .build_query_as::<E>()
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| classify(e, schema, Operation::Write))?;
    if let Some(record) = &record {
        record.check()?;
    }
    Ok(record)
}

/// Apply `assignments` to `current` and return the updated row.
///
/// The caller's transaction must be dropped uncommitted when this fails.
pub(crate) async fn update_row<E: Entity>(
    conn: &mut SqliteConnection,
    current: &E,
    assignments: &[(&'static str, Value)],
) -> Result<E> {
    let schema = E::schema();
    check_columns(schema, assignments)?;
    check_references(conn, schema, assignments).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", schema.table));
    push_assignments(&mut qb, schema, assignments)?;
    qb.push_bind(slotledger_core::db::next_timestamp(current.updated_at()));
    qb.push(" WHERE id = ");
    qb.push_bind(current.id().to_string());
    qb.push(" RETURNING *");

    let record = qb
        .build_query_as::<E>()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| classify(e, schema, Operation::Write))?;
    record.check()?;
    Ok(record)
}

/// Append `a = ?, b = ?, updated_at = `; the caller binds the timestamp.
pub(crate) fn push_assignments(
    qb: &mut QueryBuilder<'_, Sqlite>,
    schema: &TableSchema,
    assignments: &[(&'static str, Value)],
) -> Result<()> {
    for (field, value) in assignments {
        let column = lookup(schema, field)?;
        qb.push(column.name);
        qb.push(" = ");
        push_bind(qb, value, column.kind);
        qb.push(", ");
    }
    qb.push("updated_at = ");
    Ok(())
}
