//! Bulk writes. Each call is one transaction: it applies fully or not at all.

use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, warn};

use crate::entity::{CreateInput, Entity, UpdateInput};
use crate::error::{Operation, Result, StoreError, classify};
use crate::filter::{Filter, push_where};
use crate::repository::{
    Repository, Selection, check_columns, check_references, count_dependents, insert_row,
    push_assignments,
};

impl<E: Entity> Repository<'_, E> {
    /// Insert every record and return how many were written.
    ///
    /// With `skip_duplicates`, records colliding with a unique constraint
    /// (stored or earlier in the batch) are skipped. Any other failure rolls
    /// back the whole batch.
    pub async fn create_many(&self, inputs: &[E::Create], skip_duplicates: bool) -> Result<u64> {
        for input in inputs {
            input.validate()?;
        }

        let mut tx = self.database().pool().begin().await?;
        let mut inserted = 0u64;
        for input in inputs {
            if insert_row::<E>(&mut tx, &input.values(), skip_duplicates)
                .await?
                .is_some()
            {
                inserted += 1;
            }
        }
        tx.commit().await?;

        debug!(
            entity = %E::KIND,
            requested = inputs.len(),
            inserted,
            "Batch created"
        );
        Ok(inserted)
    }

    /// Apply `input` to every record matching `filter` (all records when `None`).
    pub async fn update_many(&self, filter: Option<&Filter>, input: &E::Update) -> Result<u64> {
        input.validate()?;
        let schema = E::schema();
        let assignments = input.assignments();
        check_columns(schema, &assignments)?;

        let mut tx = self.database().pool().begin().await?;
        check_references(&mut tx, schema, &assignments).await?;

        // One timestamp for the whole batch, later than every row it touches.
        let mut latest = QueryBuilder::<Sqlite>::new(format!(
            "SELECT MAX(updated_at) FROM {}",
            schema.table
        ));
        push_where(&mut latest, schema, filter)?;
        let previous = latest
            .build_query_scalar::<Option<chrono::DateTime<chrono::Utc>>>()
            .fetch_one(&mut *tx)
            .await?;
        let Some(previous) = previous else {
            return Ok(0);
        };

        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", schema.table));
        push_assignments(&mut qb, schema, &assignments)?;
        qb.push_bind(slotledger_core::db::next_timestamp(previous));
        push_where(&mut qb, schema, filter)?;
        qb.push(" RETURNING *");
        let updated = qb
            .build_query_as::<E>()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| classify(e, schema, Operation::Write))?;
        for record in &updated {
            record.check()?;
        }
        tx.commit().await?;

        let affected = updated.len() as u64;
        debug!(entity = %E::KIND, affected, "Batch updated");
        Ok(affected)
    }

    /// Delete every record matching `filter` (all records when `None`).
    ///
    /// Nothing is deleted when any selected record is still referenced.
    pub async fn delete_many(&self, filter: Option<&Filter>) -> Result<u64> {
        let schema = E::schema();
        if let Some(filter) = filter {
            filter.validate(schema)?;
        }

        let mut tx = self.database().pool().begin().await?;
        let dependents = count_dependents(&mut tx, schema, Selection::Filter(filter)).await?;
        if !dependents.is_empty() {
            warn!(entity = %E::KIND, "Batch delete rejected: records still referenced");
            return Err(StoreError::ReferentialIntegrityViolation {
                entity: E::KIND.name(),
                dependents,
            });
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", schema.table));
        push_where(&mut qb, schema, filter)?;
        let affected = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, schema, Operation::Delete))?
            .rows_affected();
        tx.commit().await?;

        debug!(entity = %E::KIND, affected, "Batch deleted");
        Ok(affected)
    }
}
