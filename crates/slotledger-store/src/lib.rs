//! `Slotledger` storage.
//!
//! Equipment and compliance registry on `SQLite`: providers, cabinets, game
//! mixes, slot machines, locations, invoices, metrology records, companies,
//! platforms and users.
//!
//! - [`schema`]: static catalog mirroring the migrations
//! - [`Database`]: pool, migrations and one [`Repository`] per entity
//! - [`Filter`], [`FindMany`], [`AggregateQuery`], [`GroupBy`]: query inputs
//! - [`relations`]: lazy typed relations and nested [`Include`] loading
//!
//! Uniqueness and foreign keys are enforced by `SQLite`; deletes are rejected
//! while any other record references the target.

mod aggregate;
mod batch;
pub mod db;
pub mod entity;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod relations;
pub mod repository;
pub mod schema;
pub mod value;

#[cfg(test)]
mod tests;

pub use db::{Database, DatabaseError};
pub use entity::{CreateInput, Entity, IdKey, UniqueKey, UpdateInput};
pub use error::{Dependent, Result, StoreError};
pub use filter::{Condition, Filter, QueryMode};
pub use models::*;
pub use query::{
    AggregateFn, AggregateQuery, AggregateRow, AggregateValue, FindMany, GroupBy, OrderBy,
    SortOrder,
};
pub use relations::{BelongsTo, HasMany, Include, Loaded, Node, Related};
pub use repository::Repository;
pub use schema::{EntityKind, FieldKind, Relation, TableSchema};
pub use value::Value;
