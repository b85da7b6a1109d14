//! Relationship traversal.
//!
//! Two ways in:
//!
//! - Lazy and typed: models expose [`HasMany`] / [`BelongsTo`] constants that
//!   [`Database::fetch_many`] and [`Database::fetch_one`] follow one hop at a
//!   time.
//! - Eager and nested: [`Include`] trees name relations from the catalog and
//!   are resolved level by level with one query per relation (chunked `IN`
//!   lists), never one query per parent. Loaded relatives come back as
//!   [`Node`]s keyed by relation name.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;

use crate::db::Database;
use crate::entity::Entity;
use crate::error::{Result, StoreError};
use crate::filter::{Filter, push_where};
use crate::query::{FindMany, push_order_by};
use crate::repository::{Repository, select};
use crate::schema::{Relation, TableSchema};
use crate::value::Value;

/// Parent ids per `IN (...)` list, under `SQLite`'s bound-parameter limit.
const IN_CHUNK: usize = 500;

// =============================================================================
// Typed, lazy relations
// =============================================================================

/// One-to-many: children of `C` point at a `P` through `foreign_key`.
pub struct HasMany<P, C> {
    foreign_key: &'static str,
    marker: PhantomData<fn() -> (P, C)>,
}

impl<P, C> HasMany<P, C> {
    pub const fn new(foreign_key: &'static str) -> Self {
        Self {
            foreign_key,
            marker: PhantomData,
        }
    }

    pub const fn foreign_key(&self) -> &'static str {
        self.foreign_key
    }
}

impl<P, C> Clone for HasMany<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for HasMany<P, C> {}

/// Many-to-one: a `C` holds the id of its `P` in `foreign_key`.
pub struct BelongsTo<C, P> {
    foreign_key: &'static str,
    key: fn(&C) -> Option<&str>,
    marker: PhantomData<fn() -> P>,
}

impl<C, P> BelongsTo<C, P> {
    pub const fn new(foreign_key: &'static str, key: fn(&C) -> Option<&str>) -> Self {
        Self {
            foreign_key,
            key,
            marker: PhantomData,
        }
    }

    pub const fn foreign_key(&self) -> &'static str {
        self.foreign_key
    }
}

impl<C, P> Clone for BelongsTo<C, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, P> Copy for BelongsTo<C, P> {}

impl Database {
    /// Children of `parent` along `relation`, filtered, ordered and paginated by `query`.
    pub async fn fetch_many<P: Entity, C: Entity>(
        &self,
        parent: &P,
        relation: HasMany<P, C>,
        query: &FindMany,
    ) -> Result<Vec<C>> {
        let scoped = query
            .clone()
            .filter(Filter::eq(relation.foreign_key, parent.id()));
        self.repo::<C>().find_many(&scoped).await
    }

    /// The record `child` points at, or `None` when the link is unset.
    pub async fn fetch_one<C: Entity, P: Entity>(
        &self,
        child: &C,
        relation: BelongsTo<C, P>,
    ) -> Result<Option<P>> {
        match (relation.key)(child) {
            Some(id) => self.repo::<P>().find_by_id(id).await,
            None => Ok(None),
        }
    }
}

// =============================================================================
// Nested includes
// =============================================================================

/// A relation to load eagerly, with its own query and nested includes.
///
/// For one-to-many relations `query` applies per parent record. To-one
/// relations take no query arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Include {
    pub relation: String,
    pub query: FindMany,
    pub nested: Vec<Include>,
}

impl Include {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn query(mut self, query: FindMany) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn include(mut self, nested: Self) -> Self {
        self.nested.push(nested);
        self
    }
}

/// Loaded relatives under one relation name.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Box<Node>>),
    Many(Vec<Node>),
}

/// An untyped record with its loaded relations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub record: serde_json::Map<String, serde_json::Value>,
    pub relations: BTreeMap<String, Related>,
}

impl Node {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.record.get(field)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(serde_json::Value::as_str)
    }

    /// Decode the record into its model type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            self.record.clone(),
        ))?)
    }

    pub fn many(&self, relation: &str) -> &[Self] {
        many(&self.relations, relation)
    }

    pub fn one(&self, relation: &str) -> Option<&Self> {
        one(&self.relations, relation)
    }

    fn from_record<E: Entity>(record: &E) -> Result<Self> {
        match serde_json::to_value(record)? {
            serde_json::Value::Object(record) => Ok(Self {
                record,
                relations: BTreeMap::new(),
            }),
            _ => Err(StoreError::validation(format!(
                "{} does not serialize to an object",
                E::KIND
            ))),
        }
    }

    fn from_row(schema: &TableSchema, row: &SqliteRow) -> Result<Self> {
        let mut record = serde_json::Map::new();
        for column in schema.columns {
            let value = Value::decode(row, column.name, column.kind)?;
            record.insert(column.name.to_string(), value.to_json());
        }
        Ok(Self {
            record,
            relations: BTreeMap::new(),
        })
    }
}

/// A typed record with its loaded relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<E> {
    pub record: E,
    pub relations: BTreeMap<String, Related>,
}

impl<E> Loaded<E> {
    /// Children loaded under `relation`; empty when it was not included.
    pub fn many(&self, relation: &str) -> &[Node] {
        many(&self.relations, relation)
    }

    /// Target loaded under `relation`; `None` when unset or not included.
    pub fn one(&self, relation: &str) -> Option<&Node> {
        one(&self.relations, relation)
    }
}

fn many<'a>(relations: &'a BTreeMap<String, Related>, name: &str) -> &'a [Node] {
    match relations.get(name) {
        Some(Related::Many(nodes)) => nodes,
        _ => &[],
    }
}

fn one<'a>(relations: &'a BTreeMap<String, Related>, name: &str) -> Option<&'a Node> {
    match relations.get(name) {
        Some(Related::One(node)) => node.as_deref(),
        _ => None,
    }
}

impl<E: Entity> Repository<'_, E> {
    /// [`Self::find_many`] plus the requested relations of every record.
    pub async fn find_many_with(&self, query: &FindMany, includes: &[Include]) -> Result<Vec<Loaded<E>>> {
        let records = self.find_many(query).await?;
        self.load_all(records, includes).await
    }

    /// Load the requested relations of a single record.
    pub async fn load(&self, record: &E, includes: &[Include]) -> Result<Loaded<E>> {
        let mut loaded = self.load_all(vec![record.clone()], includes).await?;
        loaded
            .pop()
            .ok_or_else(|| StoreError::validation("relation load returned no record"))
    }

    async fn load_all(&self, records: Vec<E>, includes: &[Include]) -> Result<Vec<Loaded<E>>> {
        let mut nodes = records
            .iter()
            .map(Node::from_record)
            .collect::<Result<Vec<_>>>()?;
        attach(self.database().pool(), E::schema(), &mut nodes, includes).await?;
        Ok(records
            .into_iter()
            .zip(nodes)
            .map(|(record, node)| Loaded {
                record,
                relations: node.relations,
            })
            .collect())
    }
}

/// Resolve `includes` for every node of `schema`'s table, recursing into nested includes.
fn attach<'a>(
    pool: &'a SqlitePool,
    schema: &'static TableSchema,
    nodes: &'a mut [Node],
    includes: &'a [Include],
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        for include in includes {
            let relation = schema.relation(&include.relation).ok_or_else(|| {
                StoreError::validation(format!(
                    "`{}` is not a relation of {}",
                    include.relation, schema.kind
                ))
            })?;
            match relation {
                Relation::ToMany {
                    name,
                    foreign_key,
                    child,
                } => {
                    include.query.check_pagination()?;
                    let parent_ids = distinct(nodes.iter().filter_map(Node::id));
                    let mut children =
                        load_children(pool, child, foreign_key.column, &parent_ids, &include.query)
                            .await?;
                    attach(pool, child, &mut children, &include.nested).await?;

                    let mut by_parent: BTreeMap<String, Vec<Node>> = BTreeMap::new();
                    for node in children {
                        if let Some(parent) = text(&node, foreign_key.column) {
                            by_parent.entry(parent).or_default().push(node);
                        }
                    }
                    for node in nodes.iter_mut() {
                        let siblings = node
                            .id()
                            .and_then(|id| by_parent.get(id))
                            .map(|all| page(all, include.query.skip, include.query.take))
                            .unwrap_or_default();
                        node.relations
                            .insert(name.to_string(), Related::Many(siblings));
                    }
                }
                Relation::ToOne {
                    name,
                    foreign_key,
                    target,
                } => {
                    if include.query != FindMany::default() {
                        return Err(StoreError::validation(format!(
                            "to-one relation `{name}` takes no query arguments"
                        )));
                    }
                    let ids = distinct(
                        nodes
                            .iter()
                            .filter_map(|n| n.get(foreign_key.column)?.as_str()),
                    );
                    let mut targets = load_children(pool, target, "id", &ids, &FindMany::default()).await?;
                    attach(pool, target, &mut targets, &include.nested).await?;

                    let by_id: BTreeMap<String, Node> = targets
                        .into_iter()
                        .filter_map(|n| Some((n.id()?.to_string(), n)))
                        .collect();
                    for node in nodes.iter_mut() {
                        let related = text(node, foreign_key.column)
                            .and_then(|id| by_id.get(&id).cloned())
                            .map(Box::new);
                        node.relations.insert(name.to_string(), Related::One(related));
                    }
                }
            }
        }
        Ok(())
    })
}

fn text(node: &Node, field: &str) -> Option<String> {
    node.get(field)?.as_str().map(str::to_string)
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    ids.map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per-parent slice of an already ordered sibling list.
fn page(all: &[Node], skip: Option<i64>, take: Option<i64>) -> Vec<Node> {
    let skip = skip.and_then(|n| usize::try_from(n).ok()).unwrap_or(0);
    let take = take.and_then(|n| usize::try_from(n).ok()).unwrap_or(usize::MAX);
    all.iter().skip(skip).take(take).cloned().collect()
}

/// Rows of `schema` whose `column` is one of `keys` and that match `query`'s
/// filter, in `query`'s order. Pagination is left to the caller.
async fn load_children(
    pool: &SqlitePool,
    schema: &'static TableSchema,
    column: &'static str,
    keys: &[String],
    query: &FindMany,
) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for chunk in keys.chunks(IN_CHUNK) {
        let scope = Filter::in_list(column, chunk.iter().cloned());
        let filter = match &query.filter {
            Some(extra) => scope.and(extra.clone()),
            None => scope,
        };
        let mut qb = select(schema);
        push_where(&mut qb, schema, Some(&filter))?;
        push_order_by(&mut qb, schema, &query.order_by)?;
        let rows: Vec<SqliteRow> = qb.build().fetch_all(pool).await?;
        for row in &rows {
            nodes.push(Node::from_row(schema, row)?);
        }
    }
    Ok(nodes)
}
