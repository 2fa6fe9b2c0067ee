use async_trait::async_trait;
use od_error::AccessError;
use serde_json::{Map, Value};

use crate::{collection::Collection, filter::Predicate};

/// A row as the console sees it: one JSON object per record.
pub type Record = Map<String, Value>;

pub fn record_id(record: &Record, id_field: &str) -> Option<String> {
    match record.get(id_field)? {
        Value::String(id) => Some(id.to_owned()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct SelectQuery {
    collection: Collection,
    predicates: Vec<Predicate>,
    orders: Vec<(String, bool)>,
    range: Option<(u64, u64)>,
}

impl SelectQuery {
    pub fn new(collection: &Collection) -> Self {
        Self {
            collection: *collection,
            predicates: Vec::new(),
            orders: Vec::new(),
            range: None,
        }
    }

    pub fn filter(mut self, predicates: Vec<Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.predicates.push(Predicate::eq(field, value));
        self
    }

    pub fn order(mut self, field: &str, ascending: bool) -> Self {
        self.orders.push((field.to_owned(), ascending));
        self
    }

    /// Zero-based inclusive row window.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    /// The same selection over every row, for counting.
    pub fn without_range(&self) -> Self {
        Self {
            collection: self.collection,
            predicates: self.predicates.clone(),
            orders: Vec::new(),
            range: None,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn predicates(&self) -> &Vec<Predicate> {
        &self.predicates
    }

    pub fn orders(&self) -> &Vec<(String, bool)> {
        &self.orders
    }

    pub fn range_bounds(&self) -> &Option<(u64, u64)> {
        &self.range
    }
}

/// The remote record store.
///
/// Mutations take the tenant scope as extra predicates so that a row outside
/// the caller's organization is never touched, whatever id is supplied.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, AccessError>;

    async fn count(&self, query: &SelectQuery) -> Result<u64, AccessError>;

    /// Inserts `(id, record)` rows and returns them as stored.
    async fn insert(
        &self,
        collection: &Collection,
        rows: &[(String, Record)],
    ) -> Result<Vec<Record>, AccessError>;

    /// Merges `patch` into the row `id` when it also matches `scope`, with
    /// JSON merge-patch semantics: a `null` value removes that key from the
    /// stored row. Returns the updated rows; empty when nothing matched.
    async fn update(
        &self,
        collection: &Collection,
        id: &str,
        patch: &Record,
        scope: &[Predicate],
    ) -> Result<Vec<Record>, AccessError>;

    /// Returns the ids actually deleted.
    async fn delete(
        &self,
        collection: &Collection,
        ids: &[String],
        scope: &[Predicate],
    ) -> Result<Vec<String>, AccessError>;
}
