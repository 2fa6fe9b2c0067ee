use anyhow::Result;
use async_trait::async_trait;
use od_db_sqlite::{
    db::SqliteDb,
    model::{
        record::{RecordFilterModel, RecordOrderModel, RecordRangeModel},
        system::OrderKind,
    },
};
use od_error::AccessError;
use strum::IntoEnumIterator;

use collection::Collection;
use filter::Predicate;
use query::{QueryExecutor, Record, SelectQuery};
use util::conversion::{record_from_sqlitedb_model, record_to_sqlitedb_model};

pub mod capability;
pub mod collection;
pub mod controller;
pub mod dto;
pub mod filter;
pub mod query;
pub mod tenant;
mod util;

pub enum Db {
    SqliteDb(SqliteDb),
}

impl Db {
    /// Creates the backing table of every collection.
    pub async fn init(&self) -> Result<()> {
        match self {
            Self::SqliteDb(db) => {
                for collection in Collection::iter() {
                    db.create_record_table(collection.to_str()).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        match self {
            Self::SqliteDb(db) => db.close().await,
        }
    }
}

fn transport(err: anyhow::Error) -> AccessError {
    od_log::error("dao", format!("Store request failed: {err}"));
    AccessError::Transport(err.to_string())
}

fn sqlitedb_filters(predicates: &[Predicate]) -> Vec<RecordFilterModel> {
    predicates
        .iter()
        .map(Predicate::to_sqlitedb_model)
        .collect()
}

#[async_trait]
impl QueryExecutor for Db {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, AccessError> {
        match self {
            Self::SqliteDb(db) => {
                let orders = query
                    .orders()
                    .iter()
                    .map(|(field, ascending)| {
                        RecordOrderModel::new(
                            field,
                            match ascending {
                                true => &OrderKind::Asc,
                                false => &OrderKind::Desc,
                            },
                        )
                    })
                    .collect::<Vec<_>>();
                let range = query
                    .range_bounds()
                    .as_ref()
                    .map(|(from, to)| RecordRangeModel::new(from, to));
                let models = db
                    .select_many_records(
                        query.collection().to_str(),
                        &sqlitedb_filters(query.predicates()),
                        &orders,
                        &range,
                    )
                    .await
                    .map_err(transport)?;
                let mut records = Vec::with_capacity(models.len());
                for model in &models {
                    records.push(record_from_sqlitedb_model(model).map_err(transport)?);
                }
                Ok(records)
            }
        }
    }

    async fn count(&self, query: &SelectQuery) -> Result<u64, AccessError> {
        match self {
            Self::SqliteDb(db) => db
                .count_records(
                    query.collection().to_str(),
                    &sqlitedb_filters(query.predicates()),
                )
                .await
                .map_err(transport),
        }
    }

    async fn insert(
        &self,
        collection: &Collection,
        rows: &[(String, Record)],
    ) -> Result<Vec<Record>, AccessError> {
        match self {
            Self::SqliteDb(db) => {
                let mut models = Vec::with_capacity(rows.len());
                for (id, record) in rows {
                    models.push(record_to_sqlitedb_model(id, record).map_err(transport)?);
                }
                let inserted = db
                    .insert_records(collection.to_str(), &models)
                    .await
                    .map_err(transport)?;
                let mut records = Vec::with_capacity(inserted.len());
                for model in &inserted {
                    records.push(record_from_sqlitedb_model(model).map_err(transport)?);
                }
                Ok(records)
            }
        }
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &str,
        patch: &Record,
        scope: &[Predicate],
    ) -> Result<Vec<Record>, AccessError> {
        match self {
            Self::SqliteDb(db) => {
                let patch = serde_json::to_string(patch)
                    .map_err(|err| transport(anyhow::Error::from(err)))?;
                let updated = db
                    .update_record(collection.to_str(), id, &patch, &sqlitedb_filters(scope))
                    .await
                    .map_err(transport)?;
                let mut records = Vec::with_capacity(updated.len());
                for model in &updated {
                    records.push(record_from_sqlitedb_model(model).map_err(transport)?);
                }
                Ok(records)
            }
        }
    }

    async fn delete(
        &self,
        collection: &Collection,
        ids: &[String],
        scope: &[Predicate],
    ) -> Result<Vec<String>, AccessError> {
        match self {
            Self::SqliteDb(db) => db
                .delete_records(collection.to_str(), ids, &sqlitedb_filters(scope))
                .await
                .map_err(transport),
        }
    }
}
