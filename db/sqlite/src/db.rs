use anyhow::Result;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqlitePoolOptions, SqliteQueryResult, SqliteRow},
    Executor, Pool, Sqlite,
};

use crate::model::record::ValueModel;

pub struct SqliteDb {
    pool: Pool<Sqlite>,
}

impl SqliteDb {
    pub async fn new(url: &str, max_connections: &u32) -> Result<Self> {
        od_log::info("sqlite", "Initializing component");

        // An in-memory database lives and dies with its connection, so the
        // pool must hold exactly one and never recycle it.
        let pool = match url.starts_with("sqlite::memory:") {
            true => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect(url)
                    .await?
            }
            false => {
                SqlitePoolOptions::new()
                    .max_connections(*max_connections)
                    .connect(url)
                    .await?
            }
        };

        Ok(Self { pool })
    }

    pub async fn execute_raw(&self, sql: &str) -> Result<SqliteQueryResult> {
        Ok((&self.pool).execute(sql).await?)
    }

    pub async fn execute<'a>(
        &self,
        query: Query<'a, Sqlite, SqliteArguments<'a>>,
    ) -> Result<SqliteQueryResult> {
        Ok(query.execute(&self.pool).await?)
    }

    pub async fn fetch_one_row<'a>(
        &self,
        query: Query<'a, Sqlite, SqliteArguments<'a>>,
    ) -> Result<SqliteRow> {
        Ok(query.fetch_one(&self.pool).await?)
    }

    pub async fn fetch_all_rows<'a>(
        &self,
        query: Query<'a, Sqlite, SqliteArguments<'a>>,
    ) -> Result<Vec<SqliteRow>> {
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub fn bind_values<'a>(
        mut query: Query<'a, Sqlite, SqliteArguments<'a>>,
        values: Vec<ValueModel>,
    ) -> Query<'a, Sqlite, SqliteArguments<'a>> {
        for value in values {
            query = match value {
                ValueModel::Null => query.bind(None::<String>),
                ValueModel::Bool(value) => query.bind(value),
                ValueModel::Int(value) => query.bind(value),
                ValueModel::Real(value) => query.bind(value),
                ValueModel::Text(value) => query.bind(value),
            };
        }
        query
    }

    pub async fn close(&self) {
        self.pool.close().await
    }
}
