use anyhow::Result;
use itertools::Itertools;
use sqlx::{FromRow, Row};

use crate::{
    db::SqliteDb,
    model::{
        record::{RecordFilterModel, RecordModel, RecordOrderModel, RecordRangeModel, ValueModel},
        system::ComparisonOperator,
    },
};

pub fn create_table(record_table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\"id\" text NOT NULL, \"data\" text NOT NULL, PRIMARY KEY (\"id\"))",
        quote(record_table)
    )
}

pub fn select_many(
    record_table: &str,
    filter: &str,
    orders: &Vec<String>,
    with_range: &bool,
) -> String {
    let mut query = format!("SELECT \"id\", \"data\" FROM {}", quote(record_table));
    if !filter.is_empty() {
        query += &format!(" WHERE {filter}");
    }
    if !orders.is_empty() {
        query += &format!(" ORDER BY {}", orders.join(", "));
    }
    if *with_range {
        query += " LIMIT ? OFFSET ?";
    }
    query
}

pub fn count(record_table: &str, filter: &str) -> String {
    let mut query = format!("SELECT COUNT(1) FROM {}", quote(record_table));
    if !filter.is_empty() {
        query += &format!(" WHERE {filter}");
    }
    query
}

pub fn insert(record_table: &str, rows: &usize) -> String {
    format!(
        "INSERT INTO {} (\"id\", \"data\") VALUES {} RETURNING \"id\", \"data\"",
        quote(record_table),
        (0..*rows).map(|_| "(?, json(?))").join(", ")
    )
}

pub fn update(record_table: &str, filter: &str) -> String {
    let mut query = format!(
        "UPDATE {} SET \"data\" = json_patch(\"data\", ?) WHERE \"id\" = ?",
        quote(record_table)
    );
    if !filter.is_empty() {
        query += &format!(" AND {filter}");
    }
    query + " RETURNING \"id\", \"data\""
}

pub fn delete(record_table: &str, ids: &usize, filter: &str) -> String {
    let mut query = format!(
        "DELETE FROM {} WHERE \"id\" IN ({})",
        quote(record_table),
        (0..*ids).map(|_| "?").join(", ")
    );
    if !filter.is_empty() {
        query += &format!(" AND {filter}");
    }
    query + " RETURNING \"id\""
}

/// Renders the filters as one conjunction, pushing the bound values in
/// placeholder order.
pub fn filter_clause(filters: &[RecordFilterModel], args: &mut Vec<ValueModel>) -> String {
    filters
        .iter()
        .map(|filter| filter_expr(filter, args))
        .join(" AND ")
}

pub fn order_clause(orders: &[RecordOrderModel], args: &mut Vec<ValueModel>) -> Vec<String> {
    let mut clauses = Vec::with_capacity(orders.len() + 1);
    for order in orders {
        args.push(json_path(order.field()));
        clauses.push(format!("json_extract(\"data\", ?) {}", order.kind().to_str()));
    }
    // Rows with equal sort keys keep insertion order in the sort direction.
    if let Some(last) = orders.last() {
        clauses.push(format!("rowid {}", last.kind().to_str()));
    }
    clauses
}

fn filter_expr(filter: &RecordFilterModel, args: &mut Vec<ValueModel>) -> String {
    match filter {
        RecordFilterModel::Compare { field, op, value } => {
            args.push(json_path(field));
            match (op, value) {
                (ComparisonOperator::Eq, ValueModel::Null) => {
                    "json_extract(\"data\", ?) IS NULL".to_owned()
                }
                (ComparisonOperator::Neq, ValueModel::Null) => {
                    "json_extract(\"data\", ?) IS NOT NULL".to_owned()
                }
                (ComparisonOperator::Like, ValueModel::Text(pattern)) => {
                    args.push(ValueModel::Text(like_to_glob(pattern)));
                    format!("json_extract(\"data\", ?) {} ?", op.to_str())
                }
                (ComparisonOperator::ILike, value) => {
                    args.push(value.clone());
                    format!(
                        "LOWER(json_extract(\"data\", ?)) {} LOWER(?) ESCAPE '\\'",
                        op.to_str()
                    )
                }
                (op, value) => {
                    args.push(value.clone());
                    format!("json_extract(\"data\", ?) {} ?", op.to_str())
                }
            }
        }
        RecordFilterModel::In { field, values } => {
            if values.is_empty() {
                return "0 = 1".to_owned();
            }
            args.push(json_path(field));
            args.extend(values.iter().cloned());
            format!(
                "json_extract(\"data\", ?) IN ({})",
                values.iter().map(|_| "?").join(", ")
            )
        }
        RecordFilterModel::Any(filters) => {
            if filters.is_empty() {
                return "0 = 1".to_owned();
            }
            format!(
                "({})",
                filters
                    .iter()
                    .map(|filter| filter_expr(filter, args))
                    .join(" OR ")
            )
        }
    }
}

fn json_path(field: &str) -> ValueModel {
    ValueModel::Text(format!("$.{field}"))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Translates a SQL `LIKE` pattern into the case-sensitive `GLOB` syntax.
/// A backslash makes the following character literal, as `ESCAPE '\'` does.
pub fn like_to_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => glob.push('*'),
            '_' => glob.push('?'),
            '\\' => match chars.next() {
                Some(escaped) => push_glob_literal(&mut glob, escaped),
                None => glob.push('\\'),
            },
            ch => push_glob_literal(&mut glob, ch),
        }
    }
    glob
}

fn push_glob_literal(glob: &mut String, ch: char) {
    match ch {
        '*' => glob.push_str("[*]"),
        '?' => glob.push_str("[?]"),
        '[' => glob.push_str("[[]"),
        ch => glob.push(ch),
    }
}

impl SqliteDb {
    pub async fn create_record_table(&self, record_table: &str) -> Result<()> {
        od_log::info("sqlite", format!("Setting up {record_table} table"));
        self.execute_raw(&create_table(record_table)).await?;
        Ok(())
    }

    pub async fn select_many_records(
        &self,
        record_table: &str,
        filters: &[RecordFilterModel],
        orders: &[RecordOrderModel],
        range: &Option<RecordRangeModel>,
    ) -> Result<Vec<RecordModel>> {
        let mut args = Vec::new();
        let filter = filter_clause(filters, &mut args);
        let orders = order_clause(orders, &mut args);
        if let Some(range) = range {
            args.push(ValueModel::Int(range.limit()));
            args.push(ValueModel::Int(range.offset()));
        }
        let sql = select_many(record_table, &filter, &orders, &range.is_some());

        let rows = self
            .fetch_all_rows(Self::bind_values(sqlx::query(&sql), args))
            .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(RecordModel::from_row(row)?);
        }
        Ok(records)
    }

    pub async fn count_records(
        &self,
        record_table: &str,
        filters: &[RecordFilterModel],
    ) -> Result<u64> {
        let mut args = Vec::new();
        let filter = filter_clause(filters, &mut args);
        let sql = count(record_table, &filter);

        let row = self
            .fetch_one_row(Self::bind_values(sqlx::query(&sql), args))
            .await?;
        Ok(u64::try_from(row.try_get::<i64, _>(0)?)?)
    }

    pub async fn insert_records(
        &self,
        record_table: &str,
        records: &[RecordModel],
    ) -> Result<Vec<RecordModel>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let sql = insert(record_table, &records.len());
        let mut args = Vec::with_capacity(records.len() * 2);
        for record in records {
            args.push(ValueModel::Text(record.id().to_owned()));
            args.push(ValueModel::Text(record.data().to_owned()));
        }

        let rows = self
            .fetch_all_rows(Self::bind_values(sqlx::query(&sql), args))
            .await?;
        let mut inserted = Vec::with_capacity(rows.len());
        for row in &rows {
            inserted.push(RecordModel::from_row(row)?);
        }
        Ok(inserted)
    }

    /// Merges `patch` (a JSON object) into the record with `json_patch`, so
    /// a `null` member deletes that key. Returns the updated rows, which is
    /// empty when no row matched the id and filters.
    pub async fn update_record(
        &self,
        record_table: &str,
        id: &str,
        patch: &str,
        filters: &[RecordFilterModel],
    ) -> Result<Vec<RecordModel>> {
        let mut args = vec![
            ValueModel::Text(patch.to_owned()),
            ValueModel::Text(id.to_owned()),
        ];
        let filter = filter_clause(filters, &mut args);
        let sql = update(record_table, &filter);

        let rows = self
            .fetch_all_rows(Self::bind_values(sqlx::query(&sql), args))
            .await?;
        let mut updated = Vec::with_capacity(rows.len());
        for row in &rows {
            updated.push(RecordModel::from_row(row)?);
        }
        Ok(updated)
    }

    pub async fn delete_records(
        &self,
        record_table: &str,
        ids: &[String],
        filters: &[RecordFilterModel],
    ) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = ids
            .iter()
            .map(|id| ValueModel::Text(id.to_owned()))
            .collect::<Vec<_>>();
        let filter = filter_clause(filters, &mut args);
        let sql = delete(record_table, &ids.len(), &filter);

        let rows = self
            .fetch_all_rows(Self::bind_values(sqlx::query(&sql), args))
            .await?;
        let mut deleted = Vec::with_capacity(rows.len());
        for row in &rows {
            deleted.push(row.try_get::<String, _>("id")?);
        }
        Ok(deleted)
    }
}
