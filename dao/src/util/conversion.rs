use anyhow::{Error, Result};
use od_db_sqlite::model::record::{RecordModel, ValueModel};
use serde_json::Value;

use crate::query::Record;

/// Binds a JSON value the way `json_extract` returns it: scalars as SQL
/// scalars, arrays and objects as their JSON text.
pub fn value_to_sqlitedb_model(value: &Value) -> ValueModel {
    match value {
        Value::Null => ValueModel::Null,
        Value::Bool(bool) => ValueModel::Bool(*bool),
        Value::Number(number) => match number.as_i64() {
            Some(int) => ValueModel::Int(int),
            None => match number.as_f64() {
                Some(real) => ValueModel::Real(real),
                None => ValueModel::Text(number.to_string()),
            },
        },
        Value::String(str) => ValueModel::Text(str.to_owned()),
        Value::Array(_) | Value::Object(_) => ValueModel::Text(value.to_string()),
    }
}

pub fn record_from_sqlitedb_model(model: &RecordModel) -> Result<Record> {
    match serde_json::from_str(model.data())? {
        Value::Object(record) => Ok(record),
        _ => Err(Error::msg(format!(
            "Stored record '{}' is not a JSON object",
            model.id()
        ))),
    }
}

pub fn record_to_sqlitedb_model(id: &str, record: &Record) -> Result<RecordModel> {
    Ok(RecordModel::new(id, &serde_json::to_string(record)?))
}
