use sqlx::prelude::FromRow;

use super::system::{ComparisonOperator, OrderKind};

#[derive(FromRow)]
pub struct RecordModel {
    id: String,
    data: String,
}

impl RecordModel {
    pub fn new(id: &str, data: &str) -> Self {
        Self {
            id: id.to_owned(),
            data: data.to_owned(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The record serialized as a JSON object.
    pub fn data(&self) -> &str {
        &self.data
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum ValueModel {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

#[derive(Clone, PartialEq, Debug)]
pub enum RecordFilterModel {
    Compare {
        field: String,
        op: ComparisonOperator,
        value: ValueModel,
    },
    In {
        field: String,
        values: Vec<ValueModel>,
    },
    Any(Vec<RecordFilterModel>),
}

#[derive(Clone, PartialEq, Debug)]
pub struct RecordOrderModel {
    field: String,
    kind: OrderKind,
}

impl RecordOrderModel {
    pub fn new(field: &str, kind: &OrderKind) -> Self {
        Self {
            field: field.to_owned(),
            kind: *kind,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> &OrderKind {
        &self.kind
    }
}

/// Zero-based inclusive row window.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RecordRangeModel {
    from: u64,
    to: u64,
}

impl RecordRangeModel {
    pub fn new(from: &u64, to: &u64) -> Self {
        Self {
            from: *from,
            to: (*to).max(*from),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::try_from(self.from).unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.to - self.from + 1).unwrap_or(i64::MAX)
    }
}
