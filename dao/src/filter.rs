use od_config::query::{QueryConfig, SearchMode};
use od_db_sqlite::model::{record::RecordFilterModel, system::ComparisonOperator};
use od_error::AccessError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{collection::Collection, util::conversion::value_to_sqlitedb_model};

/// Filter keys that always mean plain equality.
const EQUALITY_KEYS: [&str; 3] = ["status", "type", "category"];

#[derive(Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
}

impl FilterOperator {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::In => "in",
        }
    }

    pub fn from_str(str: &str) -> Result<Self, AccessError> {
        match str {
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "like" => Ok(Self::Like),
            "ilike" => Ok(Self::ILike),
            "in" => Ok(Self::In),
            _ => Err(AccessError::InvalidFilter(format!(
                "unknown operator '{str}'"
            ))),
        }
    }

    fn to_sqlitedb_model(self) -> Option<ComparisonOperator> {
        match self {
            Self::Eq => Some(ComparisonOperator::Eq),
            Self::Neq => Some(ComparisonOperator::Neq),
            Self::Gt => Some(ComparisonOperator::Gt),
            Self::Gte => Some(ComparisonOperator::Gte),
            Self::Lt => Some(ComparisonOperator::Lt),
            Self::Lte => Some(ComparisonOperator::Lte),
            Self::Like => Some(ComparisonOperator::Like),
            Self::ILike => Some(ComparisonOperator::ILike),
            Self::In => None,
        }
    }
}

/// One store-side condition. A predicate list is a conjunction.
#[derive(Clone, PartialEq, Debug)]
pub enum Predicate {
    Compare {
        field: String,
        op: FilterOperator,
        value: Value,
    },
    /// Disjunction of its members.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: &str, op: &FilterOperator, value: Value) -> Self {
        Self::Compare {
            field: field.to_owned(),
            op: *op,
            value,
        }
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::compare(field, &FilterOperator::Eq, value)
    }

    pub fn to_sqlitedb_model(&self) -> RecordFilterModel {
        match self {
            Self::Compare { field, op, value } => match op.to_sqlitedb_model() {
                Some(op) => RecordFilterModel::Compare {
                    field: field.to_owned(),
                    op,
                    value: value_to_sqlitedb_model(value),
                },
                None => RecordFilterModel::In {
                    field: field.to_owned(),
                    values: match value {
                        Value::Array(values) => values
                            .iter()
                            .map(value_to_sqlitedb_model)
                            .collect(),
                        value => vec![value_to_sqlitedb_model(value)],
                    },
                },
            },
            Self::Any(predicates) => RecordFilterModel::Any(
                predicates.iter().map(Self::to_sqlitedb_model).collect(),
            ),
        }
    }
}

/// Caller-facing filter description: field name to either a literal or an
/// `{operator, value}` object. Entry order is kept and drives predicate
/// order.
#[derive(Deserialize, Serialize, Clone, PartialEq, Default, Debug)]
#[serde(transparent)]
pub struct FilterSpec(Map<String, Value>);

impl FilterSpec {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.0.insert(field.to_owned(), value);
        self
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for FilterSpec {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub struct FilterTranslator {
    created_at_field: String,
    search_mode: SearchMode,
}

impl FilterTranslator {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            created_at_field: config.created_at_field().to_owned(),
            search_mode: *config.search_mode(),
        }
    }

    pub fn translate(
        &self,
        spec: &FilterSpec,
        collection: &Collection,
    ) -> Result<Vec<Predicate>, AccessError> {
        let mut predicates = Vec::with_capacity(spec.entries().len());
        for (key, value) in spec.entries() {
            if is_blank(value) {
                continue;
            }
            match key.as_str() {
                "search" => {
                    if let Some(predicate) = self.search(value, collection)? {
                        predicates.push(predicate);
                    }
                }
                "dateFrom" => predicates.push(Predicate::compare(
                    &self.created_at_field,
                    &FilterOperator::Gte,
                    value.clone(),
                )),
                "dateTo" => predicates.push(Predicate::compare(
                    &self.created_at_field,
                    &FilterOperator::Lte,
                    value.clone(),
                )),
                key if EQUALITY_KEYS.contains(&key) => {
                    check_field(key)?;
                    let value = match structured(value) {
                        Some((_, inner)) => inner.clone(),
                        None => value.clone(),
                    };
                    predicates.push(Predicate::eq(key, value));
                }
                key => {
                    check_field(key)?;
                    predicates.push(match structured(value) {
                        Some((operator, inner)) => operator_predicate(key, operator, inner)?,
                        None => Predicate::eq(key, value.clone()),
                    });
                }
            }
        }
        Ok(predicates)
    }

    fn search(
        &self,
        value: &Value,
        collection: &Collection,
    ) -> Result<Option<Predicate>, AccessError> {
        let term = match value {
            Value::String(term) => term,
            _ => {
                return Err(AccessError::InvalidFilter(
                    "search term must be a string".to_owned(),
                ))
            }
        };
        let pattern = Value::String(format!("%{}%", escape_like(term)));
        let fields = collection.search_fields();
        let predicate = match self.search_mode {
            SearchMode::FirstField => fields
                .first()
                .map(|field| Predicate::compare(field, &FilterOperator::ILike, pattern)),
            SearchMode::AnyField => match fields {
                [] => None,
                [field] => Some(Predicate::compare(field, &FilterOperator::ILike, pattern)),
                fields => Some(Predicate::Any(
                    fields
                        .iter()
                        .map(|field| {
                            Predicate::compare(field, &FilterOperator::ILike, pattern.clone())
                        })
                        .collect(),
                )),
            },
        };
        Ok(predicate)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(str) => str.is_empty(),
        _ => false,
    }
}

/// Makes `%`, `_` and `\` in a search term match themselves.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Splits an `{operator, value}` object; anything else is a literal.
fn structured(value: &Value) -> Option<(&Value, &Value)> {
    let object = value.as_object()?;
    Some((object.get("operator")?, object.get("value")?))
}

fn operator_predicate(
    field: &str,
    operator: &Value,
    value: &Value,
) -> Result<Predicate, AccessError> {
    let operator = match operator {
        Value::String(operator) => FilterOperator::from_str(operator)?,
        _ => {
            return Err(AccessError::InvalidFilter(format!(
                "operator of '{field}' must be a string"
            )))
        }
    };
    if operator == FilterOperator::In && !value.is_array() {
        return Err(AccessError::InvalidFilter(format!(
            "'in' on '{field}' needs an array value"
        )));
    }
    Ok(Predicate::compare(field, &operator, value.clone()))
}

fn check_field(field: &str) -> Result<(), AccessError> {
    if !field.is_empty()
        && field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(())
    } else {
        Err(AccessError::InvalidFilter(format!(
            "invalid field name '{field}'"
        )))
    }
}
