//! # Filter Expressions
//!
//! Filters are JSON objects: `{"status": "published"}` is field equality,
//! `{"views": {"_gt": 10}}` applies operators, `_and` / `_or` take lists of
//! nested filters. Callers may also hand a filter over as a JSON-encoded
//! string.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::core::{CoreError, CoreResult, Item};

const AND: &str = "_and";
const OR: &str = "_or";

const OPERATORS: &[&str] = &[
    "_eq", "_neq", "_in", "_nin", "_gt", "_gte", "_lt", "_lte", "_contains", "_null",
];

/// A filter expression
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFilter {
    Object(Map<String, Value>),
    Encoded(String),
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawFilter::deserialize(deserializer)? {
            RawFilter::Object(map) => Ok(Filter(map)),
            RawFilter::Encoded(raw) => Filter::parse(&raw).map_err(de::Error::custom),
        }
    }
}

impl Filter {
    /// Empty filter; matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Field equality
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(field.into(), value.into());
        Self(map)
    }

    /// Field with a single operator, e.g. `op("views", "_gt", 10)`
    pub fn op(field: impl Into<String>, operator: &str, value: impl Into<Value>) -> Self {
        let mut inner = Map::new();
        inner.insert(operator.to_string(), value.into());
        Self::eq(field, Value::Object(inner))
    }

    /// Parse a JSON-encoded filter; an empty string is the empty filter
    pub fn parse(raw: &str) -> CoreResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::validation(format!(
                "Filter must be an object, got {}",
                other
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Conjoin two filters; empty filters are identities
    pub fn and(self, other: Filter) -> Filter {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let mut map = Map::new();
        map.insert(
            AND.to_string(),
            Value::Array(vec![self.into_value(), other.into_value()]),
        );
        Filter(map)
    }

    /// Disjoin filters; `None` when the list is empty
    pub fn any(filters: Vec<Filter>) -> Option<Filter> {
        match filters.len() {
            0 => None,
            1 => filters.into_iter().next(),
            _ => {
                let mut map = Map::new();
                map.insert(
                    OR.to_string(),
                    Value::Array(filters.into_iter().map(Filter::into_value).collect()),
                );
                Some(Filter(map))
            }
        }
    }

    /// Replace `$CURRENT_USER` placeholders with the caller's user id
    pub fn resolve_placeholders(&self, user_id: Option<&str>) -> Filter {
        fn walk(value: &Value, user_id: Option<&str>) -> Value {
            match value {
                Value::String(s) if s == "$CURRENT_USER" => user_id
                    .map(|id| Value::String(id.to_string()))
                    .unwrap_or(Value::Null),
                Value::Array(items) => Value::Array(items.iter().map(|v| walk(v, user_id)).collect()),
                Value::Object(map) => Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), walk(v, user_id)))
                        .collect(),
                ),
                other => other.clone(),
            }
        }

        Filter(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), walk(v, user_id)))
                .collect(),
        )
    }

    /// Check the filter only uses known operators
    pub fn validate(&self) -> CoreResult<()> {
        validate_node(&self.0)
    }

    /// Check if an item matches this filter
    pub fn matches(&self, item: &Item) -> CoreResult<bool> {
        eval_node(&self.0, item)
    }
}

fn nested(key: &str, value: &Value) -> CoreResult<Vec<Map<String, Value>>> {
    let list = value
        .as_array()
        .ok_or_else(|| CoreError::validation(format!("{} expects a list of filters", key)))?;

    list.iter()
        .map(|v| {
            v.as_object()
                .cloned()
                .ok_or_else(|| CoreError::validation(format!("{} entries must be objects", key)))
        })
        .collect()
}

fn operator_map(cond: &Value) -> Option<&Map<String, Value>> {
    cond.as_object()
        .filter(|ops| !ops.is_empty() && ops.keys().all(|k| k.starts_with('_')))
}

fn validate_node(node: &Map<String, Value>) -> CoreResult<()> {
    for (key, cond) in node {
        if key == AND || key == OR {
            for child in nested(key, cond)? {
                validate_node(&child)?;
            }
        } else if let Some(ops) = operator_map(cond) {
            for (op, operand) in ops {
                validate_operand(op, operand)?;
            }
        }
    }
    Ok(())
}

fn validate_operand(op: &str, operand: &Value) -> CoreResult<()> {
    match op {
        "_in" | "_nin" if !operand.is_array() => {
            Err(CoreError::validation("_in/_nin expect a list"))
        }
        "_null" if !operand.is_boolean() => Err(CoreError::validation("_null expects a boolean")),
        _ if !OPERATORS.contains(&op) => Err(CoreError::validation(format!(
            "Unknown filter operator: {}",
            op
        ))),
        _ => Ok(()),
    }
}

fn eval_node(node: &Map<String, Value>, item: &Item) -> CoreResult<bool> {
    for (key, cond) in node {
        let ok = match key.as_str() {
            AND => {
                let mut all = true;
                for child in nested(key, cond)? {
                    if !eval_node(&child, item)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            OR => {
                let mut any = false;
                for child in nested(key, cond)? {
                    if eval_node(&child, item)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            field => eval_field(item.get(field), cond)?,
        };

        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_field(value: Option<&Value>, cond: &Value) -> CoreResult<bool> {
    let Some(ops) = operator_map(cond) else {
        return Ok(value == Some(cond));
    };

    for (op, operand) in ops {
        if !eval_operator(op, value, operand)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_operator(op: &str, value: Option<&Value>, operand: &Value) -> CoreResult<bool> {
    let ok = match op {
        "_eq" => value == Some(operand),
        "_neq" => value != Some(operand),
        "_in" => list_contains(operand, value)?,
        "_nin" => !list_contains(operand, value)?,
        "_gt" => compare(value, operand).is_some_and(|o| o.is_gt()),
        "_gte" => compare(value, operand).is_some_and(|o| o.is_ge()),
        "_lt" => compare(value, operand).is_some_and(|o| o.is_lt()),
        "_lte" => compare(value, operand).is_some_and(|o| o.is_le()),
        "_contains" => match value {
            Some(Value::String(s)) => operand.as_str().is_some_and(|needle| s.contains(needle)),
            Some(Value::Array(items)) => items.contains(operand),
            _ => false,
        },
        "_null" => {
            let want_null = operand
                .as_bool()
                .ok_or_else(|| CoreError::validation("_null expects a boolean"))?;
            value.map_or(true, Value::is_null) == want_null
        }
        unknown => {
            return Err(CoreError::validation(format!(
                "Unknown filter operator: {}",
                unknown
            )))
        }
    };
    Ok(ok)
}

fn list_contains(operand: &Value, value: Option<&Value>) -> CoreResult<bool> {
    let list = operand
        .as_array()
        .ok_or_else(|| CoreError::validation("_in/_nin expect a list"))?;
    Ok(value.is_some_and(|v| list.contains(v)))
}

fn compare(value: Option<&Value>, operand: &Value) -> Option<std::cmp::Ordering> {
    match (value?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
