//! # Query Module
//!
//! Structured read request: filter, projection, ordering, paging and an
//! optional aggregate. The items layer treats it as a mergeable value; only
//! the in-memory storage backend actually evaluates it.

pub mod filter;

pub use filter::Filter;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{CoreError, CoreResult, Item};

/// Aggregate request; only `count` is supported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// `"*"` counts rows, a field name counts rows where it is non-null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
}

impl Aggregate {
    pub fn count_all() -> Self {
        Self {
            count: Some("*".to_string()),
        }
    }
}

/// A read query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Field names; a leading `-` sorts descending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sort<I, S>(mut self, sort: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = Some(sort.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// AND a fragment into the existing filter, never replacing it
    pub fn conjoin_filter(&mut self, fragment: Filter) {
        let current = self.filter.take().unwrap_or_default();
        let combined = current.and(fragment);
        self.filter = if combined.is_empty() {
            None
        } else {
            Some(combined)
        };
    }

    /// Check the query's shape without touching any data
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        if let Some(fields) = &self.fields {
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(CoreError::validation("fields must not contain empty names"));
            }
        }
        if let Some(sort) = &self.sort {
            if sort.iter().any(|s| s.trim_start_matches('-').trim().is_empty()) {
                return Err(CoreError::validation("sort must not contain empty names"));
            }
        }
        if let Some(aggregate) = &self.aggregate {
            if aggregate.count.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err(CoreError::validation("aggregate requires a count target"));
            }
        }
        Ok(())
    }

    /// Evaluate against an in-memory set of rows
    ///
    /// Order of application: filter, sort, offset, limit, then either the
    /// aggregate (a single row) or the field projection.
    pub fn evaluate(&self, rows: impl IntoIterator<Item = Item>) -> CoreResult<Vec<Item>> {
        let mut matched = Vec::new();
        for row in rows {
            let keep = match &self.filter {
                Some(filter) => filter.matches(&row)?,
                None => true,
            };
            if keep {
                matched.push(row);
            }
        }

        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| compare_rows(a, b, sort));
        }

        let paged: Vec<Item> = matched
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        if let Some(target) = self.aggregate.as_ref().and_then(|a| a.count.as_deref()) {
            let count = if target == "*" {
                paged.len()
            } else {
                paged
                    .iter()
                    .filter(|row| row.get(target).is_some_and(|v| !v.is_null()))
                    .count()
            };
            let mut row = Map::new();
            row.insert("count".to_string(), Value::from(count));
            return Ok(vec![row]);
        }

        Ok(match &self.fields {
            Some(fields) if !fields.iter().any(|f| f == "*") => {
                paged.into_iter().map(|row| project(row, fields)).collect()
            }
            _ => paged,
        })
    }
}

fn compare_rows(a: &Item, b: &Item, sort: &[String]) -> Ordering {
    for key in sort {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key.as_str(), false),
        };
        let ord = compare_values(a.get(field), b.get(field));
        let ord = if descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // missing and null sort first
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn project(mut row: Item, fields: &[String]) -> Item {
    row.retain(|k, _| fields.iter().any(|f| f == k));
    row
}
