//! Aggregation and grouping descriptors and their results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::ScalarValue;
use crate::query::Filter;

/// One aggregate function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Number of rows in the group
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

impl Aggregation {
    /// The aggregated field; `Count` counts rows and has none
    pub fn field(&self) -> Option<&str> {
        match self {
            Aggregation::Count => None,
            Aggregation::Sum(f) | Aggregation::Avg(f) | Aggregation::Min(f) | Aggregation::Max(f) => {
                Some(f)
            }
        }
    }

    /// Key used in the JSON output (`_sum`, `_avg`, ...)
    pub fn label(&self) -> &'static str {
        match self {
            Aggregation::Count => "_count",
            Aggregation::Sum(_) => "_sum",
            Aggregation::Avg(_) => "_avg",
            Aggregation::Min(_) => "_min",
            Aggregation::Max(_) => "_max",
        }
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Aggregation::Sum(field.into())
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Aggregation::Avg(field.into())
    }

    pub fn min(field: impl Into<String>) -> Self {
        Aggregation::Min(field.into())
    }

    pub fn max(field: impl Into<String>) -> Self {
        Aggregation::Max(field.into())
    }
}

/// Count, sum, average, minimum and maximum of one integer field
///
/// Over zero rows `count` and `sum` are 0 and the rest are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub field: String,
    pub count: i64,
    pub sum: i64,
    pub avg: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl AggregateSummary {
    /// `{"_count":{"id":n},"_sum":{"likeNum":..},...}`
    pub fn to_json(&self) -> Value {
        let one = |v: Value| {
            let mut m = Map::new();
            m.insert(self.field.clone(), v);
            Value::Object(m)
        };
        let mut count = Map::new();
        count.insert("id".to_string(), Value::from(self.count));

        let mut out = Map::new();
        out.insert("_count".to_string(), Value::Object(count));
        out.insert("_sum".to_string(), one(Value::from(self.sum)));
        out.insert(
            "_avg".to_string(),
            one(ScalarValue::from_optional_f64(self.avg).to_json()),
        );
        out.insert("_min".to_string(), one(self.min.map_or(Value::Null, Value::from)));
        out.insert("_max".to_string(), one(self.max.map_or(Value::Null, Value::from)));
        Value::Object(out)
    }
}

/// Arguments to `group_by`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByArgs {
    pub by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
    pub filter: Option<Filter>,
}

impl GroupByArgs {
    pub fn by<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            by: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One partition: its key values and the requested aggregates
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub key: BTreeMap<String, ScalarValue>,
    pub aggregates: Vec<(Aggregation, ScalarValue)>,
}

impl GroupSummary {
    pub fn value(&self, aggregation: &Aggregation) -> Option<&ScalarValue> {
        self.aggregates
            .iter()
            .find(|(a, _)| a == aggregation)
            .map(|(_, v)| v)
    }

    pub fn key_value(&self, field: &str) -> Option<&ScalarValue> {
        self.key.get(field)
    }

    /// `{"authorId":1,"_sum":{"likeNum":10},"_count":{"_all":2}}`
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (field, value) in &self.key {
            out.insert(field.clone(), value.to_json());
        }
        for (aggregation, value) in &self.aggregates {
            let slot = out
                .entry(aggregation.label().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = slot {
                let name = aggregation.field().unwrap_or("_all").to_string();
                inner.insert(name, value.to_json());
            }
        }
        Value::Object(out)
    }
}
