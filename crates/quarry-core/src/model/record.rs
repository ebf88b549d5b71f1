//! Dynamically shaped result records

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{QuarryError, Result};
use crate::model::ScalarValue;

/// One result row, shaped by the query's projection
///
/// Scalars are keyed by their public field name; included relations hold
/// a nested record (to-one), `null` (absent to-one) or an array (to-many).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn set_scalar(&mut self, key: impl Into<String>, value: &ScalarValue) {
        self.0.insert(key.into(), value.to_json());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Identity of the record, when `id` is part of the shape
    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }

    /// Deserialize into a typed row such as [`crate::model::Post`]
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.into_json()).map_err(QuarryError::from)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
