//! Seed parser
//!
//! Parses YAML and converts each record into a validated `CreateData`.
//! Whether a key is a scalar or a relation is decided by schema metadata.

#![allow(clippy::result_large_err)]

use quarry_core::model::Entity;
use quarry_core::query::{ConnectOrCreate, CreateData, RelationWrite, UniqueWhere};
use quarry_core::rules::validation::validate_create;
use quarry_core::ScalarValue;
use serde_yaml::{Mapping, Value};

use crate::errors::{seed_validation, Result};
use crate::seed::format_v0::SeedV0;

/// A seed ready for import
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSeed {
    pub records: Vec<(Entity, CreateData)>,
}

/// Parse and validate a seed document
pub fn parse_seed_str(content: &str) -> Result<ParsedSeed> {
    let seed: SeedV0 = serde_yaml::from_str(content)
        .map_err(|e| seed_validation(format!("YAML parse error: {}", e)))?;

    if seed.schema_version != 0 {
        return Err(seed_validation(format!(
            "Unsupported schema_version: {}. Expected 0",
            seed.schema_version
        )));
    }

    let mut records = Vec::with_capacity(seed.records.len());
    for (i, record) in seed.records.iter().enumerate() {
        let data = create_data(record.entity, &record.data)
            .map_err(|e| seed_validation(format!("record #{}: {}", i, e)))?;
        validate_create(record.entity, &data, None)
            .map_err(|e| seed_validation(format!("record #{}: {}", i, e)))?;
        records.push((record.entity, data));
    }

    Ok(ParsedSeed { records })
}

fn as_mapping<'a>(value: &'a Value, what: &str) -> std::result::Result<&'a Mapping, String> {
    value
        .as_mapping()
        .ok_or_else(|| format!("{} must be a mapping", what))
}

fn key_str(key: &Value) -> std::result::Result<&str, String> {
    key.as_str()
        .ok_or_else(|| format!("non-string key {:?}", key))
}

/// A single mapping or a list of them
fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Sequence(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn scalar(value: &Value) -> std::result::Result<ScalarValue, String> {
    match value {
        Value::Null => Ok(ScalarValue::Null),
        Value::Bool(b) => Ok(ScalarValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(ScalarValue::Int)
            .or_else(|| n.as_f64().map(ScalarValue::Float))
            .ok_or_else(|| format!("unsupported number {}", n)),
        Value::String(s) => Ok(ScalarValue::Text(s.clone())),
        other => Err(format!("expected a scalar, found {:?}", other)),
    }
}

fn create_data(entity: Entity, value: &Value) -> std::result::Result<CreateData, String> {
    let mut data = CreateData::new();
    for (key, value) in as_mapping(value, entity.name())? {
        let key = key_str(key)?;
        if entity.field(key).is_some() {
            data.fields.insert(key.to_string(), scalar(value)?);
        } else if let Some(rel) = entity.relation(key) {
            data.relations
                .insert(key.to_string(), relation_write(rel.target, value)?);
        } else {
            return Err(format!("unknown key '{}' on {}", key, entity));
        }
    }
    Ok(data)
}

fn relation_write(target: Entity, value: &Value) -> std::result::Result<RelationWrite, String> {
    let mut write = RelationWrite::default();
    for (key, value) in as_mapping(value, "relation write")? {
        match key_str(key)? {
            "create" => {
                for item in one_or_many(value) {
                    write.create.push(create_data(target, item)?);
                }
            }
            "connect" => {
                for item in one_or_many(value) {
                    write.connect.push(unique_where(target, item)?);
                }
            }
            "connectOrCreate" => {
                for item in one_or_many(value) {
                    let entry = as_mapping(item, "connectOrCreate entry")?;
                    let where_ = entry
                        .get("where")
                        .ok_or("connectOrCreate entry needs 'where'")?;
                    let create = entry
                        .get("create")
                        .ok_or("connectOrCreate entry needs 'create'")?;
                    write.connect_or_create.push(ConnectOrCreate::new(
                        unique_where(target, where_)?,
                        create_data(target, create)?,
                    ));
                }
            }
            other => return Err(format!("unknown relation write '{}'", other)),
        }
    }
    Ok(write)
}

/// `{id: 1}` or `{email: "a@b.io"}`
fn unique_where(target: Entity, value: &Value) -> std::result::Result<UniqueWhere, String> {
    let map = as_mapping(value, "unique key")?;
    let mut entries = map.iter();
    let (key, value) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err(format!("unique key on {} must have exactly one entry", target)),
    };
    let key = key_str(key)?;
    match (key, scalar(value)?) {
        ("id", ScalarValue::Int(id)) => Ok(UniqueWhere::Id(id)),
        ("id", other) => Err(format!("id must be an integer, found {}", other.type_name())),
        (field, value) => Ok(UniqueWhere::field(field, value)),
    }
}
