//! Mutation descriptors: create, patch, upsert keys and atomic batches

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Entity, Record, ScalarValue};
use crate::query::Filter;

/// Identifies at most one record: by id or by a unique field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueWhere {
    Id(i64),
    Field { field: String, value: ScalarValue },
}

impl UniqueWhere {
    pub fn field(field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        UniqueWhere::Field {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_name(&self) -> &str {
        match self {
            UniqueWhere::Id(_) => "id",
            UniqueWhere::Field { field, .. } => field,
        }
    }

    pub fn value(&self) -> ScalarValue {
        match self {
            UniqueWhere::Id(id) => ScalarValue::Int(*id),
            UniqueWhere::Field { value, .. } => value.clone(),
        }
    }
}

impl std::fmt::Display for UniqueWhere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.field_name(), self.value())
    }
}

/// A record to create, optionally with nested relation writes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateData {
    pub fields: BTreeMap<String, ScalarValue>,
    pub relations: BTreeMap<String, RelationWrite>,
}

impl CreateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn relate(mut self, relation: impl Into<String>, write: RelationWrite) -> Self {
        self.relations.insert(relation.into(), write);
        self
    }

    /// No nested relation writes
    pub fn is_flat(&self) -> bool {
        self.relations.is_empty()
    }
}

/// Writes applied to one relation while creating its owner
///
/// Any combination of the three lists may be given; they run in the order
/// connect, connect-or-create, create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationWrite {
    pub create: Vec<CreateData>,
    pub connect: Vec<UniqueWhere>,
    pub connect_or_create: Vec<ConnectOrCreate>,
}

impl RelationWrite {
    pub fn create(records: impl IntoIterator<Item = CreateData>) -> Self {
        Self {
            create: records.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn connect(keys: impl IntoIterator<Item = UniqueWhere>) -> Self {
        Self {
            connect: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn connect_or_create(entries: impl IntoIterator<Item = ConnectOrCreate>) -> Self {
        Self {
            connect_or_create: entries.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn and_connect(mut self, key: UniqueWhere) -> Self {
        self.connect.push(key);
        self
    }

    pub fn and_create(mut self, data: CreateData) -> Self {
        self.create.push(data);
        self
    }

    /// Number of related records this write touches
    pub fn len(&self) -> usize {
        self.create.len() + self.connect.len() + self.connect_or_create.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Connect to the record matching `where_` if it exists, otherwise create it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectOrCreate {
    #[serde(rename = "where")]
    pub where_: UniqueWhere,
    pub create: CreateData,
}

impl ConnectOrCreate {
    pub fn new(where_: UniqueWhere, create: CreateData) -> Self {
        Self { where_, create }
    }
}

/// A change to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldUpdate {
    Set(ScalarValue),
    /// Applied by the store as `col = col + n`
    Increment(i64),
    /// Applied by the store as `col = col - n`
    Decrement(i64),
}

/// Field updates for `update`, `update_many` and the update branch of `upsert`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    pub entries: BTreeMap<String, FieldUpdate>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.entries
            .insert(field.into(), FieldUpdate::Set(value.into()));
        self
    }

    pub fn increment(mut self, field: impl Into<String>, by: i64) -> Self {
        self.entries.insert(field.into(), FieldUpdate::Increment(by));
        self
    }

    pub fn decrement(mut self, field: impl Into<String>, by: i64) -> Self {
        self.entries.insert(field.into(), FieldUpdate::Decrement(by));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Number of rows a bulk operation affected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCount {
    pub count: u64,
}

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Create {
        entity: Entity,
        data: CreateData,
    },
    CreateMany {
        entity: Entity,
        data: Vec<CreateData>,
        #[serde(default)]
        skip_duplicates: bool,
    },
    Update {
        entity: Entity,
        id: i64,
        patch: Patch,
    },
    UpdateMany {
        entity: Entity,
        filter: Filter,
        patch: Patch,
    },
    Upsert {
        entity: Entity,
        #[serde(rename = "where")]
        where_: UniqueWhere,
        update: Patch,
        create: CreateData,
    },
    Delete {
        entity: Entity,
        id: i64,
    },
    DeleteMany {
        entity: Entity,
        filter: Filter,
    },
}

impl Mutation {
    pub fn entity(&self) -> Entity {
        match self {
            Mutation::Create { entity, .. }
            | Mutation::CreateMany { entity, .. }
            | Mutation::Update { entity, .. }
            | Mutation::UpdateMany { entity, .. }
            | Mutation::Upsert { entity, .. }
            | Mutation::Delete { entity, .. }
            | Mutation::DeleteMany { entity, .. } => *entity,
        }
    }

    /// Verb name used in logs and errors
    pub fn op_name(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::CreateMany { .. } => "create_many",
            Mutation::Update { .. } => "update",
            Mutation::UpdateMany { .. } => "update_many",
            Mutation::Upsert { .. } => "upsert",
            Mutation::Delete { .. } => "delete",
            Mutation::DeleteMany { .. } => "delete_many",
        }
    }
}

/// Outcome of one mutation: the affected record, or a bulk count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MutationResult {
    Record(Record),
    Count(BatchCount),
}

impl MutationResult {
    pub fn record(&self) -> Option<&Record> {
        match self {
            MutationResult::Record(r) => Some(r),
            MutationResult::Count(_) => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            MutationResult::Count(c) => Some(c.count),
            MutationResult::Record(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_where_display() {
        assert_eq!(UniqueWhere::Id(3).to_string(), "id=3");
        assert_eq!(
            UniqueWhere::field("email", "a@b.io").to_string(),
            "email=a@b.io"
        );
    }

    #[test]
    fn test_relation_write_len() {
        let write = RelationWrite::connect([UniqueWhere::Id(1), UniqueWhere::Id(2)])
            .and_create(CreateData::new().set("name", "AI"));
        assert_eq!(write.len(), 3);
        assert!(!write.is_empty());
    }

    #[test]
    fn test_patch_builder_last_write_wins() {
        let patch = Patch::new().increment("likeNum", 5).decrement("likeNum", 2);
        assert_eq!(patch.entries.len(), 1);
        assert_eq!(patch.entries["likeNum"], FieldUpdate::Decrement(2));
    }

    #[test]
    fn test_mutation_deserializes_from_json() {
        let json = serde_json::json!({
            "update": {"entity": "Post", "id": 4, "patch": {"likeNum": {"decrement": 5}}}
        });
        let m: Mutation = serde_json::from_value(json).unwrap();
        assert_eq!(m.op_name(), "update");
        assert_eq!(m.entity(), Entity::Post);
    }
}
