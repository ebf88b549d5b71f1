//! Data model: schema metadata, scalar values, records and typed rows

pub mod domain;
pub mod entity;
pub mod record;
pub mod value;

pub use domain::{Category, Post, Role, User};
pub use entity::{Entity, FieldDef, FieldType, RelationDef, RelationKind};
pub use record::Record;
pub use value::ScalarValue;
