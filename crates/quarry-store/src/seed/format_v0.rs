//! Seed format v0
//!
//! ```yaml
//! schema_version: 0
//! records:
//!   - entity: User
//!     data:
//!       name: John
//!       email: John@prisma.io
//!       posts:
//!         create:
//!           - title: Hello
//! ```
//!
//! Keys of `data` naming a scalar field are values; keys naming a relation
//! hold `create`, `connect` and `connectOrCreate` entries.

use quarry_core::Entity;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedV0 {
    pub schema_version: u32,
    #[serde(default)]
    pub records: Vec<SeedRecord>,
}

/// One top-level record, created as a unit
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecord {
    pub entity: Entity,
    pub data: serde_yaml::Value,
}
