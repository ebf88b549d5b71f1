//! Schema metadata for the User / Post / Category model
//!
//! The tables, columns and join paths declared here are the single source
//! of truth for descriptor validation and SQL translation. Field names are
//! the public camelCase names; columns are the snake_case store names.

use serde::{Deserialize, Serialize};

/// A model entity backed by one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    User,
    Post,
    Category,
}

/// Storage type of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Text,
    Bool,
    /// Text restricted to the listed variants
    Enum(&'static [&'static str]),
}

impl FieldType {
    pub fn describe(&self) -> String {
        match self {
            FieldType::Int => "int".to_string(),
            FieldType::Text => "text".to_string(),
            FieldType::Bool => "bool".to_string(),
            FieldType::Enum(variants) => format!("one of {}", variants.join("|")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub ty: FieldType,
    pub unique: bool,
    /// Assigned by the store; never written by callers
    pub generated: bool,
    /// The store supplies a value when the caller omits the field
    pub has_default: bool,
}

/// How a relation is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Many-to-one or one-to-one: this entity's `fk_field` holds the target id
    ToOne { fk_field: &'static str },
    /// One-to-many: the target table's `remote_column` holds this entity's id
    ToMany { remote_column: &'static str },
    /// Many-to-many through `join_table`
    ManyToMany {
        join_table: &'static str,
        /// Join column pointing at this entity
        local_column: &'static str,
        /// Join column pointing at the target
        remote_column: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub target: Entity,
    pub kind: RelationKind,
}

impl RelationDef {
    /// True for one-to-many and many-to-many relations
    pub fn is_to_many(&self) -> bool {
        !matches!(self.kind, RelationKind::ToOne { .. })
    }
}

const fn field(name: &'static str, column: &'static str, ty: FieldType) -> FieldDef {
    FieldDef {
        name,
        column,
        ty,
        unique: false,
        generated: false,
        has_default: false,
    }
}

const ID: FieldDef = FieldDef {
    name: "id",
    column: "id",
    ty: FieldType::Int,
    unique: true,
    generated: true,
    has_default: true,
};

pub const ROLES: &[&str] = &["USER", "ADMIN"];

static USER_FIELDS: [FieldDef; 4] = [
    ID,
    field("name", "name", FieldType::Text),
    FieldDef {
        unique: true,
        ..field("email", "email", FieldType::Text)
    },
    FieldDef {
        has_default: true,
        ..field("role", "role", FieldType::Enum(ROLES))
    },
];

static POST_FIELDS: [FieldDef; 5] = [
    ID,
    field("title", "title", FieldType::Text),
    FieldDef {
        has_default: true,
        ..field("published", "published", FieldType::Bool)
    },
    FieldDef {
        has_default: true,
        ..field("likeNum", "like_num", FieldType::Int)
    },
    field("authorId", "author_id", FieldType::Int),
];

static CATEGORY_FIELDS: [FieldDef; 2] = [ID, field("name", "name", FieldType::Text)];

static USER_RELATIONS: [RelationDef; 1] = [RelationDef {
    name: "posts",
    target: Entity::Post,
    kind: RelationKind::ToMany {
        remote_column: "author_id",
    },
}];

static POST_RELATIONS: [RelationDef; 2] = [
    RelationDef {
        name: "author",
        target: Entity::User,
        kind: RelationKind::ToOne {
            fk_field: "authorId",
        },
    },
    RelationDef {
        name: "categories",
        target: Entity::Category,
        kind: RelationKind::ManyToMany {
            join_table: "post_categories",
            local_column: "post_id",
            remote_column: "category_id",
        },
    },
];

static CATEGORY_RELATIONS: [RelationDef; 1] = [RelationDef {
    name: "posts",
    target: Entity::Post,
    kind: RelationKind::ManyToMany {
        join_table: "post_categories",
        local_column: "category_id",
        remote_column: "post_id",
    },
}];

impl Entity {
    pub const ALL: [Entity; 3] = [Entity::User, Entity::Post, Entity::Category];

    pub fn name(&self) -> &'static str {
        match self {
            Entity::User => "User",
            Entity::Post => "Post",
            Entity::Category => "Category",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Entity::User => "users",
            Entity::Post => "posts",
            Entity::Category => "categories",
        }
    }

    /// Scalar fields in declaration (and column) order
    pub fn fields(&self) -> &'static [FieldDef] {
        match self {
            Entity::User => &USER_FIELDS,
            Entity::Post => &POST_FIELDS,
            Entity::Category => &CATEGORY_FIELDS,
        }
    }

    pub fn relations(&self) -> &'static [RelationDef] {
        match self {
            Entity::User => &USER_RELATIONS,
            Entity::Post => &POST_RELATIONS,
            Entity::Category => &CATEGORY_RELATIONS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.column == column)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations().iter().find(|r| r.name == name)
    }

    pub fn id_field(&self) -> &'static FieldDef {
        &self.fields()[0]
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s) || e.table() == s)
            .ok_or_else(|| format!("unknown entity '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entity_leads_with_generated_id() {
        for entity in Entity::ALL {
            let id = entity.id_field();
            assert_eq!(id.name, "id");
            assert!(id.generated && id.unique);
        }
    }

    #[test]
    fn test_relations_point_back() {
        // Post.categories and Category.posts share the join table with
        // mirrored columns.
        let forward = Entity::Post.relation("categories").unwrap();
        let inverse = Entity::Category.relation("posts").unwrap();
        match (forward.kind, inverse.kind) {
            (
                RelationKind::ManyToMany {
                    join_table: a,
                    local_column: al,
                    remote_column: ar,
                },
                RelationKind::ManyToMany {
                    join_table: b,
                    local_column: bl,
                    remote_column: br,
                },
            ) => {
                assert_eq!(a, b);
                assert_eq!(al, br);
                assert_eq!(ar, bl);
            }
            other => panic!("unexpected kinds {:?}", other),
        }
    }

    #[test]
    fn test_to_one_fk_field_exists() {
        for entity in Entity::ALL {
            for rel in entity.relations() {
                if let RelationKind::ToOne { fk_field } = rel.kind {
                    assert!(entity.field(fk_field).is_some(), "{}.{}", entity, fk_field);
                }
            }
        }
    }

    #[test]
    fn test_entity_from_str() {
        assert_eq!("post".parse::<Entity>().unwrap(), Entity::Post);
        assert_eq!("categories".parse::<Entity>().unwrap(), Entity::Category);
        assert!("comment".parse::<Entity>().is_err());
    }

    #[test]
    fn test_post_like_num_column() {
        let f = Entity::Post.field("likeNum").unwrap();
        assert_eq!(f.column, "like_num");
        assert_eq!(f.ty, FieldType::Int);
        assert!(f.has_default);
    }
}
