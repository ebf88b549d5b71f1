//! Result shaping
//!
//! A level of the result is either every scalar, an explicit selection, or
//! every scalar plus some relations. Selection and inclusion therefore
//! cannot be requested at the same level, but each relation carries its
//! own nested [`Projection`], so they nest freely.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Every scalar field, no relations
    #[default]
    All,
    /// Only the listed scalars and relations
    Select(Vec<SelectItem>),
    /// Every scalar field plus the listed relations
    Include(Vec<RelationSelection>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectItem {
    Field(String),
    Relation(RelationSelection),
}

/// A relation to load, shaped by its own projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSelection {
    pub relation: String,
    #[serde(default)]
    pub projection: Projection,
}

impl RelationSelection {
    pub fn new(relation: impl Into<String>, projection: Projection) -> Self {
        Self {
            relation: relation.into(),
            projection,
        }
    }
}

impl Projection {
    pub fn select(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Projection::Select(items.into_iter().collect())
    }

    /// Select only scalar fields
    pub fn fields<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Projection::Select(
            names
                .into_iter()
                .map(|n| SelectItem::Field(n.into()))
                .collect(),
        )
    }

    pub fn include(relations: impl IntoIterator<Item = RelationSelection>) -> Self {
        Projection::Include(relations.into_iter().collect())
    }

    /// Relations requested at this level
    pub fn relations(&self) -> Vec<&RelationSelection> {
        match self {
            Projection::All => Vec::new(),
            Projection::Select(items) => items
                .iter()
                .filter_map(|item| match item {
                    SelectItem::Relation(rel) => Some(rel),
                    SelectItem::Field(_) => None,
                })
                .collect(),
            Projection::Include(rels) => rels.iter().collect(),
        }
    }
}

impl SelectItem {
    pub fn field(name: impl Into<String>) -> Self {
        SelectItem::Field(name.into())
    }

    pub fn relation(relation: impl Into<String>, projection: Projection) -> Self {
        SelectItem::Relation(RelationSelection::new(relation, projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relations_of_select_skips_fields() {
        let p = Projection::select([
            SelectItem::field("title"),
            SelectItem::relation("author", Projection::fields(["name"])),
        ]);
        let rels = p.relations();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relation, "author");
    }

    #[test]
    fn test_include_nested_in_select() {
        // select { author: { include: { posts } } }
        let p = Projection::select([SelectItem::relation(
            "author",
            Projection::include([RelationSelection::new("posts", Projection::All)]),
        )]);
        match &p.relations()[0].projection {
            Projection::Include(inner) => assert_eq!(inner[0].relation, "posts"),
            other => panic!("expected include, got {:?}", other),
        }
    }
}
