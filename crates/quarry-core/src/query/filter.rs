//! Filter expression trees

use serde::{Deserialize, Serialize};

use crate::model::ScalarValue;

/// A boolean expression over one entity's fields and relations
///
/// `And(vec![])` matches every record and `Or(vec![])` matches none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Field {
        field: String,
        predicate: Predicate,
    },
    /// Quantified filter over the records reached through `relation`
    Relation {
        relation: String,
        quantifier: Quantifier,
        filter: Box<Filter>,
    },
}

/// A test applied to one scalar field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `Equals(Null)` tests for NULL
    Equals(ScalarValue),
    NotEquals(ScalarValue),
    In(Vec<ScalarValue>),
    NotIn(Vec<ScalarValue>),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Gt(ScalarValue),
    Gte(ScalarValue),
    Lt(ScalarValue),
    Lte(ScalarValue),
    Not(Box<Predicate>),
}

/// Relation quantifiers
///
/// `Every`, `Some` and `None` apply to to-many relations; `Is` and `IsNot`
/// to to-one relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    Every,
    Some,
    None,
    Is,
    IsNot,
}

impl Quantifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantifier::Every => "every",
            Quantifier::Some => "some",
            Quantifier::None => "none",
            Quantifier::Is => "is",
            Quantifier::IsNot => "isNot",
        }
    }

    pub fn is_to_many(&self) -> bool {
        matches!(
            self,
            Quantifier::Every | Quantifier::Some | Quantifier::None
        )
    }
}

impl Filter {
    /// Matches every record
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    /// Matches no record
    pub fn nothing() -> Self {
        Filter::Or(Vec::new())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn field(field: impl Into<String>, predicate: Predicate) -> Self {
        Filter::Field {
            field: field.into(),
            predicate,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::field(field, Predicate::Equals(value.into()))
    }

    pub fn relation(relation: impl Into<String>, quantifier: Quantifier, filter: Filter) -> Self {
        Filter::Relation {
            relation: relation.into(),
            quantifier,
            filter: Box::new(filter),
        }
    }

    pub fn every(relation: impl Into<String>, filter: Filter) -> Self {
        Filter::relation(relation, Quantifier::Every, filter)
    }

    pub fn some(relation: impl Into<String>, filter: Filter) -> Self {
        Filter::relation(relation, Quantifier::Some, filter)
    }

    pub fn none(relation: impl Into<String>, filter: Filter) -> Self {
        Filter::relation(relation, Quantifier::None, filter)
    }

    pub fn is(relation: impl Into<String>, filter: Filter) -> Self {
        Filter::relation(relation, Quantifier::Is, filter)
    }

    pub fn is_not(relation: impl Into<String>, filter: Filter) -> Self {
        Filter::relation(relation, Quantifier::IsNot, filter)
    }

    /// Conjoin with another filter, flattening nested ANDs
    pub fn and_also(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Depth of the tree; leaves count as 1
    pub fn depth(&self) -> usize {
        match self {
            Filter::And(parts) | Filter::Or(parts) => {
                1 + parts.iter().map(Filter::depth).max().unwrap_or(0)
            }
            Filter::Not(inner) => 1 + inner.depth(),
            Filter::Relation { filter, .. } => 1 + filter.depth(),
            Filter::Field { .. } => 1,
        }
    }
}

impl Predicate {
    pub fn contains(needle: impl Into<String>) -> Self {
        Predicate::Contains(needle.into())
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Predicate::StartsWith(prefix.into())
    }

    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Predicate::EndsWith(suffix.into())
    }

    pub fn gt(value: impl Into<ScalarValue>) -> Self {
        Predicate::Gt(value.into())
    }

    pub fn lt(value: impl Into<ScalarValue>) -> Self {
        Predicate::Lt(value.into())
    }

    pub fn negate(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_also_flattens() {
        let f = Filter::all()
            .and_also(Filter::equals("authorId", 3))
            .and_also(Filter::equals("published", true));
        match f {
            Filter::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_depth() {
        let f = Filter::every("posts", Filter::equals("published", true));
        assert_eq!(f.depth(), 2);
        assert_eq!(Filter::all().depth(), 1);
    }

    #[test]
    fn test_quantifier_families() {
        assert!(Quantifier::Every.is_to_many());
        assert!(!Quantifier::IsNot.is_to_many());
        assert_eq!(Quantifier::IsNot.as_str(), "isNot");
    }

    #[test]
    fn test_serde_shape() {
        let f = Filter::field("id", Predicate::negate(Predicate::gt(2)));
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field": {"field": "id", "predicate": {"not": {"gt": 2}}}})
        );
        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, f);
    }
}
