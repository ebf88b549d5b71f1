//! Descriptor validation against the schema
//!
//! Every descriptor is checked here before any SQL is produced, so the
//! store only ever sees known fields, known relations and well-typed
//! values.

use std::collections::BTreeSet;

use crate::errors::{QuarryError, Result};
use crate::model::{Entity, FieldDef, FieldType, RelationDef, RelationKind, ScalarValue};
use crate::query::{
    Aggregation, CreateData, FieldUpdate, Filter, GroupByArgs, Patch, Predicate, Projection,
    SelectItem, Sort, UniqueWhere,
};

/// Deepest filter tree accepted
pub const MAX_FILTER_DEPTH: usize = 32;

/// Resolve a scalar field or fail with `UnknownField`
pub fn require_field(entity: Entity, name: &str) -> Result<&'static FieldDef> {
    entity.field(name).ok_or_else(|| QuarryError::UnknownField {
        entity: entity.name().to_string(),
        field: name.to_string(),
    })
}

/// Resolve a relation or fail with `UnknownRelation`
pub fn require_relation(entity: Entity, name: &str) -> Result<&'static RelationDef> {
    entity.relation(name).ok_or_else(|| QuarryError::UnknownRelation {
        entity: entity.name().to_string(),
        relation: name.to_string(),
    })
}

fn type_mismatch(entity: Entity, field: &FieldDef) -> QuarryError {
    QuarryError::TypeMismatch {
        entity: entity.name().to_string(),
        field: field.name.to_string(),
        expected: field.ty.describe(),
    }
}

/// Check that `value` can be stored in `field`. NULL is never storable.
pub fn check_value(entity: Entity, field: &FieldDef, value: &ScalarValue) -> Result<()> {
    let ok = match (field.ty, value) {
        (FieldType::Int, ScalarValue::Int(_)) => true,
        (FieldType::Text, ScalarValue::Text(_)) => true,
        (FieldType::Bool, ScalarValue::Bool(_)) => true,
        (FieldType::Enum(variants), ScalarValue::Text(s)) => variants.contains(&s.as_str()),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(type_mismatch(entity, field))
    }
}

/// Like [`check_value`] but NULL is accepted (comparisons against NULL)
fn check_operand(entity: Entity, field: &FieldDef, value: &ScalarValue) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    check_value(entity, field, value)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

pub fn validate_filter(entity: Entity, filter: &Filter) -> Result<()> {
    if filter.depth() > MAX_FILTER_DEPTH {
        return Err(QuarryError::invalid(format!(
            "filter nesting exceeds {} levels",
            MAX_FILTER_DEPTH
        )));
    }
    validate_filter_node(entity, filter)
}

fn validate_filter_node(entity: Entity, filter: &Filter) -> Result<()> {
    match filter {
        Filter::And(parts) | Filter::Or(parts) => parts
            .iter()
            .try_for_each(|part| validate_filter_node(entity, part)),
        Filter::Not(inner) => validate_filter_node(entity, inner),
        Filter::Field { field, predicate } => {
            let def = require_field(entity, field)?;
            validate_predicate(entity, def, predicate)
        }
        Filter::Relation {
            relation,
            quantifier,
            filter,
        } => {
            let rel = require_relation(entity, relation)?;
            if rel.is_to_many() != quantifier.is_to_many() {
                return Err(QuarryError::QuantifierMismatch {
                    entity: entity.name().to_string(),
                    relation: relation.clone(),
                    quantifier: quantifier.as_str().to_string(),
                });
            }
            validate_filter_node(rel.target, filter)
        }
    }
}

fn validate_predicate(entity: Entity, field: &FieldDef, predicate: &Predicate) -> Result<()> {
    match predicate {
        Predicate::Equals(v) | Predicate::NotEquals(v) => check_operand(entity, field, v),
        Predicate::In(values) | Predicate::NotIn(values) => values
            .iter()
            .try_for_each(|v| check_value(entity, field, v)),
        Predicate::Contains(_) | Predicate::StartsWith(_) | Predicate::EndsWith(_) => {
            match field.ty {
                FieldType::Text | FieldType::Enum(_) => Ok(()),
                _ => Err(type_mismatch(entity, field)),
            }
        }
        Predicate::Gt(v) | Predicate::Gte(v) | Predicate::Lt(v) | Predicate::Lte(v) => {
            match field.ty {
                FieldType::Bool => Err(type_mismatch(entity, field)),
                _ => check_value(entity, field, v),
            }
        }
        Predicate::Not(inner) => validate_predicate(entity, field, inner),
    }
}

// ---------------------------------------------------------------------------
// Projection / sort
// ---------------------------------------------------------------------------

pub fn validate_projection(entity: Entity, projection: &Projection) -> Result<()> {
    match projection {
        Projection::All => Ok(()),
        Projection::Select(items) => {
            if items.is_empty() {
                return Err(QuarryError::invalid(format!(
                    "select on {} must name at least one field",
                    entity
                )));
            }
            let mut seen = BTreeSet::new();
            for item in items {
                let name = match item {
                    SelectItem::Field(name) => {
                        require_field(entity, name)?;
                        name
                    }
                    SelectItem::Relation(sel) => {
                        let rel = require_relation(entity, &sel.relation)?;
                        validate_projection(rel.target, &sel.projection)?;
                        &sel.relation
                    }
                };
                if !seen.insert(name.as_str()) {
                    return Err(QuarryError::invalid(format!(
                        "'{}' selected twice on {}",
                        name, entity
                    )));
                }
            }
            Ok(())
        }
        Projection::Include(relations) => {
            let mut seen = BTreeSet::new();
            for sel in relations {
                let rel = require_relation(entity, &sel.relation)?;
                validate_projection(rel.target, &sel.projection)?;
                if !seen.insert(sel.relation.as_str()) {
                    return Err(QuarryError::invalid(format!(
                        "'{}' included twice on {}",
                        sel.relation, entity
                    )));
                }
            }
            Ok(())
        }
    }
}

pub fn validate_sort(entity: Entity, sort: &Sort) -> Result<&'static FieldDef> {
    require_field(entity, &sort.field)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregated fields must be integers
pub fn require_numeric_field(entity: Entity, name: &str) -> Result<&'static FieldDef> {
    let def = require_field(entity, name)?;
    match def.ty {
        FieldType::Int => Ok(def),
        _ => Err(type_mismatch(entity, def)),
    }
}

pub fn validate_group_by(entity: Entity, args: &GroupByArgs) -> Result<()> {
    if args.by.is_empty() {
        return Err(QuarryError::invalid("group_by needs at least one field"));
    }
    let mut seen = BTreeSet::new();
    for field in &args.by {
        require_field(entity, field)?;
        if !seen.insert(field.as_str()) {
            return Err(QuarryError::invalid(format!("'{}' grouped twice", field)));
        }
    }
    for aggregation in &args.aggregations {
        if let Some(field) = aggregation.field() {
            require_numeric_field(entity, field)?;
        }
    }
    distinct_aggregations(&args.aggregations)?;
    if let Some(filter) = &args.filter {
        validate_filter(entity, filter)?;
    }
    Ok(())
}

/// Reject a group_by whose aggregation list names the same aggregate twice
pub fn distinct_aggregations(aggregations: &[Aggregation]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for a in aggregations {
        if !seen.insert((a.label(), a.field())) {
            return Err(QuarryError::invalid(format!(
                "aggregation {}({}) requested twice",
                a.label(),
                a.field().unwrap_or("*")
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// The identifying field must be unique and the value well-typed
pub fn validate_unique_where(entity: Entity, key: &UniqueWhere) -> Result<&'static FieldDef> {
    let def = require_field(entity, key.field_name())?;
    if !def.unique {
        return Err(QuarryError::NotUnique {
            entity: entity.name().to_string(),
            field: def.name.to_string(),
        });
    }
    check_value(entity, def, &key.value())?;
    Ok(def)
}

/// Validate a create descriptor.
///
/// `supplied_by_parent` names the foreign-key field that a parent fills in
/// when this record is created through a one-to-many relation.
pub fn validate_create(
    entity: Entity,
    data: &CreateData,
    supplied_by_parent: Option<&str>,
) -> Result<()> {
    for (name, value) in &data.fields {
        let def = require_field(entity, name)?;
        if def.generated {
            return Err(QuarryError::ReadOnlyField {
                entity: entity.name().to_string(),
                field: name.clone(),
            });
        }
        if supplied_by_parent == Some(name.as_str()) {
            return Err(QuarryError::invalid(format!(
                "{}.{} is set by the parent record",
                entity, name
            )));
        }
        check_value(entity, def, value)?;
    }

    // Foreign keys filled through a to-one relation write
    let mut fk_from_relation: BTreeSet<&str> = BTreeSet::new();

    for (name, write) in &data.relations {
        let rel = require_relation(entity, name)?;
        if write.is_empty() {
            return Err(QuarryError::invalid(format!(
                "relation write {}.{} is empty",
                entity, name
            )));
        }
        let child_supplied = match rel.kind {
            RelationKind::ToOne { fk_field } => {
                if write.len() != 1 {
                    return Err(QuarryError::invalid(format!(
                        "{}.{} is to-one; exactly one of create/connect/connect_or_create is allowed",
                        entity, name
                    )));
                }
                if supplied_by_parent == Some(fk_field) {
                    return Err(QuarryError::invalid(format!(
                        "{}.{} is set by the parent record",
                        entity, name
                    )));
                }
                if data.fields.contains_key(fk_field) {
                    return Err(QuarryError::invalid(format!(
                        "{}.{} given both as a scalar and through relation '{}'",
                        entity, fk_field, name
                    )));
                }
                fk_from_relation.insert(fk_field);
                None
            }
            RelationKind::ToMany { remote_column } => {
                rel.target.field_by_column(remote_column).map(|f| f.name)
            }
            RelationKind::ManyToMany { .. } => None,
        };

        for key in &write.connect {
            validate_unique_where(rel.target, key)?;
        }
        for entry in &write.connect_or_create {
            validate_unique_where(rel.target, &entry.where_)?;
            validate_create(rel.target, &entry.create, child_supplied)?;
        }
        for child in &write.create {
            validate_create(rel.target, child, child_supplied)?;
        }
    }

    for def in entity.fields() {
        let provided = data.fields.contains_key(def.name)
            || fk_from_relation.contains(def.name)
            || supplied_by_parent == Some(def.name);
        if !provided && !def.generated && !def.has_default {
            return Err(QuarryError::MissingRequiredField {
                entity: entity.name().to_string(),
                field: def.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Bulk creates accept flat descriptors only
pub fn validate_create_flat(entity: Entity, data: &CreateData) -> Result<()> {
    if !data.is_flat() {
        return Err(QuarryError::invalid(format!(
            "create_many on {} does not accept relation writes",
            entity
        )));
    }
    validate_create(entity, data, None)
}

pub fn validate_patch(entity: Entity, patch: &Patch) -> Result<()> {
    if patch.is_empty() {
        return Err(QuarryError::invalid(format!(
            "empty patch for {}",
            entity
        )));
    }
    for (name, update) in &patch.entries {
        let def = require_field(entity, name)?;
        if def.generated {
            return Err(QuarryError::ReadOnlyField {
                entity: entity.name().to_string(),
                field: name.clone(),
            });
        }
        match update {
            FieldUpdate::Set(value) => check_value(entity, def, value)?,
            FieldUpdate::Increment(_) | FieldUpdate::Decrement(_) => {
                if def.ty != FieldType::Int {
                    return Err(type_mismatch(entity, def));
                }
            }
        }
    }
    Ok(())
}
