//! Write primitives
//!
//! Shared by the single-verb façade methods, atomic batches and seed
//! import. Every function here expects to run inside a transaction the
//! caller opened and will commit; none of them validates its descriptor
//! (see [`validate_mutation`]).

#![allow(clippy::result_large_err)]

use quarry_core::errors::{QuarryError, QxError};
use quarry_core::model::{Entity, FieldDef, RelationDef, RelationKind};
use quarry_core::query::{
    BatchCount, CreateData, FieldUpdate, Filter, Mutation, MutationResult, Patch, RelationWrite,
    UniqueWhere,
};
use quarry_core::rules::validation::{
    require_field, require_relation, validate_create, validate_create_flat, validate_filter,
    validate_patch, validate_unique_where,
};
use quarry_core::{Record, ScalarValue};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::errors::{from_rusqlite, Result};
use crate::sql::{column_list, placeholders, read_record, to_sql, WhereBuilder};

/// A column value fixed by the caller rather than the descriptor
pub(crate) type Preset = (&'static FieldDef, ScalarValue);

/// Which branch an upsert took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    }
}

fn not_found(entity: Entity, key: impl ToString) -> QxError {
    QuarryError::RecordNotFound {
        entity: entity.name().to_string(),
        key: key.to_string(),
    }
    .into()
}

fn connect_missing(owner: Entity, rel: &RelationDef, key: &UniqueWhere) -> QxError {
    QuarryError::ConnectTargetMissing {
        entity: owner.name().to_string(),
        relation: rel.name.to_string(),
        key: key.to_string(),
    }
    .into()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an upsert; the create branch may repeat the key but not contradict it
pub(crate) fn validate_upsert(
    entity: Entity,
    where_: &UniqueWhere,
    update: &Patch,
    create: &CreateData,
) -> quarry_core::Result<()> {
    validate_unique_where(entity, where_)?;
    validate_patch(entity, update)?;
    match create.fields.get(where_.field_name()) {
        Some(given) if *given != where_.value() => Err(QuarryError::invalid(format!(
            "upsert create data sets {}.{} to {}, but the key is {}",
            entity,
            where_.field_name(),
            given,
            where_
        ))),
        Some(_) => validate_create(entity, create, None),
        // The key is injected on create, so it counts as provided
        None => validate_create(entity, create, Some(where_.field_name())),
    }
}

/// Check a mutation against the schema without touching the store
pub(crate) fn validate_mutation(mutation: &Mutation) -> quarry_core::Result<()> {
    match mutation {
        Mutation::Create { entity, data } => validate_create(*entity, data, None),
        Mutation::CreateMany { entity, data, .. } => data
            .iter()
            .try_for_each(|row| validate_create_flat(*entity, row)),
        Mutation::Update { entity, patch, .. } => validate_patch(*entity, patch),
        Mutation::UpdateMany {
            entity,
            filter,
            patch,
        } => {
            validate_filter(*entity, filter)?;
            validate_patch(*entity, patch)
        }
        Mutation::Upsert {
            entity,
            where_,
            update,
            create,
        } => validate_upsert(*entity, where_, update, create),
        Mutation::Delete { .. } => Ok(()),
        Mutation::DeleteMany { entity, filter } => validate_filter(*entity, filter),
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Resolve a unique key to an id
pub(crate) fn lookup_id(conn: &Connection, entity: Entity, key: &UniqueWhere) -> Result<Option<i64>> {
    let def = require_field(entity, key.field_name())?;
    let sql = format!("SELECT id FROM {} WHERE {} = ?", entity.table(), def.column);
    conn.query_row(&sql, [to_sql(&key.value())], |row| row.get(0))
        .optional()
        .map_err(from_rusqlite)
}

/// Every scalar of one record
pub(crate) fn fetch_by_id(conn: &Connection, entity: Entity, id: i64) -> Result<Option<Record>> {
    let sql = format!(
        "SELECT {} FROM {} t0 WHERE t0.id = ?",
        column_list(entity, "t0"),
        entity.table()
    );
    conn.query_row(&sql, [id], |row| read_record(entity, row, 0))
        .optional()
        .map_err(from_rusqlite)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Insert one row; `None` when `skip_duplicates` swallowed a collision
fn insert_row(
    conn: &Connection,
    entity: Entity,
    columns: &[&str],
    values: &[Value],
    skip_duplicates: bool,
) -> Result<Option<i64>> {
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", entity.table())
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}){}",
            entity.table(),
            columns.join(", "),
            placeholders(values.len()),
            if skip_duplicates {
                " ON CONFLICT DO NOTHING"
            } else {
                ""
            }
        )
    };

    let changed = conn
        .execute(&sql, params_from_iter(values.iter()))
        .map_err(|e| from_rusqlite(e).with_entity(entity.name()))?;
    if changed == 0 {
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

/// Create a record and everything its relation writes describe
///
/// To-one targets are resolved first so the foreign key is written with
/// the row; to-many and many-to-many writes follow once the id exists.
pub(crate) fn insert_tree(
    conn: &Connection,
    entity: Entity,
    data: &CreateData,
    presets: &[Preset],
) -> Result<i64> {
    let mut columns: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    for (def, value) in presets {
        columns.push(def.column);
        values.push(to_sql(value));
    }
    for (name, value) in &data.fields {
        let def = require_field(entity, name)?;
        columns.push(def.column);
        values.push(to_sql(value));
    }
    for (name, write) in &data.relations {
        let rel = require_relation(entity, name)?;
        if let RelationKind::ToOne { fk_field } = rel.kind {
            let fk = require_field(entity, fk_field)?;
            let target_id = resolve_to_one(conn, entity, rel, write)?;
            columns.push(fk.column);
            values.push(Value::Integer(target_id));
        }
    }

    let id = insert_row(conn, entity, &columns, &values, false)?
        .ok_or_else(|| QxError::from(QuarryError::Persistence {
            message: format!("insert into {} reported no row", entity.table()),
        }))?;

    for (name, write) in &data.relations {
        let rel = require_relation(entity, name)?;
        match rel.kind {
            RelationKind::ToOne { .. } => {}
            RelationKind::ToMany { remote_column } => {
                attach_children(conn, entity, rel, remote_column, id, write)?
            }
            RelationKind::ManyToMany {
                join_table,
                local_column,
                remote_column,
            } => {
                for target_id in resolve_targets(conn, entity, rel, write, &[])? {
                    let sql = format!(
                        "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?, ?)",
                        join_table, local_column, remote_column
                    );
                    conn.execute(&sql, [id, target_id]).map_err(from_rusqlite)?;
                }
            }
        }
    }

    Ok(id)
}

/// The single target of a to-one write
fn resolve_to_one(
    conn: &Connection,
    owner: Entity,
    rel: &RelationDef,
    write: &RelationWrite,
) -> Result<i64> {
    resolve_targets(conn, owner, rel, write, &[])?
        .into_iter()
        .next()
        .ok_or_else(|| {
            QuarryError::invalid(format!("relation write {}.{} is empty", owner, rel.name)).into()
        })
}

/// Ids of every record a relation write ends up pointing at, in the
/// order connect, connect-or-create, create. Created children receive
/// `presets`.
fn resolve_targets(
    conn: &Connection,
    owner: Entity,
    rel: &RelationDef,
    write: &RelationWrite,
    presets: &[Preset],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(write.len());

    for key in &write.connect {
        let id = lookup_id(conn, rel.target, key)?.ok_or_else(|| connect_missing(owner, rel, key))?;
        ids.push(id);
    }
    for entry in &write.connect_or_create {
        // An existing match wins; the create data is then ignored
        let id = match lookup_id(conn, rel.target, &entry.where_)? {
            Some(id) => id,
            None => insert_tree(conn, rel.target, &entry.create, presets)?,
        };
        ids.push(id);
    }
    for child in &write.create {
        ids.push(insert_tree(conn, rel.target, child, presets)?);
    }

    Ok(ids)
}

/// One-to-many: point children's foreign key at `parent_id`
fn attach_children(
    conn: &Connection,
    owner: Entity,
    rel: &RelationDef,
    remote_column: &str,
    parent_id: i64,
    write: &RelationWrite,
) -> Result<()> {
    let fk = rel
        .target
        .field_by_column(remote_column)
        .ok_or_else(|| QuarryError::UnknownField {
            entity: rel.target.name().to_string(),
            field: remote_column.to_string(),
        })?;
    let presets = [(fk, ScalarValue::Int(parent_id))];

    // Created children already carry the parent id; connected ones are
    // re-pointed.
    let created = write.create.len();
    let targets = resolve_targets(conn, owner, rel, write, &presets)?;
    let reattach = targets.len() - created;

    let sql = format!(
        "UPDATE {} SET {} = ? WHERE id = ?",
        rel.target.table(),
        remote_column
    );
    for target_id in targets.into_iter().take(reattach) {
        conn.execute(&sql, [parent_id, target_id])
            .map_err(from_rusqlite)?;
    }
    Ok(())
}

/// Flat bulk insert; skipped duplicates are not counted
pub(crate) fn create_many(
    conn: &Connection,
    entity: Entity,
    rows: &[CreateData],
    skip_duplicates: bool,
) -> Result<BatchCount> {
    let mut count = 0;
    for data in rows {
        let mut columns = Vec::with_capacity(data.fields.len());
        let mut values = Vec::with_capacity(data.fields.len());
        for (name, value) in &data.fields {
            columns.push(require_field(entity, name)?.column);
            values.push(to_sql(value));
        }
        if insert_row(conn, entity, &columns, &values, skip_duplicates)?.is_some() {
            count += 1;
        }
    }
    Ok(BatchCount { count })
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// `a = ?, like_num = like_num + ?` plus its parameters
fn set_clause(entity: Entity, patch: &Patch) -> Result<(String, Vec<Value>)> {
    let mut parts = Vec::with_capacity(patch.entries.len());
    let mut params = Vec::with_capacity(patch.entries.len());
    for (name, update) in &patch.entries {
        let column = require_field(entity, name)?.column;
        match update {
            FieldUpdate::Set(value) => {
                parts.push(format!("{} = ?", column));
                params.push(to_sql(value));
            }
            FieldUpdate::Increment(by) => {
                parts.push(format!("{c} = {c} + ?", c = column));
                params.push(Value::Integer(*by));
            }
            FieldUpdate::Decrement(by) => {
                parts.push(format!("{c} = {c} - ?", c = column));
                params.push(Value::Integer(*by));
            }
        }
    }
    Ok((parts.join(", "), params))
}

pub(crate) fn update_by_id(conn: &Connection, entity: Entity, id: i64, patch: &Patch) -> Result<Record> {
    let (set, mut params) = set_clause(entity, patch)?;
    params.push(Value::Integer(id));
    let sql = format!("UPDATE {} SET {} WHERE id = ?", entity.table(), set);

    let changed = conn
        .execute(&sql, params_from_iter(params.iter()))
        .map_err(|e| from_rusqlite(e).with_entity(entity.name()))?;
    if changed == 0 {
        return Err(not_found(entity, UniqueWhere::Id(id)));
    }
    fetch_by_id(conn, entity, id)?.ok_or_else(|| not_found(entity, UniqueWhere::Id(id)))
}

/// Translate a filter into `id IN (SELECT ...)` for bulk statements
fn matching_ids(entity: Entity, filter: &Filter, params: &mut Vec<Value>) -> Result<String> {
    let mut w = WhereBuilder::new();
    let alias = w.alias();
    let condition = w.filter(entity, &alias, filter)?;
    params.extend(w.params().iter().cloned());
    Ok(format!(
        "id IN (SELECT {a}.id FROM {t} {a} WHERE {c})",
        a = alias,
        t = entity.table(),
        c = condition
    ))
}

pub(crate) fn update_where(
    conn: &Connection,
    entity: Entity,
    filter: &Filter,
    patch: &Patch,
) -> Result<BatchCount> {
    let (set, mut params) = set_clause(entity, patch)?;
    let condition = matching_ids(entity, filter, &mut params)?;
    let sql = format!("UPDATE {} SET {} WHERE {}", entity.table(), set, condition);

    let changed = conn
        .execute(&sql, params_from_iter(params.iter()))
        .map_err(|e| from_rusqlite(e).with_entity(entity.name()))?;
    Ok(BatchCount {
        count: changed as u64,
    })
}

/// Update the record `where_` names, or create it
///
/// The key is copied into the create data when the caller left it out.
pub(crate) fn upsert(
    conn: &Connection,
    entity: Entity,
    where_: &UniqueWhere,
    update: &Patch,
    create: &CreateData,
) -> Result<(Record, UpsertOutcome)> {
    if let Some(id) = lookup_id(conn, entity, where_)? {
        let record = update_by_id(conn, entity, id, update)?;
        return Ok((record, UpsertOutcome::Updated));
    }

    let key_def = require_field(entity, where_.field_name())?;
    let presets: Vec<Preset> = if create.fields.contains_key(key_def.name) {
        Vec::new()
    } else {
        vec![(key_def, where_.value())]
    };
    let id = insert_tree(conn, entity, create, &presets)?;
    let record = fetch_by_id(conn, entity, id)?.ok_or_else(|| not_found(entity, UniqueWhere::Id(id)))?;
    Ok((record, UpsertOutcome::Created))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

pub(crate) fn delete_by_id(conn: &Connection, entity: Entity, id: i64) -> Result<Record> {
    let record = fetch_by_id(conn, entity, id)?.ok_or_else(|| not_found(entity, UniqueWhere::Id(id)))?;
    let sql = format!("DELETE FROM {} WHERE id = ?", entity.table());
    conn.execute(&sql, [id])
        .map_err(|e| from_rusqlite(e).with_entity(entity.name()))?;
    Ok(record)
}

pub(crate) fn delete_where(conn: &Connection, entity: Entity, filter: &Filter) -> Result<BatchCount> {
    let mut params = Vec::new();
    let condition = matching_ids(entity, filter, &mut params)?;
    let sql = format!("DELETE FROM {} WHERE {}", entity.table(), condition);
    let changed = conn
        .execute(&sql, params_from_iter(params.iter()))
        .map_err(|e| from_rusqlite(e).with_entity(entity.name()))?;
    Ok(BatchCount {
        count: changed as u64,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run one already-validated mutation
pub(crate) fn apply(conn: &Connection, mutation: &Mutation) -> Result<MutationResult> {
    let result = match mutation {
        Mutation::Create { entity, data } => {
            let id = insert_tree(conn, *entity, data, &[])?;
            let record =
                fetch_by_id(conn, *entity, id)?.ok_or_else(|| not_found(*entity, UniqueWhere::Id(id)))?;
            MutationResult::Record(record)
        }
        Mutation::CreateMany {
            entity,
            data,
            skip_duplicates,
        } => MutationResult::Count(create_many(conn, *entity, data, *skip_duplicates)?),
        Mutation::Update { entity, id, patch } => {
            MutationResult::Record(update_by_id(conn, *entity, *id, patch)?)
        }
        Mutation::UpdateMany {
            entity,
            filter,
            patch,
        } => MutationResult::Count(update_where(conn, *entity, filter, patch)?),
        Mutation::Upsert {
            entity,
            where_,
            update,
            create,
        } => MutationResult::Record(upsert(conn, *entity, where_, update, create)?.0),
        Mutation::Delete { entity, id } => MutationResult::Record(delete_by_id(conn, *entity, *id)?),
        Mutation::DeleteMany { entity, filter } => {
            MutationResult::Count(delete_where(conn, *entity, filter)?)
        }
    };
    Ok(result)
}
