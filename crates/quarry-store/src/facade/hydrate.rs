//! Projection shaping and relation loading
//!
//! Relations are loaded one batch per relation per level (`IN (...)` over
//! the parent ids), never one query per parent row.

#![allow(clippy::result_large_err)]

use std::collections::{BTreeSet, HashMap};

use quarry_core::model::{Entity, RelationDef, RelationKind};
use quarry_core::query::{Projection, SelectItem};
use quarry_core::rules::validation::require_relation;
use quarry_core::Record;
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::Value;

use crate::errors::{from_rusqlite, Result};
use crate::sql::{column_list, placeholders, read_record};

/// Keeps statements well under SQLite's bound-parameter limit
const IN_CHUNK: usize = 500;

/// Shape full-scalar rows of `entity` according to `projection`,
/// loading any requested relations
pub(crate) fn shape(
    conn: &Connection,
    entity: Entity,
    rows: Vec<Record>,
    projection: &Projection,
) -> Result<Vec<Record>> {
    let mut loaded = Vec::new();
    for selection in projection.relations() {
        let rel = require_relation(entity, &selection.relation)?;
        let by_parent = load_relation(conn, entity, rel, &rows, &selection.projection)?;
        loaded.push((rel, by_parent));
    }

    let mut shaped = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id();
        let mut out = match projection {
            Projection::Select(items) => {
                let mut picked = Record::new();
                for item in items {
                    if let SelectItem::Field(name) = item {
                        if let Some(value) = row.get(name) {
                            picked.insert(name.clone(), value.clone());
                        }
                    }
                }
                picked
            }
            Projection::All | Projection::Include(_) => row,
        };

        for (rel, by_parent) in &loaded {
            let value = id
                .and_then(|id| by_parent.get(&id))
                .cloned()
                .unwrap_or_else(|| empty_relation(rel));
            out.insert(rel.name, value);
        }
        shaped.push(out);
    }
    Ok(shaped)
}

/// Value of a relation with no related records
fn empty_relation(rel: &RelationDef) -> Value {
    if rel.is_to_many() {
        Value::Array(Vec::new())
    } else {
        Value::Null
    }
}

/// Related records keyed by parent id
fn load_relation(
    conn: &Connection,
    entity: Entity,
    rel: &RelationDef,
    parents: &[Record],
    projection: &Projection,
) -> Result<HashMap<i64, Value>> {
    let target = rel.target;
    let cols = column_list(target, "t0");
    let mut by_parent: HashMap<i64, Value> = HashMap::new();

    match rel.kind {
        RelationKind::ToOne { fk_field } => {
            let links: Vec<(i64, i64)> = parents
                .iter()
                .filter_map(|p| Some((p.id()?, p.get_i64(fk_field)?)))
                .collect();
            let target_ids: Vec<i64> = links
                .iter()
                .map(|(_, fk)| *fk)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let targets = query_chunked(
                conn,
                &target_ids,
                |ph| format!("SELECT {} FROM {} t0 WHERE t0.id IN ({})", cols, target.table(), ph),
                |row| read_record(target, row, 0),
            )?;
            let ids: Vec<Option<i64>> = targets.iter().map(Record::id).collect();
            let by_id: HashMap<i64, Value> = ids
                .into_iter()
                .zip(shape(conn, target, targets, projection)?)
                .filter_map(|(id, rec)| Some((id?, rec.into_json())))
                .collect();

            for (parent, fk) in links {
                if let Some(value) = by_id.get(&fk) {
                    by_parent.insert(parent, value.clone());
                }
            }
        }
        RelationKind::ToMany { remote_column } => {
            let fk_name = target
                .field_by_column(remote_column)
                .map(|f| f.name)
                .unwrap_or(remote_column);
            let parent_ids = ids_of(parents);
            let children = query_chunked(
                conn,
                &parent_ids,
                |ph| {
                    format!(
                        "SELECT {} FROM {} t0 WHERE t0.{} IN ({}) ORDER BY t0.id",
                        cols,
                        target.table(),
                        remote_column,
                        ph
                    )
                },
                |row| read_record(target, row, 0),
            )?;
            let owners: Vec<Option<i64>> = children.iter().map(|c| c.get_i64(fk_name)).collect();
            group_into(&mut by_parent, owners, shape(conn, target, children, projection)?);
        }
        RelationKind::ManyToMany {
            join_table,
            local_column,
            remote_column,
        } => {
            let parent_ids = ids_of(parents);
            let pairs = query_chunked(
                conn,
                &parent_ids,
                |ph| {
                    format!(
                        "SELECT j.{lc}, {cols} FROM {jt} j JOIN {tt} t0 ON t0.id = j.{rc} \
                         WHERE j.{lc} IN ({ph}) ORDER BY t0.id",
                        lc = local_column,
                        cols = cols,
                        jt = join_table,
                        tt = target.table(),
                        rc = remote_column,
                        ph = ph
                    )
                },
                |row| Ok((row.get::<_, i64>(0)?, read_record(target, row, 1)?)),
            )?;
            let (owners, records): (Vec<i64>, Vec<Record>) = pairs.into_iter().unzip();
            let owners = owners.into_iter().map(Some).collect();
            group_into(&mut by_parent, owners, shape(conn, target, records, projection)?);
        }
    }

    tracing::debug!(
        component = "hydrate",
        entity = entity.name(),
        relation = rel.name,
        parents = parents.len(),
        "relation loaded"
    );
    Ok(by_parent)
}

fn ids_of(records: &[Record]) -> Vec<i64> {
    records.iter().filter_map(Record::id).collect()
}

/// Append each shaped child to its owner's array
fn group_into(by_parent: &mut HashMap<i64, Value>, owners: Vec<Option<i64>>, children: Vec<Record>) {
    for (owner, child) in owners.into_iter().zip(children) {
        let Some(owner) = owner else { continue };
        let slot = by_parent
            .entry(owner)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(child.into_json());
        }
    }
}

/// Run `sql_for(placeholders)` once per chunk of `ids`
fn query_chunked<T>(
    conn: &Connection,
    ids: &[i64],
    sql_for: impl Fn(&str) -> String,
    read: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = sql_for(&placeholders(chunk.len()));
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params_from_iter(chunk.iter()), |row| read(row))
            .map_err(from_rusqlite)?;
        for row in rows {
            out.push(row.map_err(from_rusqlite)?);
        }
    }
    Ok(out)
}
