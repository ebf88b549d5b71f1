//! Read verbs: find, find_unique, count, aggregate, group_by

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;

use quarry_core::errors::QuarryError;
use quarry_core::model::Entity;
use quarry_core::query::{
    AggregateSummary, Aggregation, Direction, Filter, FindArgs, GroupByArgs, GroupSummary, Page,
    Projection, Sort, UniqueWhere,
};
use quarry_core::rules::validation::{
    require_field, require_numeric_field, validate_filter, validate_group_by, validate_projection,
    validate_sort, validate_unique_where,
};
use quarry_core::{Record, ScalarValue};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::hydrate::shape;
use super::Facade;
use crate::errors::{from_rusqlite, Result};
use crate::sql::{column_list, read_record, read_scalar, WhereBuilder};

impl Facade<'_> {
    /// Records of `entity` matching the filter, shaped, sorted and paged
    pub fn find(&mut self, entity: Entity, args: &FindArgs) -> Result<Vec<Record>> {
        self.observe(
            "find",
            entity.name(),
            |db| find_records(db.conn(), entity, args),
            |rows| rows.len() as u64,
        )
    }

    /// The single record a unique key names, if any
    pub fn find_unique(
        &mut self,
        entity: Entity,
        key: &UniqueWhere,
        projection: &Projection,
    ) -> Result<Option<Record>> {
        self.observe(
            "find_unique",
            entity.name(),
            |db| {
                validate_unique_where(entity, key)?;
                let args = FindArgs::new()
                    .filter(Filter::equals(key.field_name(), key.value()))
                    .projection(projection.clone())
                    .page(Page::first(1));
                Ok(find_records(db.conn(), entity, &args)?.into_iter().next())
            },
            |found| u64::from(found.is_some()),
        )
    }

    pub fn count(&mut self, entity: Entity, filter: Option<&Filter>) -> Result<u64> {
        self.observe(
            "count",
            entity.name(),
            |db| {
                if let Some(filter) = filter {
                    validate_filter(entity, filter)?;
                }
                let mut w = WhereBuilder::new();
                let alias = w.alias();
                let condition = where_clause(&mut w, entity, &alias, filter)?;
                let sql = format!(
                    "SELECT COUNT(*) FROM {} {} WHERE {}",
                    entity.table(),
                    alias,
                    condition
                );
                let n: i64 = db
                    .conn()
                    .query_row(&sql, params_from_iter(w.params().iter()), |row| row.get(0))
                    .map_err(from_rusqlite)?;
                Ok(n as u64)
            },
            |_| 1,
        )
    }

    /// Count, sum, average, minimum and maximum of an integer field
    pub fn aggregate(
        &mut self,
        entity: Entity,
        field: &str,
        filter: Option<&Filter>,
    ) -> Result<AggregateSummary> {
        self.observe(
            "aggregate",
            entity.name(),
            |db| {
                let def = require_numeric_field(entity, field)?;
                if let Some(filter) = filter {
                    validate_filter(entity, filter)?;
                }
                let mut w = WhereBuilder::new();
                let alias = w.alias();
                let condition = where_clause(&mut w, entity, &alias, filter)?;
                let col = format!("{}.{}", alias, def.column);
                let sql = format!(
                    "SELECT COUNT(*), COALESCE(SUM({c}), 0), AVG({c}), MIN({c}), MAX({c}) \
                     FROM {t} {a} WHERE {w}",
                    c = col,
                    t = entity.table(),
                    a = alias,
                    w = condition
                );
                db.conn()
                    .query_row(&sql, params_from_iter(w.params().iter()), |row| {
                        Ok(AggregateSummary {
                            field: def.name.to_string(),
                            count: row.get(0)?,
                            sum: row.get(1)?,
                            avg: row.get(2)?,
                            min: row.get(3)?,
                            max: row.get(4)?,
                        })
                    })
                    .map_err(from_rusqlite)
            },
            |summary| summary.count as u64,
        )
    }

    /// Partition by the `by` fields and aggregate each partition
    pub fn group_by(&mut self, entity: Entity, args: &GroupByArgs) -> Result<Vec<GroupSummary>> {
        self.observe(
            "group_by",
            entity.name(),
            |db| group_records(db.conn(), entity, args),
            |groups| groups.len() as u64,
        )
    }
}

fn where_clause(
    w: &mut WhereBuilder,
    entity: Entity,
    alias: &str,
    filter: Option<&Filter>,
) -> Result<String> {
    match filter {
        Some(filter) => Ok(w.filter(entity, alias, filter)?),
        None => Ok("1".to_string()),
    }
}

pub(crate) fn find_records(conn: &Connection, entity: Entity, args: &FindArgs) -> Result<Vec<Record>> {
    if let Some(filter) = &args.filter {
        validate_filter(entity, filter)?;
    }
    validate_projection(entity, &args.projection)?;
    let sort_def = match &args.sort {
        Some(sort) => validate_sort(entity, sort)?,
        None => entity.id_field(),
    };
    let direction = args
        .sort
        .as_ref()
        .map(|s: &Sort| s.direction)
        .unwrap_or(Direction::Asc);

    let mut w = WhereBuilder::new();
    let alias = w.alias();
    let mut conditions = vec![where_clause(&mut w, entity, &alias, args.filter.as_ref())?];
    let sort_col = format!("{}.{}", alias, sort_def.column);

    let mut limit = String::new();
    match &args.page {
        None => {}
        Some(Page::Offset { index, size }) => {
            let skip = index.checked_mul(*size).ok_or_else(|| {
                QuarryError::invalid(format!("page {} of size {} is out of range", index, size))
            })?;
            let skip = to_sql_count(skip)?;
            let size = to_sql_count(*size)?;
            limit = format!(" LIMIT {} OFFSET {}", w.bind(size), w.bind(skip));
        }
        Some(Page::Cursor { after, size }) => {
            // Rows strictly after the cursor row in (sort, id) order. An
            // unknown cursor makes the pivot NULL and the page empty.
            let cmp = match direction {
                Direction::Asc => ">",
                Direction::Desc => "<",
            };
            let pivot = w.alias();
            let pivot_sql = format!(
                "(SELECT {p}.{c} FROM {t} {p} WHERE {p}.id = ?)",
                p = pivot,
                c = sort_def.column,
                t = entity.table()
            );
            conditions.push(format!(
                "({s} {cmp} {pv} OR ({s} = {pv} AND {a}.id {cmp} ?))",
                s = sort_col,
                cmp = cmp,
                pv = pivot_sql,
                a = alias
            ));
            for _ in 0..3 {
                w.bind(Value::Integer(*after));
            }
            limit = format!(" LIMIT {}", w.bind(to_sql_count(*size)?));
        }
    }

    let sql = format!(
        "SELECT {cols} FROM {t} {a} WHERE {w} ORDER BY {s} {d}, {a}.id {d}{l}",
        cols = column_list(entity, &alias),
        t = entity.table(),
        a = alias,
        w = conditions.join(" AND "),
        s = sort_col,
        d = direction.sql(),
        l = limit
    );

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params_from_iter(w.params().iter()), |row| read_record(entity, row, 0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    shape(conn, entity, rows, &args.projection)
}

fn to_sql_count(n: u64) -> Result<Value> {
    i64::try_from(n)
        .map(Value::Integer)
        .map_err(|_| QuarryError::invalid(format!("{} exceeds the supported page range", n)).into())
}

fn group_records(conn: &Connection, entity: Entity, args: &GroupByArgs) -> Result<Vec<GroupSummary>> {
    validate_group_by(entity, args)?;

    let mut w = WhereBuilder::new();
    let alias = w.alias();
    let condition = where_clause(&mut w, entity, &alias, args.filter.as_ref())?;

    let keys = args
        .by
        .iter()
        .map(|name| require_field(entity, name))
        .collect::<quarry_core::Result<Vec<_>>>()?;
    let key_cols: Vec<String> = keys
        .iter()
        .map(|def| format!("{}.{}", alias, def.column))
        .collect();

    let mut select = key_cols.clone();
    let mut agg_defs = Vec::with_capacity(args.aggregations.len());
    for aggregation in &args.aggregations {
        let expr = match aggregation {
            Aggregation::Count => "COUNT(*)".to_string(),
            other => {
                let def = require_numeric_field(entity, other.field().unwrap_or_default())?;
                let col = format!("{}.{}", alias, def.column);
                match other {
                    Aggregation::Sum(_) => format!("COALESCE(SUM({}), 0)", col),
                    Aggregation::Avg(_) => format!("AVG({})", col),
                    Aggregation::Min(_) => format!("MIN({})", col),
                    _ => format!("MAX({})", col),
                }
            }
        };
        select.push(expr);
        agg_defs.push(aggregation);
    }

    let sql = format!(
        "SELECT {sel} FROM {t} {a} WHERE {w} GROUP BY {k} ORDER BY {k}",
        sel = select.join(", "),
        t = entity.table(),
        a = alias,
        w = condition,
        k = key_cols.join(", ")
    );

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let groups = stmt
        .query_map(params_from_iter(w.params().iter()), |row| {
            let mut key = BTreeMap::new();
            for (i, def) in keys.iter().enumerate() {
                key.insert(def.name.to_string(), read_scalar(row, i, def)?);
            }
            let mut aggregates = Vec::with_capacity(agg_defs.len());
            for (j, aggregation) in agg_defs.iter().enumerate() {
                let idx = keys.len() + j;
                let value = match aggregation {
                    Aggregation::Avg(_) => ScalarValue::from_optional_f64(row.get(idx)?),
                    _ => row
                        .get::<_, Option<i64>>(idx)?
                        .map_or(ScalarValue::Null, ScalarValue::Int),
                };
                aggregates.push(((*aggregation).clone(), value));
            }
            Ok(GroupSummary { key, aggregates })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    Ok(groups)
}
