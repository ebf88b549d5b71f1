//! Filter tree to SQL `WHERE` translation
//!
//! Produces a boolean SQL expression plus positional parameters. Relation
//! quantifiers become correlated `EXISTS` subqueries; every table
//! reference gets a fresh alias (`t0`, `t1`, ...) so nested subqueries
//! never shadow each other.

use quarry_core::errors::Result;
use quarry_core::model::{Entity, RelationDef, RelationKind};
use quarry_core::query::{Filter, Predicate, Quantifier};
use quarry_core::rules::validation::{require_field, require_relation};
use quarry_core::ScalarValue;
use rusqlite::types::Value;

use super::rows::to_sql;

/// Accumulates parameters and hands out table aliases for one statement
#[derive(Debug, Default)]
pub(crate) struct WhereBuilder {
    next_alias: usize,
    params: Vec<Value>,
}

impl WhereBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alias(&mut self) -> String {
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;
        alias
    }

    /// Append a parameter and return its placeholder
    pub(crate) fn bind(&mut self, value: Value) -> &'static str {
        self.params.push(value);
        "?"
    }

    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }

    /// Translate `filter` over rows of `entity` aliased as `alias`
    pub(crate) fn filter(&mut self, entity: Entity, alias: &str, filter: &Filter) -> Result<String> {
        match filter {
            Filter::And(parts) => self.junction(entity, alias, parts, " AND ", "1"),
            Filter::Or(parts) => self.junction(entity, alias, parts, " OR ", "0"),
            Filter::Not(inner) => Ok(format!("NOT ({})", self.filter(entity, alias, inner)?)),
            Filter::Field { field, predicate } => {
                let def = require_field(entity, field)?;
                let column = format!("{}.{}", alias, def.column);
                Ok(self.predicate(&column, predicate))
            }
            Filter::Relation {
                relation,
                quantifier,
                filter,
            } => {
                let rel = require_relation(entity, relation)?;
                self.quantified(entity, alias, rel, *quantifier, filter)
            }
        }
    }

    fn junction(
        &mut self,
        entity: Entity,
        alias: &str,
        parts: &[Filter],
        separator: &str,
        identity: &str,
    ) -> Result<String> {
        if parts.is_empty() {
            return Ok(identity.to_string());
        }
        let clauses = parts
            .iter()
            .map(|part| self.filter(entity, alias, part))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", clauses.join(separator)))
    }

    fn predicate(&mut self, column: &str, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Equals(ScalarValue::Null) => format!("{} IS NULL", column),
            Predicate::NotEquals(ScalarValue::Null) => format!("{} IS NOT NULL", column),
            Predicate::Equals(v) => format!("{} = {}", column, self.bind(to_sql(v))),
            Predicate::NotEquals(v) => format!("{} <> {}", column, self.bind(to_sql(v))),
            Predicate::In(values) if values.is_empty() => "0".to_string(),
            Predicate::NotIn(values) if values.is_empty() => "1".to_string(),
            Predicate::In(values) => format!("{} IN ({})", column, self.bind_list(values)),
            Predicate::NotIn(values) => format!("{} NOT IN ({})", column, self.bind_list(values)),
            Predicate::Contains(s) => self.like(column, format!("%{}%", escape_like(s))),
            Predicate::StartsWith(s) => self.like(column, format!("{}%", escape_like(s))),
            Predicate::EndsWith(s) => self.like(column, format!("%{}", escape_like(s))),
            Predicate::Gt(v) => format!("{} > {}", column, self.bind(to_sql(v))),
            Predicate::Gte(v) => format!("{} >= {}", column, self.bind(to_sql(v))),
            Predicate::Lt(v) => format!("{} < {}", column, self.bind(to_sql(v))),
            Predicate::Lte(v) => format!("{} <= {}", column, self.bind(to_sql(v))),
            Predicate::Not(inner) => format!("NOT ({})", self.predicate(column, inner)),
        }
    }

    fn bind_list(&mut self, values: &[ScalarValue]) -> String {
        values
            .iter()
            .map(|v| self.bind(to_sql(v)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn like(&mut self, column: &str, pattern: String) -> String {
        format!("{} LIKE {} ESCAPE '\\'", column, self.bind(Value::Text(pattern)))
    }

    fn quantified(
        &mut self,
        owner: Entity,
        alias: &str,
        rel: &RelationDef,
        quantifier: Quantifier,
        inner: &Filter,
    ) -> Result<String> {
        let target = self.alias();
        let (from, link) = match rel.kind {
            RelationKind::ToOne { fk_field } => {
                let fk = require_field(owner, fk_field)?;
                (
                    format!("{} {}", rel.target.table(), target),
                    format!("{}.id = {}.{}", target, alias, fk.column),
                )
            }
            RelationKind::ToMany { remote_column } => (
                format!("{} {}", rel.target.table(), target),
                format!("{}.{} = {}.id", target, remote_column, alias),
            ),
            RelationKind::ManyToMany {
                join_table,
                local_column,
                remote_column,
            } => {
                let join = self.alias();
                (
                    format!(
                        "{jt} {j} JOIN {tt} {t} ON {t}.id = {j}.{rc}",
                        jt = join_table,
                        j = join,
                        tt = rel.target.table(),
                        t = target,
                        rc = remote_column
                    ),
                    format!("{}.{} = {}.id", join, local_column, alias),
                )
            }
        };

        let condition = self.filter(rel.target, &target, inner)?;
        let sql = match quantifier {
            Quantifier::Some | Quantifier::Is => {
                format!("EXISTS (SELECT 1 FROM {} WHERE {} AND {})", from, link, condition)
            }
            Quantifier::None | Quantifier::IsNot => {
                format!("NOT EXISTS (SELECT 1 FROM {} WHERE {} AND {})", from, link, condition)
            }
            // No related record fails the condition; vacuously true when empty
            Quantifier::Every => format!(
                "NOT EXISTS (SELECT 1 FROM {} WHERE {} AND NOT COALESCE(({}), 0))",
                from, link, condition
            ),
        };
        Ok(sql)
    }
}

/// Escape LIKE wildcards so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
