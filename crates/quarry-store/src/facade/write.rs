//! Write verbs: create, create_many, update, update_many, upsert, delete,
//! delete_many. Each runs in its own immediate transaction.

#![allow(clippy::result_large_err)]

use quarry_core::model::Entity;
use quarry_core::query::{BatchCount, CreateData, Filter, Patch, UniqueWhere};
use quarry_core::rules::validation::{
    validate_create, validate_create_flat, validate_filter, validate_patch,
};
use quarry_core::{QuarryError, Record};

use super::exec;
use super::{in_write_tx, Facade};
use crate::errors::Result;

impl Facade<'_> {
    /// Create a record with any nested relation writes, all or nothing
    pub fn create(&mut self, entity: Entity, data: &CreateData) -> Result<Record> {
        self.observe(
            "create",
            entity.name(),
            |db| {
                validate_create(entity, data, None)?;
                in_write_tx(db, |tx| {
                    let id = exec::insert_tree(tx, entity, data, &[])?;
                    exec::fetch_by_id(tx, entity, id)?.ok_or_else(|| {
                        QuarryError::RecordNotFound {
                            entity: entity.name().to_string(),
                            key: UniqueWhere::Id(id).to_string(),
                        }
                        .into()
                    })
                })
            },
            |_| 1,
        )
    }

    /// Insert flat records; with `skip_duplicates` unique collisions are
    /// skipped, otherwise the first one rolls everything back
    pub fn create_many(
        &mut self,
        entity: Entity,
        data: &[CreateData],
        skip_duplicates: bool,
    ) -> Result<BatchCount> {
        self.observe(
            "create_many",
            entity.name(),
            |db| {
                data.iter()
                    .try_for_each(|row| validate_create_flat(entity, row))?;
                in_write_tx(db, |tx| exec::create_many(tx, entity, data, skip_duplicates))
            },
            |count| count.count,
        )
    }

    /// Patch one record; `NotFound` when `id` does not exist
    pub fn update(&mut self, entity: Entity, id: i64, patch: &Patch) -> Result<Record> {
        self.observe(
            "update",
            entity.name(),
            |db| {
                validate_patch(entity, patch)?;
                in_write_tx(db, |tx| exec::update_by_id(tx, entity, id, patch))
            },
            |_| 1,
        )
    }

    pub fn update_many(&mut self, entity: Entity, filter: &Filter, patch: &Patch) -> Result<BatchCount> {
        self.observe(
            "update_many",
            entity.name(),
            |db| {
                validate_filter(entity, filter)?;
                validate_patch(entity, patch)?;
                in_write_tx(db, |tx| exec::update_where(tx, entity, filter, patch))
            },
            |count| count.count,
        )
    }

    /// Update the record `where_` identifies, or create it
    ///
    /// Lookup and write share one immediate transaction, so concurrent
    /// upserts of the same absent key yield one create and one update.
    pub fn upsert(
        &mut self,
        entity: Entity,
        where_: &UniqueWhere,
        update: &Patch,
        create: &CreateData,
    ) -> Result<Record> {
        self.observe(
            "upsert",
            entity.name(),
            |db| {
                exec::validate_upsert(entity, where_, update, create)?;
                let (record, outcome) =
                    in_write_tx(db, |tx| exec::upsert(tx, entity, where_, update, create))?;
                tracing::debug!(
                    component = "facade",
                    entity = entity.name(),
                    key = %where_,
                    outcome = outcome.as_str(),
                    "upsert resolved"
                );
                Ok(record)
            },
            |_| 1,
        )
    }

    /// Remove one record and return it; `NotFound` when absent
    pub fn delete(&mut self, entity: Entity, id: i64) -> Result<Record> {
        self.observe(
            "delete",
            entity.name(),
            |db| in_write_tx(db, |tx| exec::delete_by_id(tx, entity, id)),
            |_| 1,
        )
    }

    pub fn delete_many(&mut self, entity: Entity, filter: &Filter) -> Result<BatchCount> {
        self.observe(
            "delete_many",
            entity.name(),
            |db| {
                validate_filter(entity, filter)?;
                in_write_tx(db, |tx| exec::delete_where(tx, entity, filter))
            },
            |count| count.count,
        )
    }
}
