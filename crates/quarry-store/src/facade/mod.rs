//! The query façade
//!
//! `Facade` borrows an open [`Database`] and exposes one method per verb.
//! Every verb validates its descriptor, runs against the store (writes
//! inside a `BEGIN IMMEDIATE` transaction) and is bracketed by the
//! canonical start/end log events.

#![allow(clippy::result_large_err)]

mod batch;
pub(crate) mod exec;
mod hydrate;
mod read;
mod write;

use std::time::Instant;

use quarry_core::errors::QxError;
use quarry_core::{log_op_end, log_op_error, log_op_start};
use quarry_core_types::RequestContext;
use rusqlite::{Transaction, TransactionBehavior};

use crate::db::Database;
use crate::errors::{from_rusqlite, Result};

/// Query façade over one database connection
///
/// Stateless between calls; holds only the borrowed database and the
/// request context stamped onto logs and errors.
pub struct Facade<'db> {
    db: &'db mut Database,
    ctx: RequestContext,
}

impl<'db> Facade<'db> {
    pub fn new(db: &'db mut Database) -> Self {
        Self {
            db,
            ctx: RequestContext::new(),
        }
    }

    pub fn with_context(db: &'db mut Database, ctx: RequestContext) -> Self {
        Self { db, ctx }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn database(&self) -> &Database {
        &*self.db
    }

    /// Run `body` bracketed by start/end log events
    ///
    /// `rows` reports how many records the result carries.
    fn observe<T>(
        &mut self,
        op: &'static str,
        entity: &'static str,
        body: impl FnOnce(&mut Database) -> Result<T>,
        rows: impl Fn(&T) -> u64,
    ) -> Result<T> {
        let request_id = self.ctx.request_id.clone();
        log_op_start!(op, entity = entity, request_id = %request_id);
        let start = Instant::now();

        let result = body(&mut *self.db);

        let elapsed = start.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                log_op_end!(op, duration_ms = elapsed, rows = rows(&value), request_id = %request_id);
                Ok(value)
            }
            Err(err) => {
                let err = decorate(err, op, &self.ctx);
                log_op_error!(op, err.clone(), duration_ms = elapsed, request_id = %request_id);
                Err(err)
            }
        }
    }
}

fn decorate(err: QxError, op: &str, ctx: &RequestContext) -> QxError {
    err.or_op(op).with_request_id(ctx.request_id.clone())
}

/// Run `body` inside a write-locking transaction, committing on success
///
/// Dropping the transaction on the error path rolls it back.
pub(crate) fn in_write_tx<T>(
    db: &mut Database,
    body: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let tx = db
        .conn_mut()
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;
    let value = body(&tx)?;
    tx.commit().map_err(from_rusqlite)?;
    Ok(value)
}
