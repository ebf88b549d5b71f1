//! Atomic batches

#![allow(clippy::result_large_err)]

use quarry_core::query::{Mutation, MutationResult};
use quarry_core::QxError;

use super::exec::{apply, validate_mutation};
use super::{in_write_tx, Facade};
use crate::errors::Result;

/// Tag an error with the position and verb of the failing mutation
fn at(index: usize, mutation: &Mutation, err: QxError) -> QxError {
    let message = format!(
        "batch mutation #{} ({} {}): {}",
        index,
        mutation.op_name(),
        mutation.entity(),
        err.message()
    );
    err.with_message(message)
}

impl Facade<'_> {
    /// Run every mutation in one transaction: all commit or none do
    ///
    /// Each mutation is validated before any of them runs. Later
    /// mutations cannot reference values produced by earlier ones.
    /// Fails with `UnsupportedOperation` when the connection cannot
    /// guarantee an atomic commit.
    pub fn run_atomic_batch(&mut self, mutations: &[Mutation]) -> Result<Vec<MutationResult>> {
        let batch_len = mutations.len();

        self.observe(
            "run_atomic_batch",
            "*",
            |db| {
                db.ensure_atomic_commit()?;
                for (i, mutation) in mutations.iter().enumerate() {
                    validate_mutation(mutation).map_err(|e| at(i, mutation, e.into()))?;
                }

                tracing::debug!(component = "facade", batch_len, "atomic batch prepared");

                in_write_tx(db, |tx| {
                    mutations
                        .iter()
                        .enumerate()
                        .map(|(i, mutation)| apply(tx, mutation).map_err(|e| at(i, mutation, e)))
                        .collect::<Result<Vec<_>>>()
                })
            },
            |results: &Vec<MutationResult>| results.len() as u64,
        )
    }
}
