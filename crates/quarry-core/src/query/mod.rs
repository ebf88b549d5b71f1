//! Structured query and mutation descriptors
//!
//! Callers build these in-process (or deserialize them) and hand them to
//! the façade. Nothing here touches the store.

pub mod aggregate;
pub mod filter;
pub mod mutation;
pub mod order;
pub mod projection;

pub use aggregate::{AggregateSummary, Aggregation, GroupByArgs, GroupSummary};
pub use filter::{Filter, Predicate, Quantifier};
pub use mutation::{
    BatchCount, ConnectOrCreate, CreateData, FieldUpdate, Mutation, MutationResult, Patch,
    RelationWrite, UniqueWhere,
};
pub use order::{Direction, Page, Sort};
pub use projection::{Projection, RelationSelection, SelectItem};

use serde::{Deserialize, Serialize};

/// Arguments to `find`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindArgs {
    pub filter: Option<Filter>,
    pub projection: Projection,
    pub sort: Option<Sort>,
    pub page: Option<Page>,
}

impl FindArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }
}
