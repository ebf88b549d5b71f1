//! Quarry Core - schema metadata, query descriptors and shared facilities
//!
//! This crate provides everything the query façade needs that does not
//! touch the database:
//! - Schema metadata for the User / Post / Category model
//! - Typed descriptors: filter trees, projections, sorting, pagination,
//!   aggregation, grouping and mutations
//! - Descriptor validation against the schema
//! - The canonical error facility and the structured logging facility

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod rules;

// Re-export commonly used types
pub use errors::{QuarryError, QxError, QxErrorKind, Result};
pub use model::{Entity, Record, ScalarValue};
pub use query::{
    AggregateSummary, Aggregation, BatchCount, CreateData, Direction, Filter, FindArgs, GroupByArgs,
    GroupSummary, Mutation, MutationResult, Page, Patch, Predicate, Projection, Quantifier,
    RelationWrite, Sort, UniqueWhere,
};
