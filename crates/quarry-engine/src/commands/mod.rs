//! Command layer over the query façade.

pub mod showcase;
