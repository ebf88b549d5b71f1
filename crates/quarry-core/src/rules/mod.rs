//! Schema rules applied to descriptors before execution

pub mod validation;
