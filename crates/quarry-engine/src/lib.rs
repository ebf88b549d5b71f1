//! Quarry Engine - the showcase catalogue
//!
//! Maps named, parameterised queries onto façade calls and renders their
//! results as JSON.

pub mod commands;
