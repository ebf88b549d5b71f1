//! SQL text generation and row decoding
//!
//! Descriptors are validated before they reach this module; translation
//! still resolves every name through the schema and never interpolates
//! caller-supplied text, only table and column names declared there.

mod filter;
mod rows;

pub(crate) use filter::WhereBuilder;
pub(crate) use rows::{column_list, read_record, read_scalar, to_sql};

/// `?, ?, ?` for `n` parameters
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
