//! Sorting and pagination

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Order by one field; `id` breaks ties in the same direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Pagination mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Skip `index * size` rows, return the next `size`
    Offset { index: u64, size: u64 },
    /// Return the next `size` rows strictly after the record `after`
    Cursor { after: i64, size: u64 },
}

impl Page {
    pub fn size(&self) -> u64 {
        match self {
            Page::Offset { size, .. } | Page::Cursor { size, .. } => *size,
        }
    }

    /// First page of `size` rows
    pub fn first(size: u64) -> Self {
        Page::Offset { index: 0, size }
    }
}
