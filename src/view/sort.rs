use std::cmp::Ordering;
use std::fmt;

use crate::records::{FieldValue, Record};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("asc"),
            Self::Descending => f.write_str("desc"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Column-header click: the active column flips direction, any other
    /// column becomes active ascending.
    pub fn toggle(&mut self, field: &str) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field.to_string();
            self.direction = Direction::Ascending;
        }
    }

    pub fn compare<R: Record>(&self, a: &R, b: &R) -> Ordering {
        let left = a.field(&self.field).unwrap_or(FieldValue::Missing);
        let right = b.field(&self.field).unwrap_or(FieldValue::Missing);
        let ord = left.natural_cmp(&right);
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// Orders `collection` by `key`. Records with equal keys keep their input
/// order in either direction.
pub fn sort<R: Record>(collection: &[R], key: &SortKey) -> Vec<R> {
    let mut out = collection.to_vec();
    sort_in_place(&mut out, key);
    out
}

pub(crate) fn sort_in_place<R: Record>(rows: &mut [R], key: &SortKey) {
    // slice::sort_by is stable
    rows.sort_by(|a, b| key.compare(a, b));
}
