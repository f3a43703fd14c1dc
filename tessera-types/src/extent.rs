use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    range::{Key, Range, cmp_end_bounds, cmp_start_bounds},
    table::TableId,
};

/// A tablet's key-range boundary: the unit of ownership in the storage layer.
///
/// An extent covers `(prev_end_row, end_row]`. An absent `prev_end_row` means
/// the tablet starts at the beginning of the table; an absent `end_row` means
/// it runs to the end.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub table_id: TableId,
    pub prev_end_row: Option<Key>,
    pub end_row: Option<Key>,
}

impl Extent {
    pub fn new(table_id: TableId, prev_end_row: Option<Key>, end_row: Option<Key>) -> Self {
        Self {
            table_id,
            prev_end_row,
            end_row,
        }
    }

    pub fn data_range(&self) -> Range {
        Range::after_until(self.prev_end_row.clone(), self.end_row.clone())
    }

    /// Whether `self` starts exactly where `prev` ends, with no hole.
    pub fn follows(&self, prev: &Extent) -> bool {
        self.table_id == prev.table_id && self.prev_end_row == prev.end_row
    }

    pub fn is_last(&self) -> bool {
        self.end_row.is_none()
    }
}

impl Ord for Extent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.table_id
            .cmp(&other.table_id)
            .then_with(|| {
                cmp_end_bounds(
                    (self.end_row.as_deref(), true),
                    (other.end_row.as_deref(), true),
                )
            })
            .then_with(|| {
                cmp_start_bounds(
                    (self.prev_end_row.as_deref(), false),
                    (other.prev_end_row.as_deref(), false),
                )
            })
    }
}

impl PartialOrd for Extent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.table_id, self.data_range())
    }
}
