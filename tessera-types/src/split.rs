use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    range::Range,
    scan::{Column, IteratorSetting, TableScanConfig},
    table::TableId,
};

/// Scan settings fixed at planning time and embedded into every split, so a
/// scanner can be rebuilt later without consulting possibly-renamed table
/// state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub offline_scan: bool,
    pub isolated_scan: bool,
    pub use_local_iterators: bool,
    pub iterators: Vec<IteratorSetting>,
    pub fetched_columns: Vec<Column>,
}

impl From<&TableScanConfig> for ScanSnapshot {
    fn from(config: &TableScanConfig) -> Self {
        Self {
            offline_scan: config.offline_scan,
            isolated_scan: config.isolated_scan,
            use_local_iterators: config.use_local_iterators,
            iterators: config.iterators.clone(),
            fetched_columns: config.fetched_columns.clone(),
        }
    }
}

/// The ranges a split covers.
///
/// `Range` splits carry exactly one range, possibly clipped to one tablet.
/// `Batched` splits bundle several clipped ranges, all confined to a single
/// tablet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    Range(Range),
    Batched(Vec<Range>),
}

/// One unit of scan work handed to the execution framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub table: String,
    pub table_id: TableId,
    pub kind: SplitKind,

    /// Candidate nodes to run this split on, most preferred first.
    pub locations: Vec<String>,

    pub scan: ScanSnapshot,
}

const PREFIX_DEPTH: usize = 8;

/// Interprets the first `depth` bytes of a key as a big-endian integer,
/// zero-padded on the right.
fn prefix_value(bytes: &[u8], depth: usize) -> u128 {
    let mut value = 0u128;
    for i in 0..depth {
        value = (value << 8) | u128::from(bytes.get(i).copied().unwrap_or(0));
    }
    value
}

fn range_length(range: &Range) -> u64 {
    const MIN: &[u8] = &[0x00];
    const MAX: &[u8] = &[0xff; PREFIX_DEPTH];

    let start = range.start.as_deref().unwrap_or(MIN);
    let end = range.end.as_deref().unwrap_or(MAX);
    let depth = start.len().max(end.len()).min(PREFIX_DEPTH);
    let diff = prefix_value(end, depth).saturating_sub(prefix_value(start, depth));
    u64::try_from(diff).unwrap_or(u64::MAX).max(1)
}

impl Split {
    pub fn ranges(&self) -> &[Range] {
        match &self.kind {
            SplitKind::Range(range) => std::slice::from_ref(range),
            SplitKind::Batched(ranges) => ranges,
        }
    }

    /// Rough byte-space width of the split, for scheduler weighting.
    pub fn length_estimate(&self) -> u64 {
        self.ranges().iter().map(range_length).sum::<u64>().max(1)
    }

    /// Fraction of a single-range split already covered when the scan has
    /// reached `position`. Returns 0 when the split is batched or unbounded.
    pub fn progress(&self, position: &[u8]) -> f64 {
        let SplitKind::Range(range) = &self.kind else {
            return 0.0;
        };
        let (Some(start), Some(end)) = (&range.start, &range.end) else {
            return 0.0;
        };

        let depth = start.len().max(end.len()).min(position.len()).min(16);
        if depth == 0 {
            return 0.0;
        }
        let start_value = prefix_value(start, depth);
        let end_value = prefix_value(end, depth);
        let position_value = prefix_value(position, depth);
        if end_value <= start_value {
            return 0.0;
        }

        let covered = position_value.saturating_sub(start_value) as f64;
        (covered / (end_value - start_value) as f64).clamp(0.0, 1.0)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.table, self.table_id)?;
        for (i, range) in self.ranges().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{range}")?;
        }
        write!(f, " @ [{}]", self.locations.join(", "))
    }
}
