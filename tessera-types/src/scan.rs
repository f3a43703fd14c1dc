use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::range::Range;

fn default_true() -> bool {
    true
}

/// A column selection: a column family, optionally narrowed to one qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub family: Vec<u8>,
    pub qualifier: Option<Vec<u8>>,
}

impl Column {
    pub fn family(family: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            qualifier: None,
        }
    }

    pub fn new(family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            qualifier: Some(qualifier.into()),
        }
    }
}

/// A server-side iterator to attach to every scanner built from a split.
/// Opaque to the planner; carried through into the splits verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorSetting {
    pub priority: i32,
    pub name: String,
    pub class: String,

    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Per-table scan configuration supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableScanConfig {
    /// Requested scan intervals. Empty means the whole table.
    #[serde(default)]
    pub ranges: Vec<Range>,

    /// Divide and clip ranges along tablet boundaries for finer parallelism.
    #[serde(default = "default_true")]
    pub auto_adjust_ranges: bool,

    /// Group all of a tablet's ranges into a single split.
    #[serde(default)]
    pub batch_scan: bool,

    /// Read the table's persisted files directly, bypassing serving nodes.
    #[serde(default)]
    pub offline_scan: bool,

    #[serde(default)]
    pub isolated_scan: bool,

    #[serde(default)]
    pub use_local_iterators: bool,

    #[serde(default)]
    pub fetched_columns: Vec<Column>,

    #[serde(default)]
    pub iterators: Vec<IteratorSetting>,
}

impl Default for TableScanConfig {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            auto_adjust_ranges: true,
            batch_scan: false,
            offline_scan: false,
            isolated_scan: false,
            use_local_iterators: false,
            fetched_columns: Vec::new(),
            iterators: Vec::new(),
        }
    }
}

impl TableScanConfig {
    pub fn with_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn with_auto_adjust_ranges(mut self, auto_adjust: bool) -> Self {
        self.auto_adjust_ranges = auto_adjust;
        self
    }

    pub fn with_batch_scan(mut self, batch_scan: bool) -> Self {
        self.batch_scan = batch_scan;
        self
    }

    pub fn with_offline_scan(mut self, offline_scan: bool) -> Self {
        self.offline_scan = offline_scan;
        self
    }

    pub fn with_isolated_scan(mut self, isolated_scan: bool) -> Self {
        self.isolated_scan = isolated_scan;
        self
    }

    pub fn with_local_iterators(mut self, use_local_iterators: bool) -> Self {
        self.use_local_iterators = use_local_iterators;
        self
    }

    pub fn with_fetched_columns(mut self, columns: Vec<Column>) -> Self {
        self.fetched_columns = columns;
        self
    }

    pub fn with_iterators(mut self, iterators: Vec<IteratorSetting>) -> Self {
        self.iterators = iterators;
        self
    }
}

/// The set of tables one planning call covers, in caller order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanJob {
    tables: Vec<(String, TableScanConfig)>,
}

impl ScanJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: impl Into<String>, config: TableScanConfig) -> Self {
        self.tables.push((table.into(), config));
        self
    }

    pub fn tables(&self) -> &[(String, TableScanConfig)] {
        &self.tables
    }

    pub fn config_for(&self, table: &str) -> Option<&TableScanConfig> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, config)| config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_adjust_defaults_to_true() {
        let config: TableScanConfig = serde_json::from_str("{}").unwrap();
        assert!(config.auto_adjust_ranges);
        assert!(!config.batch_scan);
        assert!(config.ranges.is_empty());
    }

    #[test]
    fn job_preserves_table_order() {
        let job = ScanJob::new()
            .with_table("b", TableScanConfig::default())
            .with_table("a", TableScanConfig::default());
        let names: Vec<_> = job.tables().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
