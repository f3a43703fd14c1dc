use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{extent::Extent, range::Range};

/// Ranges assigned to each tablet of a single node.
pub type ExtentRanges = BTreeMap<Extent, Vec<Range>>;

/// Node address -> tablet -> ranges: the output of one location resolution
/// attempt. Rebuilt from scratch on every retry, never patched in place.
pub type NodeBinning = BTreeMap<String, ExtentRanges>;

pub fn bin(binning: &mut NodeBinning, node: &str, extent: &Extent, range: Range) {
    binning
        .entry(node.to_string())
        .or_default()
        .entry(extent.clone())
        .or_default()
        .push(range);
}

/// The outcome of asking the location service to bin a set of ranges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinResult {
    pub binned: NodeBinning,

    /// Ranges the service could not attribute to any node. Non-empty means
    /// the metadata was stale or transitioning and the caller should retry.
    pub unresolved: Vec<Range>,
}

impl BinResult {
    pub fn resolved(binned: NodeBinning) -> Self {
        Self {
            binned,
            unresolved: Vec::new(),
        }
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}
