use std::collections::BTreeMap;

use color_eyre::eyre::Result;
use tessera_types::{
    binning::NodeBinning,
    range::Range,
    scan::TableScanConfig,
    split::{ScanSnapshot, Split, SplitKind},
    table::TableId,
};

use crate::hosts::HostCache;

/// Turns a node-binned set of ranges into the final splits for one table.
///
/// Batch mode emits one split per tablet, bundling that tablet's clipped
/// ranges; a batched split never spans tablets, since each one is scanned by
/// a single scanner. Auto-adjust emits one split per clipped range. With
/// auto-adjust off, a range keeps its identity: every node it was binned to
/// becomes a candidate location on a single split, and nothing is clipped.
pub async fn build_splits(
    table: &str,
    table_id: &TableId,
    config: &TableScanConfig,
    binning: NodeBinning,
    hosts: &mut HostCache,
) -> Result<Vec<Split>> {
    let snapshot = ScanSnapshot::from(config);
    let make_split = |kind: SplitKind, locations: Vec<String>| Split {
        table: table.to_string(),
        table_id: table_id.clone(),
        kind,
        locations,
        scan: snapshot.clone(),
    };

    let mut splits = Vec::new();

    // Ranges spanning several tablets accumulate locations here when
    // auto-adjust is off.
    let mut unsplit_locations: BTreeMap<Range, Vec<String>> = BTreeMap::new();

    for (node, extents) in binning {
        let location = hosts.canonical_location(&node).await?;

        for (extent, ranges) in extents {
            let tablet_range = extent.data_range();

            if config.batch_scan {
                let clipped: Vec<Range> = ranges
                    .iter()
                    .filter_map(|range| range.clip(&tablet_range))
                    .collect();
                if !clipped.is_empty() {
                    splits.push(make_split(
                        SplitKind::Batched(clipped),
                        vec![location.clone()],
                    ));
                }
                continue;
            }

            for range in ranges {
                if config.auto_adjust_ranges {
                    if let Some(clipped) = range.clip(&tablet_range) {
                        splits.push(make_split(
                            SplitKind::Range(clipped),
                            vec![location.clone()],
                        ));
                    }
                } else {
                    let locations = unsplit_locations.entry(range).or_default();
                    if !locations.contains(&location) {
                        locations.push(location.clone());
                    }
                }
            }
        }
    }

    for (range, locations) in unsplit_locations {
        splits.push(make_split(SplitKind::Range(range), locations));
    }
    Ok(splits)
}
