use color_eyre::eyre::{Result, bail};
use tessera_connectors::{BackendError, TabletEntry, TabletMetadataReader};
use tessera_types::{
    binning::{NodeBinning, bin},
    range::Range,
    table::TableId,
};
use tokio::time::sleep;
use tracing::info;

use crate::backoff::BackoffJitter;

/// Bins ranges for an offline scan by reading persisted tablet metadata
/// directly.
///
/// A tablet that still has a serving node means the offline transition hasn't
/// finished; that is not an error, just not ready yet, so the loop backs off
/// and re-reads. Unbounded like the online loop.
pub async fn bin_ranges_offline(
    reader: &dyn TabletMetadataReader,
    table_id: &TableId,
    ranges: &[Range],
    backoff: &dyn BackoffJitter,
) -> Result<NodeBinning> {
    loop {
        if let Some(binned) = bin_offline_once(reader, table_id, ranges).await? {
            return Ok(binned);
        }

        info!(%table_id, "some tablets are still hosted, waiting for offline transition");
        sleep(backoff.next_delay()).await;
    }
}

/// One binning attempt. `Ok(None)` means not ready (a covering tablet is
/// still hosted).
async fn bin_offline_once(
    reader: &dyn TabletMetadataReader,
    table_id: &TableId,
    ranges: &[Range],
) -> Result<Option<NodeBinning>> {
    let tablets = reader.tablets(table_id).await?;
    verify_tablet_chain(table_id, &tablets)?;

    let mut binned = NodeBinning::default();
    for range in ranges {
        for tablet in &tablets {
            if range.clip(&tablet.extent.data_range()).is_none() {
                continue;
            }
            if tablet.location.is_some() {
                return Ok(None);
            }

            // Bins carry the range uncut; clipping is the split builder's
            // call, and only when auto-adjusting or batching.
            let node = tablet.last_location.clone().unwrap_or_default();
            bin(&mut binned, &node, &tablet.extent, range.clone());
        }
    }
    Ok(Some(binned))
}

/// Persisted metadata must describe one contiguous chain of tablets from the
/// start of the table to its end; anything else is corruption, not staleness.
fn verify_tablet_chain(table_id: &TableId, tablets: &[TabletEntry]) -> Result<()> {
    let inconsistent = |reason: &str| {
        BackendError::InconsistentMetadata(table_id.clone(), reason.to_string())
    };

    let Some(first) = tablets.first() else {
        bail!(inconsistent("no tablets"));
    };
    if first.extent.prev_end_row.is_some() {
        bail!(inconsistent("first tablet does not start at the table start"));
    }

    for pair in tablets.windows(2) {
        if !pair[1].extent.follows(&pair[0].extent) {
            bail!(inconsistent("hole between consecutive tablets"));
        }
    }

    if tablets.last().is_some_and(|last| !last.extent.is_last()) {
        bail!(inconsistent("last tablet does not reach the table end"));
    }
    Ok(())
}
