use color_eyre::eyre::{Result, bail};
use tessera_connectors::LocationService;
use tessera_types::{
    binning::NodeBinning,
    range::Range,
    table::{TableId, TableState},
};
use tokio::time::sleep;
use tracing::warn;

use crate::{PlanError, backoff::BackoffJitter};

/// Bins ranges by the node currently serving them, retrying while the
/// location metadata is transitioning.
///
/// Each attempt starts from a fresh binning; a partially resolved answer is
/// thrown away rather than patched. The loop is unbounded on purpose: it ends
/// only on full resolution or on a fatal table state (deleted or offline),
/// checked at every retry boundary.
pub async fn bin_ranges_online(
    locator: &dyn LocationService,
    table_id: &TableId,
    ranges: &[Range],
    backoff: &dyn BackoffJitter,
) -> Result<NodeBinning> {
    // The cache may hold complete but stale answers from a previous pass.
    locator.invalidate(table_id).await;

    loop {
        let result = locator.bin_ranges(table_id, ranges).await?;
        if result.is_fully_resolved() {
            return Ok(result.binned);
        }

        if !locator.table_exists(table_id).await? {
            bail!(PlanError::TableDeleted(table_id.clone()));
        }
        if locator.table_state(table_id).await? == TableState::Offline {
            bail!(PlanError::TableOffline(table_id.clone()));
        }

        warn!(
            %table_id,
            unresolved = result.unresolved.len(),
            "unable to locate bins for requested ranges, retrying"
        );
        sleep(backoff.next_delay()).await;
        locator.invalidate(table_id).await;
    }
}
