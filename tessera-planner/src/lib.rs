use std::sync::Arc;

use color_eyre::eyre::{Context, Result, bail};
use tessera_connectors::{
    HostReverseLookup, IdentityHostLookup, LocationService, TabletMetadataReader,
};
use tessera_types::{
    scan::{ScanJob, TableScanConfig},
    split::Split,
    table::TableId,
};
use tracing::{debug, info, instrument};

use crate::{
    backoff::{BackoffJitter, RandomBackoff},
    hosts::HostCache,
};

pub mod backoff;
pub mod builder;
pub mod hosts;
pub mod locate;
pub mod normalize;
pub mod offline;

#[cfg(test)]
mod tests;

/// The fatal ways a planning call can end. Transient inconsistency never
/// surfaces here; it is retried inside the location loops.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table {0} was deleted during split planning")]
    TableDeleted(TableId),

    #[error("table {0} is offline")]
    TableOffline(TableId),
}

/// Plans how a scan over range-partitioned tables is divided into parallel
/// splits.
///
/// One instance can serve many planning calls; everything mutable (host
/// cache, binning) is scoped to a single call. Planning either returns the
/// complete split list or fails with one error, never a partial result.
pub struct SplitPlanner {
    locator: Arc<dyn LocationService>,
    metadata: Arc<dyn TabletMetadataReader>,
    hosts: Arc<dyn HostReverseLookup>,
    backoff: Arc<dyn BackoffJitter>,
}

impl SplitPlanner {
    pub fn new(
        locator: Arc<dyn LocationService>,
        metadata: Arc<dyn TabletMetadataReader>,
    ) -> Self {
        Self {
            locator,
            metadata,
            hosts: Arc::new(IdentityHostLookup),
            backoff: Arc::new(RandomBackoff::new()),
        }
    }

    pub fn with_host_lookup(mut self, hosts: Arc<dyn HostReverseLookup>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn BackoffJitter>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Plans splits for every table in the job, in configuration order.
    #[instrument(skip_all)]
    pub async fn plan_splits(&self, job: &ScanJob) -> Result<Vec<Split>> {
        let mut splits = Vec::new();
        for (table, config) in job.tables() {
            let table_splits = self
                .plan_table(table, config)
                .await
                .with_context(|| format!("plan splits for table '{table}'"))?;
            splits.extend(table_splits);
        }
        Ok(splits)
    }

    #[instrument(skip(self, config))]
    async fn plan_table(&self, table: &str, config: &TableScanConfig) -> Result<Vec<Split>> {
        validate_config(config)?;

        // Resolve the name to an id once; splits carry the id so a rename
        // mid-plan cannot redirect them.
        let Some(table_id) = self.locator.table_id(table).await? else {
            bail!(PlanError::TableNotFound(table.to_string()));
        };
        debug!(%table_id, "resolved table id");

        let ranges = normalize::normalize_ranges(&config.ranges, config.auto_adjust_ranges);

        let binned = if config.offline_scan {
            offline::bin_ranges_offline(
                self.metadata.as_ref(),
                &table_id,
                &ranges,
                self.backoff.as_ref(),
            )
            .await?
        } else {
            locate::bin_ranges_online(
                self.locator.as_ref(),
                &table_id,
                &ranges,
                self.backoff.as_ref(),
            )
            .await?
        };

        let mut hosts = HostCache::new(self.hosts.clone());
        let splits = builder::build_splits(table, &table_id, config, binned, &mut hosts).await?;
        info!(table, splits = splits.len(), "planned table splits");
        Ok(splits)
    }
}

/// Rejects illegal flag combinations before any backend access.
fn validate_config(config: &TableScanConfig) -> Result<()> {
    if !config.batch_scan {
        return Ok(());
    }
    if config.offline_scan || config.isolated_scan || config.use_local_iterators {
        bail!(PlanError::InvalidConfig(
            "batch scan cannot be combined with offline, isolated, or local-iterator scanning"
                .to_string()
        ));
    }
    if !config.auto_adjust_ranges {
        bail!(PlanError::InvalidConfig(
            "batch scan requires auto-adjusted ranges".to_string()
        ));
    }
    Ok(())
}
