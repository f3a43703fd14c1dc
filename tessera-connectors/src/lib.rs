use async_trait::async_trait;
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use tessera_types::{
    binning::BinResult,
    extent::Extent,
    range::Range,
    table::{TableId, TableState},
};

pub mod memory;

/// Typed failures a storage backend can report. Wrapped in eyre reports;
/// callers downcast when they need the variant.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("tablet metadata for table {0} is inconsistent: {1}")]
    InconsistentMetadata(TableId, String),
}

/// One row of tablet metadata: a tablet's extent plus where it is (or was)
/// hosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletEntry {
    pub extent: Extent,

    /// The node currently serving the tablet, if any.
    pub location: Option<String>,

    /// The node that last served the tablet. Used as a locality hint when
    /// scanning offline.
    pub last_location: Option<String>,
}

impl TabletEntry {
    pub fn hosted(extent: Extent, node: impl Into<String>) -> Self {
        Self {
            extent,
            location: Some(node.into()),
            last_location: None,
        }
    }

    pub fn unhosted(extent: Extent) -> Self {
        Self {
            extent,
            location: None,
            last_location: None,
        }
    }

    pub fn with_last_location(mut self, node: impl Into<String>) -> Self {
        self.last_location = Some(node.into());
        self
    }
}

/// The live location layer of the storage system: resolves table names,
/// reports table state, and bins ranges by the node currently serving them.
///
/// `bin_ranges` may legitimately return a partial answer (non-empty
/// `unresolved`) while tablets split, merge, or migrate; the planner owns the
/// retry policy.
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn table_id(&self, table: &str) -> Result<Option<TableId>>;

    async fn table_exists(&self, table_id: &TableId) -> Result<bool>;

    async fn table_state(&self, table_id: &TableId) -> Result<TableState>;

    /// Drops any cached location data for the table. Location caches can hold
    /// complete but stale answers, so the planner invalidates before every
    /// resolution attempt.
    async fn invalidate(&self, table_id: &TableId);

    async fn bin_ranges(&self, table_id: &TableId, ranges: &[Range]) -> Result<BinResult>;
}

/// Read access to persisted tablet metadata, used when scanning a table
/// offline (no serving nodes involved).
#[async_trait]
pub trait TabletMetadataReader: Send + Sync {
    /// All tablet entries of the table, in extent order.
    async fn tablets(&self, table_id: &TableId) -> Result<Vec<TabletEntry>>;
}

/// Reverse lookup of a node address to its canonical host name. May be slow;
/// the planner memoizes per planning pass.
#[async_trait]
pub trait HostReverseLookup: Send + Sync {
    async fn canonicalize(&self, host: &str) -> Result<String>;
}

/// Passthrough lookup for deployments where node addresses are already
/// canonical.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHostLookup;

#[async_trait]
impl HostReverseLookup for IdentityHostLookup {
    async fn canonicalize(&self, host: &str) -> Result<String> {
        Ok(host.to_string())
    }
}
