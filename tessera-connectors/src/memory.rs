use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use color_eyre::eyre::{Result, bail};
use parking_lot::{Mutex, RwLock};
use tessera_types::{
    binning::{BinResult, bin},
    range::Range,
    table::{TableId, TableState},
};
use tracing::debug;

use super::{
    BackendError, HostReverseLookup, LocationService, TabletEntry, TabletMetadataReader,
};

#[derive(Debug, Clone)]
struct TableData {
    id: TableId,
    state: TableState,
    tablets: Vec<TabletEntry>,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, TableData>,

    /// While positive, `bin_ranges` reports every range unresolved, as a live
    /// cluster does mid-migration.
    unresolved_attempts: u32,

    /// When set, `tablets` reports the stored (possibly hosted) entries this
    /// many more times, then unhosts everything.
    hosted_reads_remaining: Option<u32>,

    invalidations: BTreeMap<TableId, u64>,
    bin_calls: u64,
    metadata_reads: u64,
}

/// In-memory backend: the lightweight instance kind used by tests and local
/// development. Implements every collaborator seam over a single shared map,
/// with knobs to script the transient states a real cluster goes through.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(
        &self,
        table: impl Into<String>,
        id: impl Into<TableId>,
        tablets: Vec<TabletEntry>,
    ) {
        let mut state = self.state.write();
        state.tables.insert(
            table.into(),
            TableData {
                id: id.into(),
                state: TableState::Online,
                tablets,
            },
        );
    }

    pub fn delete_table(&self, table: &str) {
        self.state.write().tables.remove(table);
    }

    pub fn set_table_state(&self, table: &str, table_state: TableState) {
        if let Some(data) = self.state.write().tables.get_mut(table) {
            data.state = table_state;
        }
    }

    /// The next `attempts` calls to `bin_ranges` return everything unresolved.
    pub fn fail_resolutions(&self, attempts: u32) {
        self.state.write().unresolved_attempts = attempts;
    }

    /// Report tablets as stored for the next `reads` metadata reads, then
    /// unhost every tablet (the tail end of an offline transition).
    pub fn release_tablets_after(&self, reads: u32) {
        self.state.write().hosted_reads_remaining = Some(reads);
    }

    pub fn invalidation_count(&self, table_id: &TableId) -> u64 {
        self.state
            .read()
            .invalidations
            .get(table_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn bin_call_count(&self) -> u64 {
        self.state.read().bin_calls
    }

    pub fn metadata_read_count(&self) -> u64 {
        self.state.read().metadata_reads
    }

    fn unhost_all(state: &mut State) {
        for data in state.tables.values_mut() {
            for tablet in &mut data.tablets {
                if let Some(node) = tablet.location.take() {
                    tablet.last_location = Some(node);
                }
            }
        }
    }
}

fn find_by_id<'a>(state: &'a State, table_id: &TableId) -> Option<&'a TableData> {
    state.tables.values().find(|data| &data.id == table_id)
}

#[async_trait]
impl LocationService for MemoryBackend {
    async fn table_id(&self, table: &str) -> Result<Option<TableId>> {
        Ok(self
            .state
            .read()
            .tables
            .get(table)
            .map(|data| data.id.clone()))
    }

    async fn table_exists(&self, table_id: &TableId) -> Result<bool> {
        Ok(find_by_id(&self.state.read(), table_id).is_some())
    }

    async fn table_state(&self, table_id: &TableId) -> Result<TableState> {
        match find_by_id(&self.state.read(), table_id) {
            Some(data) => Ok(data.state),
            None => bail!(BackendError::TableNotFound(table_id.to_string())),
        }
    }

    async fn invalidate(&self, table_id: &TableId) {
        *self
            .state
            .write()
            .invalidations
            .entry(table_id.clone())
            .or_default() += 1;
    }

    async fn bin_ranges(&self, table_id: &TableId, ranges: &[Range]) -> Result<BinResult> {
        let mut state = self.state.write();
        state.bin_calls += 1;

        if state.unresolved_attempts > 0 {
            state.unresolved_attempts -= 1;
            debug!(%table_id, "scripted unresolved resolution attempt");
            return Ok(BinResult {
                binned: Default::default(),
                unresolved: ranges.to_vec(),
            });
        }

        let Some(data) = find_by_id(&state, table_id) else {
            bail!(BackendError::TableNotFound(table_id.to_string()));
        };

        let mut result = BinResult::default();
        for range in ranges {
            let covering: Vec<&TabletEntry> = data
                .tablets
                .iter()
                .filter(|tablet| range.clip(&tablet.extent.data_range()).is_some())
                .collect();

            if covering.is_empty() || covering.iter().any(|tablet| tablet.location.is_none()) {
                result.unresolved.push(range.clone());
                continue;
            }
            for tablet in covering {
                let node = tablet.location.as_deref().unwrap_or_default();
                bin(&mut result.binned, node, &tablet.extent, range.clone());
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl TabletMetadataReader for MemoryBackend {
    async fn tablets(&self, table_id: &TableId) -> Result<Vec<TabletEntry>> {
        let mut state = self.state.write();
        state.metadata_reads += 1;

        match state.hosted_reads_remaining {
            Some(0) => {
                Self::unhost_all(&mut state);
                state.hosted_reads_remaining = None;
            }
            Some(remaining) => state.hosted_reads_remaining = Some(remaining - 1),
            None => {}
        }

        match find_by_id(&state, table_id) {
            Some(data) => Ok(data.tablets.clone()),
            None => bail!(BackendError::TableNotFound(table_id.to_string())),
        }
    }
}

/// Host lookup backed by a fixed map, counting how many times each host was
/// resolved. Unknown hosts pass through unchanged.
#[derive(Debug, Default)]
pub struct MappedHostLookup {
    names: BTreeMap<String, String>,
    lookups: Mutex<BTreeMap<String, u64>>,
}

impl MappedHostLookup {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self {
            names,
            lookups: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn lookup_count(&self, host: &str) -> u64 {
        self.lookups.lock().get(host).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HostReverseLookup for MappedHostLookup {
    async fn canonicalize(&self, host: &str) -> Result<String> {
        *self.lookups.lock().entry(host.to_string()).or_default() += 1;
        Ok(self
            .names
            .get(host)
            .cloned()
            .unwrap_or_else(|| host.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tessera_types::extent::Extent;

    use super::*;

    fn extent(id: &str, prev: Option<&[u8]>, end: Option<&[u8]>) -> Extent {
        Extent::new(
            TableId::new(id),
            prev.map(|k| k.to_vec()),
            end.map(|k| k.to_vec()),
        )
    }

    fn three_tablet_backend() -> (MemoryBackend, TableId) {
        let backend = MemoryBackend::new();
        backend.add_table(
            "logs",
            "1",
            vec![
                TabletEntry::hosted(extent("1", None, Some(b"g")), "node-a:9997"),
                TabletEntry::hosted(extent("1", Some(b"g"), Some(b"m")), "node-b:9997"),
                TabletEntry::hosted(extent("1", Some(b"m"), None), "node-a:9997"),
            ],
        );
        (backend, TableId::new("1"))
    }

    #[tokio::test]
    async fn bins_full_range_across_all_tablets() {
        let (backend, id) = three_tablet_backend();
        let result = backend.bin_ranges(&id, &[Range::full()]).await.unwrap();

        assert!(result.is_fully_resolved());
        assert_eq!(result.binned.len(), 2);
        assert_eq!(result.binned["node-a:9997"].len(), 2);
        assert_eq!(result.binned["node-b:9997"].len(), 1);
    }

    #[tokio::test]
    async fn unhosted_tablet_leaves_range_unresolved() {
        let (backend, id) = three_tablet_backend();
        {
            let mut state = backend.state.write();
            state.tables.get_mut("logs").unwrap().tablets[1].location = None;
        }

        let result = backend.bin_ranges(&id, &[Range::full()]).await.unwrap();
        assert_eq!(result.unresolved, vec![Range::full()]);
        assert!(result.binned.is_empty());
    }

    #[tokio::test]
    async fn scripted_failures_resolve_after_the_budget() {
        let (backend, id) = three_tablet_backend();
        backend.fail_resolutions(1);

        let first = backend.bin_ranges(&id, &[Range::full()]).await.unwrap();
        assert!(!first.is_fully_resolved());

        let second = backend.bin_ranges(&id, &[Range::full()]).await.unwrap();
        assert!(second.is_fully_resolved());
    }

    #[tokio::test]
    async fn release_tablets_after_unhosts_on_the_nth_read() {
        let (backend, id) = three_tablet_backend();
        backend.release_tablets_after(2);

        for _ in 0..2 {
            let tablets = backend.tablets(&id).await.unwrap();
            assert!(tablets.iter().all(|tablet| tablet.location.is_some()));
        }

        let tablets = backend.tablets(&id).await.unwrap();
        assert!(tablets.iter().all(|tablet| tablet.location.is_none()));
        assert!(tablets.iter().all(|tablet| tablet.last_location.is_some()));
    }
}
