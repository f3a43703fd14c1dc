use std::{collections::BTreeMap, sync::Arc, time::Duration};

use test_case::test_case;
use tessera_connectors::{
    BackendError, TabletEntry,
    memory::{MappedHostLookup, MemoryBackend},
};
use tessera_types::{
    extent::Extent,
    range::Range,
    scan::{ScanJob, TableScanConfig},
    table::{TableId, TableState},
};

use crate::{
    PlanError, SplitPlanner,
    backoff::FixedBackoff,
    hosts::HostCache,
    locate::bin_ranges_online,
    offline::bin_ranges_offline,
    validate_config,
};

fn extent(id: &str, prev: Option<&[u8]>, end: Option<&[u8]>) -> Extent {
    Extent::new(
        TableId::new(id),
        prev.map(|k| k.to_vec()),
        end.map(|k| k.to_vec()),
    )
}

/// Table "logs" (id 1): three tablets on two nodes.
fn three_tablet_backend() -> Arc<MemoryBackend> {
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
    Arc::new(backend)
}

fn planner(backend: &Arc<MemoryBackend>) -> SplitPlanner {
    SplitPlanner::new(backend.clone(), backend.clone())
        .with_backoff(Arc::new(FixedBackoff(Duration::ZERO)))
}

fn no_jitter() -> FixedBackoff {
    FixedBackoff(Duration::ZERO)
}

#[test_case(TableScanConfig::default() => true; "defaults")]
#[test_case(TableScanConfig::default().with_batch_scan(true) => true; "batch with auto adjust")]
#[test_case(TableScanConfig::default().with_batch_scan(true).with_auto_adjust_ranges(false) => false; "batch without auto adjust")]
#[test_case(TableScanConfig::default().with_batch_scan(true).with_offline_scan(true) => false; "batch with offline")]
#[test_case(TableScanConfig::default().with_batch_scan(true).with_isolated_scan(true) => false; "batch with isolated")]
#[test_case(TableScanConfig::default().with_batch_scan(true).with_local_iterators(true) => false; "batch with local iterators")]
#[test_case(TableScanConfig::default().with_offline_scan(true).with_auto_adjust_ranges(false) => true; "offline without batch")]
fn flag_combinations(config: TableScanConfig) -> bool {
    validate_config(&config).is_ok()
}

#[tokio::test]
async fn config_error_precedes_any_backend_access() {
    let backend = three_tablet_backend();
    let job = ScanJob::new().with_table(
        "logs",
        TableScanConfig::default()
            .with_batch_scan(true)
            .with_offline_scan(true),
    );

    let err = planner(&backend).plan_splits(&job).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PlanError>(),
        Some(PlanError::InvalidConfig(_))
    ));
    assert_eq!(backend.bin_call_count(), 0);
    assert_eq!(backend.invalidation_count(&TableId::new("1")), 0);
}

#[tokio::test]
async fn unknown_table_is_a_fatal_error() {
    let backend = three_tablet_backend();
    let job = ScanJob::new().with_table("nope", TableScanConfig::default());

    let err = planner(&backend).plan_splits(&job).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PlanError>(),
        Some(PlanError::TableNotFound(name)) if name == "nope"
    ));
}

#[tokio::test]
async fn online_loop_invalidates_and_rebins_until_resolved() {
    let backend = three_tablet_backend();
    backend.fail_resolutions(2);

    let splits = planner(&backend)
        .plan_splits(&ScanJob::new().with_table("logs", TableScanConfig::default()))
        .await
        .unwrap();

    assert_eq!(splits.len(), 3);
    // One invalidation up front, one more per failed attempt.
    assert_eq!(backend.bin_call_count(), 3);
    assert_eq!(backend.invalidation_count(&TableId::new("1")), 3);
}

#[tokio::test]
async fn online_loop_stops_as_soon_as_everything_resolves() {
    let backend = three_tablet_backend();

    planner(&backend)
        .plan_splits(&ScanJob::new().with_table("logs", TableScanConfig::default()))
        .await
        .unwrap();

    assert_eq!(backend.bin_call_count(), 1);
    assert_eq!(backend.invalidation_count(&TableId::new("1")), 1);
}

#[tokio::test]
async fn deleted_table_aborts_the_online_loop() {
    let backend = three_tablet_backend();
    backend.fail_resolutions(1);

    let ghost = TableId::new("ghost");
    let err = bin_ranges_online(backend.as_ref(), &ghost, &[Range::full()], &no_jitter())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PlanError>(),
        Some(PlanError::TableDeleted(id)) if id == &ghost
    ));
}

#[tokio::test]
async fn offline_table_aborts_the_online_loop() {
    let backend = three_tablet_backend();
    backend.set_table_state("logs", TableState::Offline);
    backend.fail_resolutions(1);

    let id = TableId::new("1");
    let err = bin_ranges_online(backend.as_ref(), &id, &[Range::full()], &no_jitter())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PlanError>(),
        Some(PlanError::TableOffline(_))
    ));
}

#[tokio::test]
async fn offline_binner_waits_out_hosted_tablets() {
    let backend = three_tablet_backend();
    backend.release_tablets_after(2);

    let id = TableId::new("1");
    let binned = bin_ranges_offline(backend.as_ref(), &id, &[Range::full()], &no_jitter())
        .await
        .unwrap();

    // Two not-ready reads, then the one that succeeded.
    assert_eq!(backend.metadata_read_count(), 3);

    // Bins carry the last known location and the requested range uncut.
    assert_eq!(binned.len(), 2);
    for extents in binned.values() {
        for ranges in extents.values() {
            assert_eq!(ranges, &vec![Range::full()]);
        }
    }
}

#[tokio::test]
async fn offline_binner_rejects_metadata_holes() {
    let backend = MemoryBackend::new();
    backend.add_table(
        "holey",
        "2",
        vec![
            TabletEntry::unhosted(extent("2", None, Some(b"g"))),
            // Hole: nothing covers (g, m].
            TabletEntry::unhosted(extent("2", Some(b"m"), None)),
        ],
    );

    let id = TableId::new("2");
    let err = bin_ranges_offline(&backend, &id, &[Range::full()], &no_jitter())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BackendError>(),
        Some(BackendError::InconsistentMetadata(_, _))
    ));
}

#[tokio::test]
async fn host_cache_resolves_each_host_once() {
    let lookup = Arc::new(MappedHostLookup::new(BTreeMap::from([(
        "node-a".to_string(),
        "node-a.example.com".to_string(),
    )])));
    let mut cache = HostCache::new(lookup.clone());

    assert_eq!(
        cache.canonical_location("node-a:9997").await.unwrap(),
        "node-a.example.com"
    );
    assert_eq!(
        cache.canonical_location("node-a:9998").await.unwrap(),
        "node-a.example.com"
    );
    assert_eq!(
        cache.canonical_location("node-a").await.unwrap(),
        "node-a.example.com"
    );
    assert_eq!(lookup.lookup_count("node-a"), 1);

    // Unknown hosts pass through, still memoized.
    assert_eq!(cache.canonical_location("node-b:9997").await.unwrap(), "node-b");
    assert_eq!(lookup.lookup_count("node-b"), 1);
}

#[tokio::test]
async fn splits_embed_the_scan_snapshot() {
    let backend = three_tablet_backend();
    let job = ScanJob::new().with_table(
        "logs",
        TableScanConfig::default()
            .with_isolated_scan(true)
            .with_local_iterators(true),
    );

    let splits = planner(&backend).plan_splits(&job).await.unwrap();
    assert!(!splits.is_empty());
    for split in &splits {
        assert_eq!(split.table_id, TableId::new("1"));
        assert!(split.scan.isolated_scan);
        assert!(split.scan.use_local_iterators);
        assert!(!split.scan.offline_scan);
    }
}
