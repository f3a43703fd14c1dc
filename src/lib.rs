pub use tessera_connectors::{
    BackendError, HostReverseLookup, IdentityHostLookup, LocationService, TabletEntry,
    TabletMetadataReader, memory,
};
pub use tessera_planner::{PlanError, SplitPlanner, backoff};
pub use tessera_types::{
    binning::{BinResult, NodeBinning},
    extent::Extent,
    range::{Key, Range},
    scan::{Column, IteratorSetting, ScanJob, TableScanConfig},
    split::{ScanSnapshot, Split, SplitKind},
    table::{TableId, TableState},
};
