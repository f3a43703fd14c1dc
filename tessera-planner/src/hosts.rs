use std::sync::Arc;

use color_eyre::eyre::Result;
use hashbrown::HashMap;
use tessera_connectors::HostReverseLookup;

/// Memoizes reverse host lookups for the duration of one planning pass. Many
/// extents usually map to few nodes, so this collapses the lookup traffic to
/// one call per distinct host.
pub struct HostCache {
    lookup: Arc<dyn HostReverseLookup>,
    cache: HashMap<String, String>,
}

impl HostCache {
    pub fn new(lookup: Arc<dyn HostReverseLookup>) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
        }
    }

    /// Canonical location for a node address of the form `host[:port]`. The
    /// port is dropped; locality hints name machines, not sockets.
    pub async fn canonical_location(&mut self, addr: &str) -> Result<String> {
        let host = addr.split(':').next().unwrap_or(addr);
        if let Some(name) = self.cache.get(host) {
            return Ok(name.clone());
        }

        let name = self.lookup.canonicalize(host).await?;
        self.cache.insert(host.to_string(), name.clone());
        Ok(name)
    }
}
