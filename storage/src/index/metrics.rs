//! Metrics for [super::IndexFile].

use prometheus_client::{metrics::counter::Counter, registry::Registry};

/// Metrics for [super::IndexFile].
#[derive(Default)]
pub struct Metrics {
    /// Entries read from the blob.
    pub reads: Counter,
    /// Lookups served from the cached entry.
    pub cache_hits: Counter,
}

impl Metrics {
    /// Register metrics with the given registry.
    ///
    /// Registered metrics share state with `self`, so they keep counting after registration.
    pub fn register(&self, registry: &mut Registry) {
        registry.register("reads", "Entries read from the blob", self.reads.clone());
        registry.register(
            "cache_hits",
            "Lookups served from the cached entry",
            self.cache_hits.clone(),
        );
    }
}
