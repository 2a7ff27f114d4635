//! Response cache for catalog searches.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use super::types::ProductSummary;

const MAX_ENTRIES: u64 = 256;
const TTL: Duration = Duration::from_secs(60);

/// Search results keyed by normalized query.
#[derive(Clone)]
pub(crate) struct SearchCache {
    inner: Cache<String, Arc<Vec<ProductSummary>>>,
}

impl SearchCache {
    pub(crate) fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(TTL)
                .build(),
        }
    }

    /// Case- and whitespace-insensitive cache key.
    pub(crate) fn key(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    pub(crate) async fn get(&self, query: &str) -> Option<Arc<Vec<ProductSummary>>> {
        self.inner.get(&Self::key(query)).await
    }

    pub(crate) async fn insert(&self, query: &str, results: Vec<ProductSummary>) {
        self.inner.insert(Self::key(query), Arc::new(results)).await;
    }

    pub(crate) fn clear(&self) {
        self.inner.invalidate_all();
    }
}
