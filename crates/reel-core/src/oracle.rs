//! Uniqueness oracles
//!
//! Before a write, the provider asks an oracle how many movies already carry
//! the target title. Production uses [`LiveCountOracle`], which asks the
//! server. Tests can use [`FixedCountOracle`] to dictate the answer without a
//! round trip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::store::{AggregateSource, CountQuery, RemoteStore, StoreResult};

/// Document field holding the title
pub const TITLE_FIELD: &str = "title";

/// Answers "how many movies have this title?"
#[async_trait]
pub trait UniquenessOracle: Send + Sync {
    async fn count_with_title(&self, title: &str) -> StoreResult<u64>;
}

/// Server-authoritative count query against a collection
pub struct LiveCountOracle {
    store: Arc<dyn RemoteStore>,
    collection: String,
}

impl LiveCountOracle {
    pub fn new(store: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl UniquenessOracle for LiveCountOracle {
    async fn count_with_title(&self, title: &str) -> StoreResult<u64> {
        let query = CountQuery::collection(&self.collection).where_equal(TITLE_FIELD, title);
        self.store.count(&query, AggregateSource::Server).await
    }
}

/// Oracle returning whatever count the test sets
///
/// Clones share the count.
#[derive(Debug, Clone, Default)]
pub struct FixedCountOracle {
    count: Arc<AtomicU64>,
}

impl FixedCountOracle {
    pub fn new(count: u64) -> Self {
        Self {
            count: Arc::new(AtomicU64::new(count)),
        }
    }

    pub fn set_count(&self, count: u64) {
        self.count.store(count, Ordering::SeqCst);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UniquenessOracle for FixedCountOracle {
    async fn count_with_title(&self, _title: &str) -> StoreResult<u64> {
        Ok(self.count())
    }
}
