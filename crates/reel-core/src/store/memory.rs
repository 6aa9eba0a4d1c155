//! In-process document store
//!
//! `MemoryStore` implements [`RemoteStore`] entirely in memory. It behaves
//! like a single-node backend: writes are immediately visible to counts, and
//! every successful write pushes a fresh snapshot of the affected collection
//! to each live subscriber.
//!
//! It also carries test controls: failure injection per operation, injected
//! subscription faults, and a log of every operation received.
//!
//! ## Usage
//!
//! ```ignore
//! let store = MemoryStore::new();
//! let mut changes = store.subscribe("movies").await?;
//!
//! store.set(&key, json!({"title": "Dune"})).await?;
//! let snapshot = changes.recv().await.unwrap()?;
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::{
    AggregateSource, ChangeBatch, ChangeStream, CountQuery, Document, DocumentKey, RemoteStore,
    Snapshot, StoreError, StoreResult, SubscriptionFault,
};

/// Length of generated document ids
const DOCUMENT_ID_LEN: usize = 20;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// In-memory document store
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    /// Documents by collection, then by id
    collections: Collections,
    /// Live subscribers and the collection each one watches
    subscribers: Vec<(String, mpsc::UnboundedSender<ChangeBatch>)>,
    /// Operation to fail on (for testing error paths)
    fail_on: Option<FailOn>,
    /// Recorded operations for verification
    operations: Vec<StoreOperation>,
}

/// Which operation should fail, with the message to fail with
///
/// Failures surface as [`StoreError::Unavailable`] and persist until
/// [`MemoryStore::clear_failure`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    Get(String),
    Set(String),
    Delete(String),
    Count(String),
    Subscribe(String),
}

/// Recorded operation for test verification
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    Get { key: DocumentKey },
    Set { key: DocumentKey, data: Value },
    Delete { key: DocumentKey },
    Count { query: CountQuery, source: AggregateSource },
    Subscribe { collection: String },
}

impl StoreOperation {
    /// Whether this operation modifies stored documents
    pub fn is_write(&self) -> bool {
        matches!(self, StoreOperation::Set { .. } | StoreOperation::Delete { .. })
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store previously written with [`MemoryStore::save`]
    ///
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|source| StoreError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let collections: Collections = serde_json::from_str(&content)?;

        let store = Self::new();
        store.inner.lock().collections = collections;
        Ok(store)
    }

    /// Persist all documents as JSON
    ///
    /// Writes to a temporary file first, then renames over `path`.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let content = {
            let inner = self.inner.lock();
            serde_json::to_string_pretty(&inner.collections)?
        };

        let write_err = |source| StoreError::WriteError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(write_err)?;
        std::fs::rename(&tmp_path, path).map_err(write_err)?;
        Ok(())
    }

    /// Insert a document directly, bypassing failure injection and the
    /// operation log. Subscribers still receive the new snapshot.
    pub fn seed(&self, key: &DocumentKey, data: Value) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(key.collection.clone())
            .or_default()
            .insert(key.id.clone(), data);
        inner.broadcast(&key.collection);
    }

    /// Make the given operation fail until cleared
    pub fn fail_on(&self, fail_on: FailOn) {
        self.inner.lock().fail_on = Some(fail_on);
    }

    /// Stop injecting failures
    pub fn clear_failure(&self) {
        self.inner.lock().fail_on = None;
    }

    /// Deliver a transport fault to every subscriber of `collection`
    pub fn push_subscription_error(&self, collection: &str, message: &str) {
        let mut inner = self.inner.lock();
        let fault = SubscriptionFault::new(message);
        inner.subscribers.retain(|(watched, sender)| {
            if watched != collection {
                return true;
            }
            sender.send(Err(fault.clone())).is_ok()
        });
    }

    /// All operations received so far, oldest first
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.inner.lock().operations.clone()
    }

    /// Number of set/delete operations received so far
    pub fn write_count(&self) -> usize {
        self.inner
            .lock()
            .operations
            .iter()
            .filter(|op| op.is_write())
            .count()
    }

    /// Forget recorded operations
    pub fn clear_operations(&self) {
        self.inner.lock().operations.clear();
    }

    /// Number of documents currently stored in `collection`
    pub fn document_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Number of live subscriptions to `collection`
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .subscribers
            .iter()
            .filter(|(watched, sender)| watched == collection && !sender.is_closed())
            .count()
    }
}

impl MemoryStoreInner {
    fn check(&self, op: fn(&FailOn) -> Option<&String>) -> StoreResult<()> {
        match self.fail_on.as_ref().and_then(op) {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn snapshot(&self, collection: &str) -> Snapshot {
        let documents = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        key: DocumentKey::new(collection, id.clone()),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Snapshot::new(documents)
    }

    /// Push the current state of `collection` to its subscribers,
    /// dropping any whose receiver has gone away
    fn broadcast(&mut self, collection: &str) {
        let snapshot = self.snapshot(collection);
        self.subscribers.retain(|(watched, sender)| {
            if watched != collection {
                return true;
            }
            sender.send(Ok(snapshot.clone())).is_ok()
        });
    }
}

fn validate_key(key: &DocumentKey) -> StoreResult<()> {
    if key.id.is_empty() || key.id.contains('/') {
        return Err(StoreError::InvalidKey(key.id.clone()));
    }
    Ok(())
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn new_document_id(&self, _collection: &str) -> String {
        Uuid::new_v4().simple().to_string()[..DOCUMENT_ID_LEN].to_string()
    }

    async fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        let mut inner = self.inner.lock();
        inner.operations.push(StoreOperation::Get { key: key.clone() });
        inner.check(|f| match f {
            FailOn::Get(m) => Some(m),
            _ => None,
        })?;
        validate_key(key)?;

        Ok(inner
            .collections
            .get(&key.collection)
            .and_then(|docs| docs.get(&key.id))
            .map(|data| Document {
                key: key.clone(),
                data: data.clone(),
            }))
    }

    async fn set(&self, key: &DocumentKey, data: Value) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.operations.push(StoreOperation::Set {
            key: key.clone(),
            data: data.clone(),
        });
        inner.check(|f| match f {
            FailOn::Set(m) => Some(m),
            _ => None,
        })?;
        validate_key(key)?;

        debug!("set {}", key);
        inner
            .collections
            .entry(key.collection.clone())
            .or_default()
            .insert(key.id.clone(), data);
        inner.broadcast(&key.collection);
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner
            .operations
            .push(StoreOperation::Delete { key: key.clone() });
        inner.check(|f| match f {
            FailOn::Delete(m) => Some(m),
            _ => None,
        })?;
        validate_key(key)?;

        debug!("delete {}", key);
        let removed = inner
            .collections
            .get_mut(&key.collection)
            .and_then(|docs| docs.remove(&key.id))
            .is_some();
        if removed {
            inner.broadcast(&key.collection);
        }
        Ok(())
    }

    async fn count(&self, query: &CountQuery, source: AggregateSource) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        inner.operations.push(StoreOperation::Count {
            query: query.clone(),
            source,
        });
        inner.check(|f| match f {
            FailOn::Count(m) => Some(m),
            _ => None,
        })?;

        let count = inner
            .collections
            .get(&query.collection)
            .map_or(0, |docs| docs.values().filter(|d| query.matches(d)).count());
        Ok(count as u64)
    }

    async fn subscribe(&self, collection: &str) -> StoreResult<ChangeStream> {
        let mut inner = self.inner.lock();
        inner.operations.push(StoreOperation::Subscribe {
            collection: collection.to_string(),
        });
        inner.check(|f| match f {
            FailOn::Subscribe(m) => Some(m),
            _ => None,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        // New listeners start from the current contents
        let _ = tx.send(Ok(inner.snapshot(collection)));
        inner.subscribers.push((collection.to_string(), tx));
        debug!("subscribed to {}", collection);
        Ok(rx)
    }
}
