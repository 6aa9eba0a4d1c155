//! Remote store client seam
//!
//! The document store itself lives elsewhere. This module describes the
//! capability set the rest of the crate consumes:
//!
//! - key allocation and keyed get/set/delete
//! - server-computed aggregate counts with equality filters
//! - a live subscription delivering full collection snapshots
//!
//! ## Usage
//!
//! ```ignore
//! let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
//!
//! let key = DocumentKey::new("movies", store.new_document_id("movies"));
//! store.set(&key, json!({"title": "Dune"})).await?;
//!
//! let query = CountQuery::collection("movies").where_equal("title", "Dune");
//! let count = store.count(&query, AggregateSource::Server).await?;
//! ```

pub mod error;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

pub use error::{StoreError, StoreResult};
pub use memory::{FailOn, MemoryStore, StoreOperation};

/// Reference to a single document inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Collection name
    pub collection: String,
    /// Document id within the collection
    pub id: String,
}

impl DocumentKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Get the document id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Slash-separated path, e.g. `movies/abc123`
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as delivered by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: DocumentKey,
    pub data: Value,
}

/// Full view of a collection at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Transport or protocol failure reported on a live subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFault {
    pub message: String,
}

impl SubscriptionFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SubscriptionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One delivery on a live subscription
pub type ChangeBatch = Result<Snapshot, SubscriptionFault>;

/// Receiving end of a live subscription
///
/// The stream ends when the store drops its sender.
pub type ChangeStream = mpsc::UnboundedReceiver<ChangeBatch>;

/// Where an aggregate query is answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSource {
    /// The authoritative server
    Server,
    /// Whatever the client has cached locally
    Cache,
}

/// Aggregate count over a collection with equality filters
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
}

impl CountQuery {
    /// Count every document in `collection`
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
        }
    }

    /// Restrict to documents whose `field` equals `value`
    pub fn where_equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Check a document body against every filter
    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| data.get(field) == Some(value))
    }
}

/// Capability set of the remote document store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Allocate a fresh document id in `collection`
    ///
    /// Allocation is local; nothing is written until `set`.
    fn new_document_id(&self, collection: &str) -> String;

    /// Read one document
    async fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>>;

    /// Create or overwrite the document at `key`
    async fn set(&self, key: &DocumentKey, data: Value) -> StoreResult<()>;

    /// Delete the document at `key` (no-op if it does not exist)
    async fn delete(&self, key: &DocumentKey) -> StoreResult<()>;

    /// Count documents matching `query`
    async fn count(&self, query: &CountQuery, source: AggregateSource) -> StoreResult<u64>;

    /// Open a live subscription to `collection`
    async fn subscribe(&self, collection: &str) -> StoreResult<ChangeStream>;
}
