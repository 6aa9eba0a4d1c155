//! Live subscription bridge
//!
//! Keeps exactly one subscription open per collection and turns each
//! delivered batch into a cache replacement followed by observer callbacks.
//!
//! ## Delivery
//!
//! The store pushes batches into a channel from whatever thread it likes.
//! A single consumer task owns the receiving end and is the only writer of
//! the cache:
//!
//! 1. Error batch: every observer gets `on_error`, cache untouched
//! 2. Snapshot: decode all documents, swap the cache in one step, then
//!    every observer gets `on_data_updated`
//!
//! Observers are never called while a replacement is being built.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::MovieCache;
use crate::error::{ProviderError, ProviderResult};
use crate::models::Movie;
use crate::store::{ChangeStream, RemoteStore, Snapshot, StoreResult};

/// Receives notifications from the subscription bridge
///
/// Callbacks run on the bridge's consumer task and should return quickly.
pub trait DataStatus: Send + Sync {
    /// The cache now reflects a new batch
    fn on_data_updated(&self);

    /// The subscription reported a failure; the cache is unchanged
    fn on_error(&self, message: &str);
}

/// Events forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Cache was replaced from a new batch
    DataUpdated,
    /// Subscription failure message
    Error(String),
}

impl ProviderEvent {
    /// Turn an error event into a [`ProviderError::Subscription`]
    pub fn into_result(self) -> ProviderResult<()> {
        match self {
            ProviderEvent::DataUpdated => Ok(()),
            ProviderEvent::Error(message) => Err(ProviderError::Subscription(message)),
        }
    }
}

/// Observer that forwards callbacks onto an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    event_tx: mpsc::UnboundedSender<ProviderEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiver for its events
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Arc::new(Self { event_tx }), event_rx)
    }
}

impl DataStatus for ChannelObserver {
    fn on_data_updated(&self) {
        let _ = self.event_tx.send(ProviderEvent::DataUpdated);
    }

    fn on_error(&self, message: &str) {
        let _ = self.event_tx.send(ProviderEvent::Error(message.to_string()));
    }
}

/// State shared between the bridge and its consumer task
#[derive(Default)]
struct Shared {
    observers: RwLock<Vec<Arc<dyn DataStatus>>>,
    /// At least one snapshot has been applied
    delivered: AtomicBool,
    batches_applied: AtomicU64,
    errors_seen: AtomicU64,
}

impl Shared {
    fn observers(&self) -> Vec<Arc<dyn DataStatus>> {
        self.observers.read().clone()
    }

    /// Mark a snapshot as applied and collect who to notify
    ///
    /// Runs under the observer lock so a concurrent registration is
    /// notified exactly once, by either this batch or `register`.
    fn mark_delivered(&self) -> Vec<Arc<dyn DataStatus>> {
        let observers = self.observers.read();
        self.delivered.store(true, Ordering::Release);
        self.batches_applied.fetch_add(1, Ordering::AcqRel);
        observers.clone()
    }

    /// Add an observer; returns true if a snapshot was already applied
    fn register(&self, observer: Arc<dyn DataStatus>) -> bool {
        let mut observers = self.observers.write();
        observers.push(observer);
        self.delivered.load(Ordering::Acquire)
    }
}

/// Owns the collection subscription and the cache it feeds
pub struct SubscriptionBridge {
    store: Arc<dyn RemoteStore>,
    collection: String,
    cache: Arc<MovieCache>,
    shared: Arc<Shared>,
    /// Consumer task, present once the subscription is open
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionBridge {
    pub fn new(store: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            cache: Arc::new(MovieCache::new()),
            shared: Arc::new(Shared::default()),
            task: Mutex::new(None),
        }
    }

    /// The cache this bridge keeps current
    pub fn cache(&self) -> &Arc<MovieCache> {
        &self.cache
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Register an observer, opening the subscription on first use
    ///
    /// If a snapshot has already been applied, the new observer is told
    /// immediately so it can read the current cache.
    pub async fn listen_for_updates(&self, observer: Arc<dyn DataStatus>) -> StoreResult<()> {
        {
            let mut task = self.task.lock().await;
            if task.is_none() {
                debug!("Opening subscription to {}", self.collection);
                let stream = self.store.subscribe(&self.collection).await?;
                *task = Some(tokio::spawn(consume(
                    stream,
                    Arc::clone(&self.cache),
                    Arc::clone(&self.shared),
                    self.collection.clone(),
                )));
            }
        }

        if self.shared.register(Arc::clone(&observer)) {
            observer.on_data_updated();
        }
        Ok(())
    }

    /// Whether the subscription has been opened
    pub async fn is_listening(&self) -> bool {
        self.task.lock().await.is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.shared.observers.read().len()
    }

    /// Number of snapshots applied to the cache so far
    pub fn batches_applied(&self) -> u64 {
        self.shared.batches_applied.load(Ordering::Acquire)
    }

    /// Number of subscription errors reported so far
    pub fn errors_seen(&self) -> u64 {
        self.shared.errors_seen.load(Ordering::Acquire)
    }
}

impl Drop for SubscriptionBridge {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// Decode every document in a snapshot, skipping ones that do not parse
fn decode_snapshot(snapshot: &Snapshot) -> Vec<Movie> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match Movie::from_document(doc) {
            Ok(movie) => Some(movie),
            Err(e) => {
                warn!("Skipping undecodable document {}: {}", doc.key, e);
                None
            }
        })
        .collect()
}

/// Consumer loop: the only writer of the cache
async fn consume(
    mut stream: ChangeStream,
    cache: Arc<MovieCache>,
    shared: Arc<Shared>,
    collection: String,
) {
    while let Some(batch) = stream.recv().await {
        match batch {
            Err(fault) => {
                warn!("Subscription to {} failed: {}", collection, fault);
                shared.errors_seen.fetch_add(1, Ordering::AcqRel);
                for observer in shared.observers() {
                    observer.on_error(&fault.message);
                }
            }
            Ok(snapshot) => {
                let movies = decode_snapshot(&snapshot);
                debug!(
                    "Applying batch to {}: {} document(s), {} decoded",
                    collection,
                    snapshot.len(),
                    movies.len()
                );
                cache.replace(movies);
                for observer in shared.mark_delivered() {
                    observer.on_data_updated();
                }
            }
        }
    }
    debug!("Subscription to {} closed", collection);
}
