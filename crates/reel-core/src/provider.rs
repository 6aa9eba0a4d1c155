//! Movie provider
//!
//! `MovieProvider` is the entry point for application code. It owns the
//! subscription bridge (and through it the cache) and coordinates writes:
//!
//! - `add_movie` / `update_movie` ask the uniqueness oracle first and only
//!   write if no other movie has the title and the record is valid
//! - `delete_movie` fires a delete and does not wait for it
//!
//! The cache is never touched by writes. Changes show up once the store
//! pushes the next snapshot.
//!
//! ## Usage
//!
//! ```ignore
//! let provider = MovieProvider::new(store);
//! provider.listen_for_updates(observer).await?;
//!
//! let mut movie = Movie::new("Dune", "Scifi", 2021);
//! let key = provider.add_movie(&mut movie).await?;
//! ```
//!
//! ## Uniqueness
//!
//! The title check and the write are separate requests. Two writers racing
//! on the same title can both pass the check.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::MovieCache;
use crate::config::{Config, DEFAULT_COLLECTION};
use crate::error::{ProviderError, ProviderResult};
use crate::models::Movie;
use crate::oracle::{LiveCountOracle, UniquenessOracle, TITLE_FIELD};
use crate::store::{AggregateSource, CountQuery, DocumentKey, RemoteStore, StoreError};
use crate::subscription::{DataStatus, SubscriptionBridge};

/// Cached, uniqueness-checked access to the movie collection
pub struct MovieProvider {
    store: Arc<dyn RemoteStore>,
    collection: String,
    bridge: SubscriptionBridge,
    oracle: Arc<dyn UniquenessOracle>,
}

impl MovieProvider {
    /// Create a provider for the default `movies` collection
    ///
    /// Uniqueness is checked with a server-side count.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_collection(store, DEFAULT_COLLECTION)
    }

    /// Create a provider for a specific collection
    pub fn with_collection(store: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let oracle = Arc::new(LiveCountOracle::new(Arc::clone(&store), collection.clone()));
        Self {
            bridge: SubscriptionBridge::new(Arc::clone(&store), collection.clone()),
            store,
            collection,
            oracle,
        }
    }

    /// Create a provider for the configured collection
    pub fn from_config(store: Arc<dyn RemoteStore>, config: &Config) -> Self {
        Self::with_collection(store, config.collection.clone())
    }

    /// Replace the uniqueness oracle
    pub fn with_oracle(mut self, oracle: Arc<dyn UniquenessOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The subscription bridge feeding the cache
    pub fn bridge(&self) -> &SubscriptionBridge {
        &self.bridge
    }

    pub fn cache(&self) -> &Arc<MovieCache> {
        self.bridge.cache()
    }

    /// Movies as of the last applied snapshot
    pub fn movies(&self) -> Arc<Vec<Movie>> {
        self.cache().snapshot()
    }

    /// Register for cache updates, opening the subscription if needed
    pub async fn listen_for_updates(&self, observer: Arc<dyn DataStatus>) -> ProviderResult<()> {
        self.bridge.listen_for_updates(observer).await?;
        Ok(())
    }

    /// Key for an existing document in this collection
    pub fn document(&self, id: &str) -> DocumentKey {
        DocumentKey::new(self.collection.clone(), id)
    }

    /// Allocate a key for a new document
    pub fn new_document(&self) -> DocumentKey {
        self.document(&self.store.new_document_id(&self.collection))
    }

    /// Count movies with exactly this title, asking the server
    pub async fn get_movie_count_with_title(&self, title: &str) -> ProviderResult<u64> {
        let query = CountQuery::collection(self.collection.clone()).where_equal(TITLE_FIELD, title);
        let count = self.store.count(&query, AggregateSource::Server).await?;
        Ok(count)
    }

    /// Fail with `DuplicateTitle` if any movie already has `title`
    async fn ensure_unique(&self, title: &str) -> ProviderResult<()> {
        let count = self.oracle.count_with_title(title).await?;
        if count != 0 {
            warn!("Rejecting write: {} movie(s) titled {:?}", count, title);
            return Err(ProviderError::DuplicateTitle {
                title: title.to_string(),
            });
        }
        Ok(())
    }

    /// Whether `movie` may be stored under `key`
    pub fn valid_movie(&self, movie: &Movie, key: &DocumentKey) -> bool {
        movie.is_valid_for(key)
    }

    fn ensure_valid(movie: &Movie, key: &DocumentKey) -> ProviderResult<()> {
        match movie.violation(key) {
            Some(reason) => {
                warn!("Rejecting write to {}: {}", key, reason);
                Err(ProviderError::InvalidRecord {
                    reason: reason.to_string(),
                })
            }
            None => Ok(()),
        }
    }

    /// Store a new movie
    ///
    /// Assigns `movie.id` from a freshly allocated key once the title check
    /// passes, then validates and writes. Returns the new key.
    pub async fn add_movie(&self, movie: &mut Movie) -> ProviderResult<DocumentKey> {
        self.ensure_unique(&movie.title).await?;

        let key = self.new_document();
        movie.set_id(key.id());
        Self::ensure_valid(movie, &key)?;

        let data = movie.to_document().map_err(StoreError::from)?;
        self.store.set(&key, data).await?;
        info!("Added movie {:?} at {}", movie.title, key);
        Ok(key)
    }

    /// Change a stored movie's fields
    ///
    /// The new title must not be in use by any movie, including this one.
    /// The fields of `movie` are updated in place before validation, so they
    /// keep the new values even if the write is rejected as invalid.
    pub async fn update_movie(
        &self,
        movie: &mut Movie,
        title: impl Into<String>,
        genre: impl Into<String>,
        year: i64,
    ) -> ProviderResult<DocumentKey> {
        let title = title.into();
        self.ensure_unique(&title).await?;

        movie.set_title(title);
        movie.set_genre(genre);
        movie.set_year(year);
        let key = self.document(&movie.id);
        Self::ensure_valid(movie, &key)?;

        let data = movie.to_document().map_err(StoreError::from)?;
        self.store.set(&key, data).await?;
        info!("Updated movie {:?} at {}", movie.title, key);
        Ok(key)
    }

    /// Delete a movie without waiting for the result
    ///
    /// Failures are logged, not returned. The returned handle may be dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn delete_movie(&self, movie: &Movie) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let key = self.document(&movie.id);
        debug!("Deleting {}", key);
        tokio::spawn(async move {
            if let Err(e) = store.delete(&key).await {
                warn!("Delete of {} failed: {}", key, e);
            }
        })
    }

    /// Read one movie straight from the store
    pub async fn fetch_movie(&self, key: &DocumentKey) -> ProviderResult<Option<Movie>> {
        let Some(doc) = self.store.get(key).await? else {
            return Ok(None);
        };
        let movie = Movie::from_document(&doc).map_err(StoreError::from)?;
        Ok(Some(movie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FixedCountOracle;
    use crate::store::{FailOn, MemoryStore, StoreError, StoreOperation};
    use serde_json::json;

    fn live_provider() -> (MemoryStore, MovieProvider) {
        let store = MemoryStore::new();
        let provider = MovieProvider::new(Arc::new(store.clone()));
        (store, provider)
    }

    fn fixed_provider(count: u64) -> (MemoryStore, FixedCountOracle, MovieProvider) {
        let store = MemoryStore::new();
        let oracle = FixedCountOracle::new(count);
        let provider =
            MovieProvider::new(Arc::new(store.clone())).with_oracle(Arc::new(oracle.clone()));
        (store, oracle, provider)
    }

    #[tokio::test]
    async fn test_add_movie_assigns_id() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);

        let key = provider.add_movie(&mut movie).await.unwrap();

        assert_eq!(movie.id, key.id);
        assert_eq!(key.collection, "movies");
        assert_eq!(store.document_count("movies"), 1);

        let fetched = provider.fetch_movie(&key).await.unwrap().unwrap();
        assert_eq!(fetched, movie);
    }

    #[tokio::test]
    async fn test_add_movie_checks_count_before_writing() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        provider.add_movie(&mut movie).await.unwrap();

        let ops = store.operations();
        assert!(matches!(ops[0], StoreOperation::Count { .. }));
        assert!(matches!(ops[1], StoreOperation::Set { .. }));
    }

    #[tokio::test]
    async fn test_add_duplicate_title_rejected() {
        let (store, provider) = live_provider();
        store.seed(
            &DocumentKey::new("movies", "k1"),
            json!({"id": "k1", "title": "Dune", "genre": "Scifi", "year": 2021}),
        );

        let mut movie = Movie::new("Dune", "Drama", 1984);
        let err = provider.add_movie(&mut movie).await.unwrap_err();

        assert!(matches!(err, ProviderError::DuplicateTitle { ref title } if title == "Dune"));
        assert_eq!(store.write_count(), 0);
        assert!(movie.id.is_empty());
    }

    #[tokio::test]
    async fn test_add_invalid_movie_rejected() {
        let (store, provider) = live_provider();

        for mut movie in [
            Movie::new("", "Scifi", 2021),
            Movie::new("Dune", "", 2021),
            Movie::new("Dune", "Scifi", 0),
            Movie::new("Dune", "Scifi", -1),
        ] {
            let err = provider.add_movie(&mut movie).await.unwrap_err();
            assert!(matches!(err, ProviderError::InvalidRecord { .. }), "{movie:?}");
        }
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_count_failure_propagates() {
        let (store, provider) = live_provider();
        store.fail_on(FailOn::Count("unavailable".to_string()));

        let mut movie = Movie::new("Dune", "Scifi", 2021);
        let err = provider.add_movie(&mut movie).await.unwrap_err();
        assert!(matches!(err, ProviderError::Store(StoreError::Unavailable(_))));

        let err = provider.get_movie_count_with_title("Dune").await.unwrap_err();
        assert!(matches!(err, ProviderError::Store(StoreError::Unavailable(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let (store, provider) = live_provider();
        store.fail_on(FailOn::Set("permission denied".to_string()));

        let mut movie = Movie::new("Dune", "Scifi", 2021);
        let err = provider.add_movie(&mut movie).await.unwrap_err();
        assert!(matches!(err, ProviderError::Store(StoreError::Unavailable(_))));
        assert_eq!(store.document_count("movies"), 0);
    }

    #[tokio::test]
    async fn test_get_movie_count_with_title_uses_server() {
        let (store, provider) = live_provider();
        store.seed(&DocumentKey::new("movies", "a"), json!({"title": "Dune"}));
        store.seed(&DocumentKey::new("movies", "b"), json!({"title": "Dune"}));

        assert_eq!(provider.get_movie_count_with_title("Dune").await.unwrap(), 2);
        assert!(store.operations().iter().all(|op| matches!(
            op,
            StoreOperation::Count {
                source: AggregateSource::Server,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_update_movie() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        let key = provider.add_movie(&mut movie).await.unwrap();

        let updated_key = provider
            .update_movie(&mut movie, "Dune: Part Two", "Scifi", 2024)
            .await
            .unwrap();

        assert_eq!(updated_key, key);
        let stored = provider.fetch_movie(&key).await.unwrap().unwrap();
        assert_eq!(stored.title, "Dune: Part Two");
        assert_eq!(stored.year, 2024);
        assert_eq!(store.document_count("movies"), 1);
    }

    #[tokio::test]
    async fn test_update_keeping_own_title_is_duplicate() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        provider.add_movie(&mut movie).await.unwrap();
        store.clear_operations();

        let err = provider
            .update_movie(&mut movie, "Dune", "Drama", 2021)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::DuplicateTitle { .. }));
        assert_eq!(store.write_count(), 0);
        // Rejected before any field changed
        assert_eq!(movie.genre, "Scifi");
    }

    #[tokio::test]
    async fn test_update_invalid_year_leaves_store_unchanged() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        let key = provider.add_movie(&mut movie).await.unwrap();
        store.clear_operations();

        let err = provider
            .update_movie(&mut movie, "Arrival", "Scifi", -5)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidRecord { .. }));
        assert_eq!(store.write_count(), 0);
        // Local copy keeps the attempted values
        assert_eq!(movie.year, -5);

        let stored = provider.fetch_movie(&key).await.unwrap().unwrap();
        assert_eq!(stored.title, "Dune");
        assert_eq!(stored.year, 2021);
    }

    #[tokio::test]
    async fn test_update_unsaved_movie_is_invalid() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);

        let err = provider
            .update_movie(&mut movie, "Arrival", "Scifi", 2016)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRecord { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_movie() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        provider.add_movie(&mut movie).await.unwrap();

        provider.delete_movie(&movie).await.unwrap();
        assert_eq!(store.document_count("movies"), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_is_swallowed() {
        let (store, provider) = live_provider();
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        provider.add_movie(&mut movie).await.unwrap();
        store.fail_on(FailOn::Delete("offline".to_string()));

        // Task completes normally; the error is only logged
        provider.delete_movie(&movie).await.unwrap();
        assert_eq!(store.document_count("movies"), 1);
    }

    #[tokio::test]
    async fn test_fixed_oracle_duplicate() {
        let (store, oracle, provider) = fixed_provider(1);

        let mut movie = Movie::new("Dune", "Scifi", 2021);
        let err = provider.add_movie(&mut movie).await.unwrap_err();
        assert!(matches!(err, ProviderError::DuplicateTitle { .. }));

        // No count query reaches the store
        assert!(store.operations().is_empty());

        oracle.set_count(0);
        provider.add_movie(&mut movie).await.unwrap();
        assert_eq!(store.document_count("movies"), 1);
    }

    #[tokio::test]
    async fn test_fixed_oracle_update() {
        let (store, oracle, provider) = fixed_provider(0);
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        let key = provider.add_movie(&mut movie).await.unwrap();

        // Keeping the same title passes when the oracle says zero
        provider
            .update_movie(&mut movie, "Dune", "Drama", 2021)
            .await
            .unwrap();
        assert_eq!(provider.fetch_movie(&key).await.unwrap().unwrap().genre, "Drama");

        oracle.set_count(2);
        let err = provider
            .update_movie(&mut movie, "Heat", "Crime", 1995)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DuplicateTitle { .. }));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_valid_movie() {
        let (_store, provider) = live_provider();
        let key = provider.document("k1");

        assert!(provider.valid_movie(&Movie::with_id("k1", "Dune", "Scifi", 2021), &key));
        assert!(!provider.valid_movie(&Movie::with_id("k2", "Dune", "Scifi", 2021), &key));
    }

    #[test]
    fn test_with_collection() {
        let store = MemoryStore::new();
        let provider = MovieProvider::with_collection(Arc::new(store), "films");
        assert_eq!(provider.collection(), "films");
        assert_eq!(provider.new_document().collection, "films");
        assert!(provider.movies().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_movie() {
        let (_store, provider) = live_provider();
        let found = provider.fetch_movie(&provider.document("nope")).await.unwrap();
        assert!(found.is_none());
    }
}
