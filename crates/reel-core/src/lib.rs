//! Reel Core Library
//!
//! This crate provides cached, uniqueness-checked access to a collection of
//! movies held in a remote document store.
//!
//! # Architecture
//!
//! - **Store**: the remote document store, reached through the `RemoteStore`
//!   trait
//! - **Cache**: in-memory mirror of the collection, refreshed by a live
//!   subscription
//! - **Provider**: validates and de-duplicates writes before they reach the
//!   store
//!
//! Reads are served from the cache. Writes go to the store and come back
//! through the subscription.
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(MemoryStore::new());
//! let provider = MovieProvider::new(store);
//!
//! let (observer, mut events) = ChannelObserver::channel();
//! provider.listen_for_updates(observer).await?;
//!
//! let mut movie = Movie::new("Dune", "Scifi", 2021);
//! provider.add_movie(&mut movie).await?;
//!
//! events.recv().await;
//! let movies = provider.movies();
//! ```
//!
//! # Modules
//!
//! - `provider`: write coordination (main entry point)
//! - `instance`: shared provider slot
//! - `subscription`: live subscription bridge and observers
//! - `cache`: atomically replaced movie cache
//! - `oracle`: uniqueness count strategies
//! - `models`: the `Movie` record
//! - `store`: remote store seam and in-memory implementation
//! - `config`: application configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod instance;
pub mod models;
pub mod oracle;
pub mod provider;
pub mod store;
pub mod subscription;

pub use cache::MovieCache;
pub use config::Config;
pub use error::{ProviderError, ProviderResult};
pub use instance::{get_instance, set_instance_for_testing, ProviderSlot};
pub use models::Movie;
pub use oracle::{FixedCountOracle, LiveCountOracle, UniquenessOracle};
pub use provider::MovieProvider;
pub use store::{DocumentKey, MemoryStore, RemoteStore, StoreError};
pub use subscription::{ChannelObserver, DataStatus, ProviderEvent, SubscriptionBridge};
