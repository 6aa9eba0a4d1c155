//! In-memory mirror of the movie collection
//!
//! The cache is replaced wholesale, never edited in place. A replacement is
//! built off to the side and published with a single pointer swap, so a
//! reader sees either the previous collection or the new one.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::Movie;

/// Latest known contents of the collection
#[derive(Debug, Default)]
pub struct MovieCache {
    movies: RwLock<Arc<Vec<Movie>>>,
}

impl MovieCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents
    ///
    /// The returned snapshot is immutable and unaffected by later updates.
    pub fn snapshot(&self) -> Arc<Vec<Movie>> {
        Arc::clone(&self.movies.read())
    }

    /// Publish a new collection, returning the previous one
    pub(crate) fn replace(&self, movies: Vec<Movie>) -> Arc<Vec<Movie>> {
        let next = Arc::new(movies);
        std::mem::replace(&mut *self.movies.write(), next)
    }

    pub fn len(&self) -> usize {
        self.movies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.read().is_empty()
    }

    /// Look up a cached movie by document id
    pub fn get(&self, id: &str) -> Option<Movie> {
        self.movies.read().iter().find(|m| m.id == id).cloned()
    }

    /// Cached movies with exactly this title
    pub fn with_title(&self, title: &str) -> Vec<Movie> {
        self.movies
            .read()
            .iter()
            .filter(|m| m.title == title)
            .cloned()
            .collect()
    }
}
