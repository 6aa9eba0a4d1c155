//! Data models for Reel
//!
//! Defines the `Movie` record and its mapping to store documents.
//! Field names (`id`, `title`, `genre`, `year`) are the document field names
//! and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, DocumentKey};

/// A movie in the collection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movie {
    /// Document id, assigned by the store on creation (empty before)
    #[serde(default)]
    pub id: String,
    /// Title, unique across the collection
    pub title: String,
    /// Genre
    pub genre: String,
    /// Release year
    pub year: i64,
}

impl Movie {
    /// Create a movie that has not been stored yet
    pub fn new(title: impl Into<String>, genre: impl Into<String>, year: i64) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            genre: genre.into(),
            year,
        }
    }

    /// Create a movie with a specific ID (for loading from storage)
    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        genre: impl Into<String>,
        year: i64,
    ) -> Self {
        Self {
            id: id.into(),
            ..Self::new(title, genre, year)
        }
    }

    /// Whether the store has assigned an id yet
    pub fn is_stored(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.genre = genre.into();
    }

    pub fn set_year(&mut self, year: i64) {
        self.year = year;
    }

    /// Check the record against the document it is stored under
    ///
    /// Returns the first violated rule, or `None` if the movie is valid.
    pub fn violation(&self, key: &DocumentKey) -> Option<&'static str> {
        if self.id.is_empty() {
            Some("id is empty")
        } else if self.id != key.id {
            Some("id does not match document key")
        } else if self.title.is_empty() {
            Some("title is empty")
        } else if self.genre.is_empty() {
            Some("genre is empty")
        } else if self.year <= 0 {
            Some("year must be positive")
        } else {
            None
        }
    }

    /// Whether the movie may be stored under `key`
    pub fn is_valid_for(&self, key: &DocumentKey) -> bool {
        self.violation(key).is_none()
    }

    /// Encode as a document body
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Decode a delivered document
    ///
    /// The document key wins over any `id` field in the body.
    pub fn from_document(doc: &Document) -> serde_json::Result<Self> {
        let mut movie: Movie = serde_json::from_value(doc.data.clone())?;
        movie.id = doc.key.id.clone();
        Ok(movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> DocumentKey {
        DocumentKey::new("movies", id)
    }

    #[test]
    fn test_movie_new() {
        let movie = Movie::new("Dune", "Scifi", 2021);
        assert_eq!(movie.title, "Dune");
        assert_eq!(movie.genre, "Scifi");
        assert_eq!(movie.year, 2021);
        assert!(!movie.is_stored());
    }

    #[test]
    fn test_movie_with_id() {
        let movie = Movie::with_id("k1", "Dune", "Scifi", 2021);
        assert_eq!(movie.id, "k1");
        assert!(movie.is_stored());
    }

    #[test]
    fn test_valid_movie() {
        let movie = Movie::with_id("k1", "Dune", "Scifi", 2021);
        assert!(movie.is_valid_for(&key("k1")));
    }

    #[test]
    fn test_invalid_fields() {
        let k = key("k1");
        assert_eq!(
            Movie::with_id("k1", "", "Scifi", 2021).violation(&k),
            Some("title is empty")
        );
        assert_eq!(
            Movie::with_id("k1", "Dune", "", 2021).violation(&k),
            Some("genre is empty")
        );
        assert_eq!(
            Movie::with_id("k1", "Dune", "Scifi", 0).violation(&k),
            Some("year must be positive")
        );
        assert_eq!(
            Movie::with_id("k1", "Dune", "Scifi", -5).violation(&k),
            Some("year must be positive")
        );
    }

    #[test]
    fn test_id_must_match_key() {
        let movie = Movie::with_id("k1", "Dune", "Scifi", 2021);
        assert!(!movie.is_valid_for(&key("k2")));

        let unsaved = Movie::new("Dune", "Scifi", 2021);
        assert!(!unsaved.is_valid_for(&key("")));
    }

    #[test]
    fn test_document_field_names() {
        let movie = Movie::with_id("k1", "Dune", "Scifi", 2021);
        let doc = movie.to_document().unwrap();
        assert_eq!(
            doc,
            json!({"id": "k1", "title": "Dune", "genre": "Scifi", "year": 2021})
        );
    }

    #[test]
    fn test_from_document_uses_key() {
        let doc = Document {
            key: key("k9"),
            data: json!({"title": "Heat", "genre": "Crime", "year": 1995}),
        };
        let movie = Movie::from_document(&doc).unwrap();
        assert_eq!(movie, Movie::with_id("k9", "Heat", "Crime", 1995));
    }

    #[test]
    fn test_from_document_rejects_bad_shape() {
        let doc = Document {
            key: key("k9"),
            data: json!({"title": "Heat", "year": "nineteen"}),
        };
        assert!(Movie::from_document(&doc).is_err());
    }

    #[test]
    fn test_setters() {
        let mut movie = Movie::new("Dune", "Scifi", 2021);
        movie.set_title("Heat");
        movie.set_genre("Crime");
        movie.set_year(1995);
        movie.set_id("k2");
        assert_eq!(movie, Movie::with_id("k2", "Heat", "Crime", 1995));
    }
}
