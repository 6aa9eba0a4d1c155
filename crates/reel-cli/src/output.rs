//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use reel_core::Movie;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single movie
    pub fn print_movie(&self, movie: &Movie) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:    {}", movie.id);
                println!("Title: {}", movie.title);
                println!("Genre: {}", movie.genre);
                println!("Year:  {}", movie.year);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(movie).unwrap_or_default());
            }
            OutputFormat::Quiet => {
                println!("{}", movie.id);
            }
        }
    }

    /// Print a list of movies
    pub fn print_movies(&self, movies: &[Movie]) {
        match self.format {
            OutputFormat::Human => {
                if movies.is_empty() {
                    println!("No movies found.");
                    return;
                }
                for movie in movies {
                    println!(
                        "{} | {} | {} | {}",
                        short_id(&movie.id),
                        truncate(&movie.title, 40),
                        truncate(&movie.genre, 15),
                        movie.year
                    );
                }
                println!("\n{} movie(s)", movies.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(movies).unwrap_or_default());
            }
            OutputFormat::Quiet => {
                for movie in movies {
                    println!("{}", movie.id);
                }
            }
        }
    }

    /// Print a title count
    pub fn print_count(&self, title: &str, count: u64) {
        match self.format {
            OutputFormat::Human => println!("{} movie(s) titled {:?}", count, title),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"title": title, "count": count}));
            }
            OutputFormat::Quiet => println!("{}", count),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// First 8 characters of a document id
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
