//! Movie command handlers

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use reel_core::{ChannelObserver, Movie, MovieProvider, ProviderEvent};

use crate::output::Output;

/// How long `list` waits for the first snapshot
const FIRST_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Add a new movie
pub async fn add(
    provider: &MovieProvider,
    title: String,
    genre: String,
    year: i64,
    output: &Output,
) -> Result<()> {
    let mut movie = Movie::new(title, genre, year);
    let key = provider
        .add_movie(&mut movie)
        .await
        .context("Failed to add movie")?;

    output.success(&format!("Added movie: {}", key.id));
    output.print_movie(&movie);
    Ok(())
}

/// Update fields of an existing movie; omitted fields keep their value
pub async fn update(
    provider: &MovieProvider,
    id: String,
    title: Option<String>,
    genre: Option<String>,
    year: Option<i64>,
    output: &Output,
) -> Result<()> {
    let mut movie = find(provider, &id).await?;

    let title = title.unwrap_or_else(|| movie.title.clone());
    let genre = genre.unwrap_or_else(|| movie.genre.clone());
    let year = year.unwrap_or(movie.year);

    provider
        .update_movie(&mut movie, title, genre, year)
        .await
        .context("Failed to update movie")?;

    output.success(&format!("Updated movie: {}", movie.id));
    output.print_movie(&movie);
    Ok(())
}

/// Delete a movie
pub async fn delete(provider: &MovieProvider, id: String, output: &Output) -> Result<()> {
    let movie = find(provider, &id).await?;

    // The delete runs in the background; wait so the process does not exit first
    provider
        .delete_movie(&movie)
        .await
        .context("Delete task did not complete")?;

    output.success(&format!("Deleted movie: {} ({})", movie.title, movie.id));
    Ok(())
}

/// List movies from the cache once the first snapshot has arrived
pub async fn list(provider: &MovieProvider, output: &Output) -> Result<()> {
    let (observer, mut events) = ChannelObserver::channel();
    provider.listen_for_updates(observer).await?;

    let event = tokio::time::timeout(FIRST_SNAPSHOT_TIMEOUT, events.recv())
        .await
        .context("Timed out waiting for movie list")?
        .ok_or_else(|| anyhow!("Subscription closed before any data arrived"))?;
    if let ProviderEvent::Error(message) = event {
        bail!("Subscription error: {}", message);
    }

    let mut movies = provider.movies().as_ref().clone();
    movies.sort_by(|a, b| a.title.cmp(&b.title));
    output.print_movies(&movies);
    Ok(())
}

/// Count movies with exactly this title
pub async fn count(provider: &MovieProvider, title: String, output: &Output) -> Result<()> {
    let count = provider
        .get_movie_count_with_title(&title)
        .await
        .context("Failed to count movies")?;
    output.print_count(&title, count);
    Ok(())
}

async fn find(provider: &MovieProvider, id: &str) -> Result<Movie> {
    provider
        .fetch_movie(&provider.document(id))
        .await?
        .ok_or_else(|| anyhow!("Movie not found: {}", id))
}
