//! CLI subcommand handlers. Kept thin: everything here goes through the
//! public surface of the cached catalog client.

use color_eyre::Result;

use crate::catalog::{CachedCatalogClient, Movie};
use crate::config::Config;
use crate::query::{self, SortKey};
use crate::sync::SyncOutcome;

/// Mirror the entire remote catalog into the local cache.
pub async fn sync(config: &Config) -> Result<()> {
  let client = CachedCatalogClient::new(config)?;

  let resumed = client.load_persisted()?;
  if resumed > 0 {
    println!("Resuming with {} records from the local store", resumed);
  }

  match client.sync_to_completion().await? {
    SyncOutcome::Completed => {
      println!("Catalog synchronized: {} records cached", client.total()?);
    }
    SyncOutcome::Aborted => {
      println!("Sync stopped; {} records cached so far", client.total()?);
    }
    SyncOutcome::Failed(e) => {
      println!(
        "Sync stopped early ({}); {} records cached so far",
        e,
        client.total()?
      );
    }
    SyncOutcome::Skipped => {
      println!("A sync already ran this session");
    }
  }

  Ok(())
}

/// Query the local mirror. Seeds the cache with a foreground fetch when it
/// is empty, and optionally refreshes matches from the remote search
/// endpoint first.
#[allow(clippy::too_many_arguments)]
pub async fn search(
  config: &Config,
  text: &str,
  years: &[String],
  genres: &[String],
  sort: SortKey,
  page: usize,
  limit: usize,
  remote: bool,
) -> Result<()> {
  let client = CachedCatalogClient::new(config)?;
  client.load_persisted()?;

  if client.total()? == 0 {
    // Nothing cached yet; pull the first page so the query has data.
    client.current_page(0, config.catalog.page_size).await?;
  }

  if remote && !text.is_empty() {
    client.search_catalog(text).await?;
  }

  let total = client.count(text, years, genres)?;
  let mut movies = client.search(text, years, genres)?;
  query::sort(&mut movies, sort);

  let slice = query::page(&movies, page * limit, limit);
  for movie in slice {
    println!("{}", format_movie(movie));
  }
  println!("{} of {} matches shown", slice.len(), total);

  Ok(())
}

/// Foreground fetch of one catalog page, bypassing the offline mirror.
pub async fn page(config: &Config, page: u32, limit: u32) -> Result<()> {
  let client = CachedCatalogClient::new(config)?;

  match client.current_page(page, limit).await? {
    Some(movies) => {
      for movie in &movies {
        println!("{}", format_movie(movie));
      }
      println!("Page {}: {} records", page, movies.len());
    }
    None => println!("Fetch superseded"),
  }

  Ok(())
}

fn format_movie(movie: &Movie) -> String {
  let year = movie.release_year().unwrap_or("----");
  format!(
    "{:>8}  {:<40}  {}  {:>4.1}",
    movie.id, movie.title, year, movie.vote_average
  )
}
