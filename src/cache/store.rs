//! In-memory tier of the movie cache.

use color_eyre::Result;
use std::collections::BTreeMap;

use crate::catalog::Movie;

use super::persist::PersistentStore;

/// Two-tier movie store: id-keyed in-memory maps backed by a persistent
/// adapter.
///
/// `movies` holds the page-scoped slice a consumer is actively showing;
/// `all_movies` is the accumulated mirror of the remote catalog. Every write
/// validates and dedups by id, so merging overlapping batches any number of
/// times leaves the maps in the same state as the first application.
///
/// Maps are `BTreeMap` so snapshot iteration order is deterministic (by id).
pub struct MovieStore<P: PersistentStore> {
  movies: BTreeMap<i64, Movie>,
  all_movies: BTreeMap<i64, Movie>,
  persist: P,
}

impl<P: PersistentStore> MovieStore<P> {
  pub fn new(persist: P) -> Self {
    Self {
      movies: BTreeMap::new(),
      all_movies: BTreeMap::new(),
      persist,
    }
  }

  /// Replace the page-scoped slice with the valid records of `batch`.
  pub fn set_movies(&mut self, batch: &[Movie]) {
    self.movies = batch
      .iter()
      .filter(|m| m.is_cacheable())
      .map(|m| (m.id, m.clone()))
      .collect();
  }

  /// Merge `batch` into the full mirror, last write winning per id, and
  /// persist the merged records.
  ///
  /// The in-memory map is updated before the durable write, so a
  /// persistence failure costs offline durability, not cache correctness.
  /// Returns how many records of the batch were valid and merged.
  pub fn merge_into_all(&mut self, batch: &[Movie]) -> Result<usize> {
    let valid: Vec<Movie> = batch
      .iter()
      .filter(|m| m.is_cacheable())
      .cloned()
      .collect();

    if valid.is_empty() {
      return Ok(0);
    }

    for movie in &valid {
      self.all_movies.insert(movie.id, movie.clone());
    }

    // The adapter upserts by id, so persisting the batch is equivalent to
    // persisting the whole merged set.
    self.persist.save_all(&valid)?;
    Ok(valid.len())
  }

  /// Promote records persisted by an earlier session into the in-memory
  /// mirror. Memory wins on id collisions: anything already in memory was
  /// observed more recently than the durable copy.
  pub fn load_persisted(&mut self) -> Result<usize> {
    let mut loaded = 0;
    for movie in self.persist.get_all()? {
      if !movie.is_cacheable() || self.all_movies.contains_key(&movie.id) {
        continue;
      }
      self.all_movies.insert(movie.id, movie);
      loaded += 1;
    }
    Ok(loaded)
  }

  /// Snapshot of the page-scoped slice, in id order.
  pub fn visible(&self) -> Vec<Movie> {
    self.movies.values().cloned().collect()
  }

  /// The full mirror, in id order.
  pub fn all(&self) -> impl Iterator<Item = &Movie> + '_ {
    self.all_movies.values()
  }

  /// Number of records in the full mirror.
  pub fn total(&self) -> usize {
    self.all_movies.len()
  }
}
