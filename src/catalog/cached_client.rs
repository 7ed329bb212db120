//! Catalog client with the synchronization cache wired in.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{NoopStore, PersistentStore, SqliteStore};
use crate::config::Config;
use crate::sync::{CatalogSync, SyncOutcome};

use super::client::CatalogClient;
use super::types::Movie;

/// Catalog client with a session-scoped synchronization cache.
///
/// Wraps the raw HTTP client and routes every fetch through the cache
/// engine: consumers read query results from the local mirror and only
/// trigger network traffic through the two managed fetch lifecycles. The
/// cache's lifetime is this value's lifetime — one per application session,
/// handed to consumers explicitly.
#[derive(Clone)]
pub struct CachedCatalogClient {
  inner: CatalogClient,
  sync: Arc<CatalogSync<Box<dyn PersistentStore>>>,
  page_size: u32,
}

impl CachedCatalogClient {
  /// Create the client for this session. When the on-disk store cannot be
  /// opened the cache degrades to memory-only instead of failing.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = CatalogClient::new(config)?;

    let opened = match &config.catalog.database {
      Some(path) => SqliteStore::open_at(path),
      None => SqliteStore::open(),
    };
    let persist: Box<dyn PersistentStore> = match opened {
      Ok(store) => Box::new(store),
      Err(e) => {
        warn!("catalog database unavailable, continuing without persistence: {e:#}");
        Box::new(NoopStore)
      }
    };

    Ok(Self {
      inner,
      sync: Arc::new(CatalogSync::new(persist)),
      page_size: config.catalog.page_size,
    })
  }

  /// Fetch one page for display. Supersedes any foreground fetch still in
  /// flight; returns `None` when this fetch itself was superseded.
  pub async fn current_page(&self, page: u32, limit: u32) -> Result<Option<Vec<Movie>>> {
    let inner = self.inner.clone();
    self
      .sync
      .fetch_page(move || async move { inner.fetch_page(page, limit).await })
      .await
  }

  /// Remote free-text search through the foreground domain. Results merge
  /// into the mirror like any other fetched page.
  pub async fn search_catalog(&self, query: &str) -> Result<Option<Vec<Movie>>> {
    let inner = self.inner.clone();
    let query = query.to_string();
    self
      .sync
      .fetch_page(move || async move { inner.search(&query).await })
      .await
  }

  /// Kick off the background full-catalog sync on its own task. No-op when
  /// a sync is already running or has completed this session.
  pub fn start_background_sync(&self) {
    let sync = Arc::clone(&self.sync);
    let inner = self.inner.clone();
    let page_size = self.page_size;

    tokio::spawn(async move {
      let outcome = sync
        .run_background_sync(move |page| {
          let inner = inner.clone();
          async move { inner.fetch_page(page, page_size).await }
        })
        .await;

      match outcome {
        Ok(SyncOutcome::Completed) => info!("catalog fully synchronized"),
        Ok(SyncOutcome::Aborted) => info!("background sync stopped"),
        Ok(SyncOutcome::Failed(e)) => warn!("background sync failed: {e:#}"),
        Ok(SyncOutcome::Skipped) => {}
        Err(e) => warn!("background sync error: {e:#}"),
      }
    });
  }

  /// Run the full-catalog sync on the current task and return its outcome.
  pub async fn sync_to_completion(&self) -> Result<SyncOutcome> {
    let inner = self.inner.clone();
    let page_size = self.page_size;
    self
      .sync
      .run_background_sync(move |page| {
        let inner = inner.clone();
        async move { inner.fetch_page(page, page_size).await }
      })
      .await
  }

  /// Cancel a running background sync, if any.
  pub fn stop_background_sync(&self) -> Result<()> {
    self.sync.stop_background_sync()
  }

  /// Promote records persisted by an earlier session into memory.
  pub fn load_persisted(&self) -> Result<usize> {
    self.sync.load_persisted()
  }

  /// Offline search over the cached mirror.
  pub fn search(&self, text: &str, years: &[String], genres: &[String]) -> Result<Vec<Movie>> {
    self.sync.search(text, years, genres)
  }

  /// Offline match count over the cached mirror.
  pub fn count(&self, text: &str, years: &[String], genres: &[String]) -> Result<usize> {
    self.sync.count(text, years, genres)
  }

  /// Number of records in the cached mirror.
  pub fn total(&self) -> Result<usize> {
    self.sync.total()
  }
}
