//! Fetch orchestration over the tiered store: foreground page fetches and
//! the background full-catalog walk.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::cache::{MovieStore, PersistentStore};
use crate::catalog::Movie;
use crate::query;

use super::lifecycle::RequestLifecycle;

/// How a background sync run ended.
#[derive(Debug)]
pub enum SyncOutcome {
  /// The walk reached an empty page; the whole catalog is mirrored.
  Completed,
  /// The run was cancelled. Partial data stays merged and a later start
  /// resumes from page 0.
  Aborted,
  /// A transport failure stopped the walk. The sync is best-effort
  /// readahead, so the caller decides whether this is worth surfacing.
  Failed(color_eyre::Report),
  /// A sync was already running, or one already completed this session.
  Skipped,
}

/// Synchronization engine tying the tiered store to a remote catalog.
///
/// The engine is generic over fetcher closures rather than a concrete HTTP
/// client, so the paging loop and the cancellation rules can be exercised
/// against scripted catalogs; `CachedCatalogClient` wires the real client
/// in.
///
/// Locks are held only across synchronous map mutation, never across an
/// await. Overlapping fetches are reconciled through [`RequestLifecycle`].
pub struct CatalogSync<P: PersistentStore> {
  store: Mutex<MovieStore<P>>,
  lifecycle: Mutex<RequestLifecycle>,
}

impl<P: PersistentStore> CatalogSync<P> {
  pub fn new(persist: P) -> Self {
    Self {
      store: Mutex::new(MovieStore::new(persist)),
      lifecycle: Mutex::new(RequestLifecycle::new()),
    }
  }

  /// Fetch one batch for display through the foreground domain.
  ///
  /// Starting a new foreground fetch supersedes any fetch still in flight.
  /// Returns `Ok(None)` when this fetch itself was superseded — including
  /// the case where its response arrived intact but a newer fetch had
  /// already taken over. On success the batch replaces the page-scoped
  /// slice and is merged into the full mirror.
  pub async fn fetch_page<F, Fut>(&self, fetcher: F) -> Result<Option<Vec<Movie>>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Movie>>>,
  {
    let ticket = self.lock_lifecycle()?.begin_foreground();

    let fetched = tokio::select! {
      _ = ticket.cancelled() => None,
      result = fetcher() => Some(result),
    };

    let batch = match fetched {
      // Superseded while in flight; the stale request is abandoned.
      None => return Ok(None),
      Some(Err(e)) => {
        // A cancelled request may surface as a transport error; only the
        // current ticket's errors reach the caller.
        if self.lock_lifecycle()?.is_current(&ticket) {
          return Err(e);
        }
        return Ok(None);
      }
      Some(Ok(batch)) => batch,
    };

    // The response may have completed just before a newer fetch cancelled
    // this ticket. Token identity decides, not the abort signal.
    if !self.lock_lifecycle()?.is_current(&ticket) {
      return Ok(None);
    }

    let mut store = self.lock_store()?;
    store.set_movies(&batch);
    if let Err(e) = store.merge_into_all(&batch) {
      warn!("persisting fetched page failed: {e:#}");
    }
    Ok(Some(store.visible()))
  }

  /// Walk the remote catalog page by page until the first empty page,
  /// merging every batch into the full mirror.
  ///
  /// Idempotent and resumable: a rerun after an abort re-merges pages it
  /// has already seen, which the store's dedup makes harmless. There is no
  /// retry or backoff; a transport failure ends the run.
  pub async fn run_background_sync<F, Fut>(&self, fetch: F) -> Result<SyncOutcome>
  where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Vec<Movie>>>,
  {
    let token = {
      let mut lifecycle = self.lock_lifecycle()?;
      match lifecycle.begin_background() {
        Some(token) => token,
        None => {
          debug!(
            running = lifecycle.is_background_fetching(),
            finished = lifecycle.is_background_fetched(),
            "background sync already started this session"
          );
          return Ok(SyncOutcome::Skipped);
        }
      }
    };

    let mut page = 0u32;
    let outcome = loop {
      let result = tokio::select! {
        _ = token.cancelled() => break SyncOutcome::Aborted,
        result = fetch(page) => result,
      };

      let batch = match result {
        Ok(batch) => batch,
        Err(e) => {
          if token.is_cancelled() {
            break SyncOutcome::Aborted;
          }
          warn!("background sync stopped at page {page}: {e:#}");
          break SyncOutcome::Failed(e);
        }
      };

      // Raw emptiness ends the walk. Validation happens inside the store,
      // so a page of nothing-but-invalid records still advances the loop.
      if batch.is_empty() {
        break SyncOutcome::Completed;
      }

      match self.lock_store()?.merge_into_all(&batch) {
        Ok(merged) => debug!("page {page}: merged {merged} of {} records", batch.len()),
        // Memory stays correct without durability; keep walking.
        Err(e) => warn!("page {page}: persisting merged records failed: {e:#}"),
      }
      page += 1;
    };

    self
      .lock_lifecycle()?
      .finish_background(matches!(outcome, SyncOutcome::Completed));
    Ok(outcome)
  }

  /// Cancel a running background sync, if any. The completed flag stays
  /// unset, so a later start can resume the walk.
  pub fn stop_background_sync(&self) -> Result<()> {
    self.lock_lifecycle()?.stop_background();
    Ok(())
  }

  /// Promote records persisted by an earlier session into memory.
  pub fn load_persisted(&self) -> Result<usize> {
    self.lock_store()?.load_persisted()
  }

  /// Case-insensitive title search over the full mirror, filtered by year
  /// and genre. Reads a snapshot; never touches the network.
  pub fn search(&self, text: &str, years: &[String], genres: &[String]) -> Result<Vec<Movie>> {
    let store = self.lock_store()?;
    Ok(query::search(store.all(), text, years, genres))
  }

  /// Cardinality of [`search`](Self::search) without materializing it.
  pub fn count(&self, text: &str, years: &[String], genres: &[String]) -> Result<usize> {
    let store = self.lock_store()?;
    Ok(query::count(store.all(), text, years, genres))
  }

  /// Snapshot of the page-scoped slice currently shown.
  pub fn visible(&self) -> Result<Vec<Movie>> {
    Ok(self.lock_store()?.visible())
  }

  /// Number of records in the full mirror.
  pub fn total(&self) -> Result<usize> {
    Ok(self.lock_store()?.total())
  }

  fn lock_store(&self) -> Result<MutexGuard<'_, MovieStore<P>>> {
    self
      .store
      .lock()
      .map_err(|e| eyre!("Store lock poisoned: {}", e))
  }

  fn lock_lifecycle(&self) -> Result<MutexGuard<'_, RequestLifecycle>> {
    self
      .lifecycle
      .lock()
      .map_err(|e| eyre!("Lifecycle lock poisoned: {}", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::NoopStore;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;
  use tokio::time::sleep;

  fn movie(id: i64, title: &str) -> Movie {
    Movie {
      id,
      title: title.to_string(),
      poster_image_path: "/poster.jpg".to_string(),
      backdrop_image_path: "/backdrop.jpg".to_string(),
      release_date: "2020-01-01".to_string(),
      genres: Vec::new(),
      vote_average: 0.0,
      overview: String::new(),
      rank: None,
      vote_count: None,
    }
  }

  fn batch(start: i64, len: i64) -> Vec<Movie> {
    (start..start + len).map(|id| movie(id, "Film")).collect()
  }

  #[tokio::test]
  async fn test_background_sync_walks_until_empty_page() {
    let sync = CatalogSync::new(NoopStore);
    let calls = Arc::new(AtomicUsize::new(0));

    let fetch = {
      let calls = Arc::clone(&calls);
      move |page: u32| {
        calls.fetch_add(1, Ordering::SeqCst);
        let result = match page {
          0 => batch(0, 500),
          1 => batch(500, 500),
          _ => Vec::new(),
        };
        async move { Ok(result) }
      }
    };

    let outcome = sync.run_background_sync(fetch.clone()).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Completed));
    assert_eq!(sync.total().unwrap(), 1000);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Completed is terminal for the session: no further network calls.
    let outcome = sync.run_background_sync(fetch).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Skipped));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_background_sync_overlapping_pages_merge_once() {
    let sync = CatalogSync::new(NoopStore);

    // Pages 0 and 1 overlap on ids 400..500.
    let fetch = |page: u32| {
      let result = match page {
        0 => batch(0, 500),
        1 => batch(400, 500),
        _ => Vec::new(),
      };
      async move { Ok(result) }
    };

    let outcome = sync.run_background_sync(fetch).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Completed));
    assert_eq!(sync.total().unwrap(), 900);
  }

  #[tokio::test]
  async fn test_background_sync_stop_aborts_and_allows_restart() {
    let sync = Arc::new(CatalogSync::new(NoopStore));

    let task = {
      let sync = Arc::clone(&sync);
      tokio::spawn(async move {
        sync
          .run_background_sync(|page: u32| async move {
            if page == 0 {
              Ok(batch(0, 500))
            } else {
              // Hang until cancelled.
              std::future::pending().await
            }
          })
          .await
      })
    };

    sleep(Duration::from_millis(50)).await;
    sync.stop_background_sync().unwrap();
    let outcome = task.await.unwrap().unwrap();

    assert!(matches!(outcome, SyncOutcome::Aborted));
    assert_eq!(sync.total().unwrap(), 500);

    // Aborted runs are not terminal; a later start walks again from page 0.
    let outcome = sync
      .run_background_sync(|_page| async { Ok(Vec::new()) })
      .await
      .unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed));
  }

  #[tokio::test]
  async fn test_background_sync_transport_failure_keeps_partial_data() {
    let sync = CatalogSync::new(NoopStore);

    let outcome = sync
      .run_background_sync(|page: u32| async move {
        if page == 0 {
          Ok(batch(0, 500))
        } else {
          Err(eyre!("connection reset"))
        }
      })
      .await
      .unwrap();

    assert!(matches!(outcome, SyncOutcome::Failed(_)));
    assert_eq!(sync.total().unwrap(), 500);

    // Failure is not terminal either.
    let outcome = sync
      .run_background_sync(|_page| async { Ok(Vec::new()) })
      .await
      .unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed));
  }

  #[tokio::test]
  async fn test_background_sync_all_invalid_page_still_advances() {
    let sync = CatalogSync::new(NoopStore);

    let outcome = sync
      .run_background_sync(|page: u32| async move {
        match page {
          // Non-empty but nothing cacheable: the walk must not stop here.
          0 => Ok(vec![movie(1, ""), movie(2, "")]),
          1 => Ok(vec![movie(3, "Heat")]),
          _ => Ok(Vec::new()),
        }
      })
      .await
      .unwrap();

    assert!(matches!(outcome, SyncOutcome::Completed));
    assert_eq!(sync.total().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_foreground_fetch_updates_page_slice_and_mirror() {
    let sync = CatalogSync::new(NoopStore);

    let result = sync
      .fetch_page(|| async { Ok(vec![movie(1, "Heat"), movie(2, "")]) })
      .await
      .unwrap();

    let visible = result.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "Heat");
    assert_eq!(sync.total().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_foreground_fetch_supersession() {
    let sync = Arc::new(CatalogSync::new(NoopStore));

    // Slow fetch A starts first.
    let slow = {
      let sync = Arc::clone(&sync);
      tokio::spawn(async move {
        sync
          .fetch_page(|| async {
            sleep(Duration::from_millis(200)).await;
            Ok(vec![movie(1, "A")])
          })
          .await
      })
    };

    sleep(Duration::from_millis(50)).await;

    // Fast fetch B supersedes it.
    let fast = sync
      .fetch_page(|| async { Ok(vec![movie(2, "B")]) })
      .await
      .unwrap();

    assert_eq!(fast.unwrap()[0].id, 2);

    // A resolves late and must be discarded.
    let slow = slow.await.unwrap().unwrap();
    assert!(slow.is_none());

    let visible = sync.visible().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, 2);
  }

  #[tokio::test]
  async fn test_foreground_transport_failure_is_surfaced() {
    let sync: CatalogSync<NoopStore> = CatalogSync::new(NoopStore);

    let result = sync
      .fetch_page(|| async { Err(eyre!("503 Service Unavailable")) })
      .await;

    assert!(result.is_err());
  }
}
