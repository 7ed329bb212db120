//! Cancellation bookkeeping for the two fetch domains.
//!
//! Foreground page fetches and the background full-catalog sync cancel
//! independently. A foreground fetch holds a [`FetchTicket`]; when its
//! response lands, the ticket is compared against the one currently issued.
//! Identity decides staleness, not the abort signal: a request can complete
//! successfully a moment before cancellation reaches it, and its result
//! must still be discarded.

use tokio_util::sync::CancellationToken;

/// Handle for one in-flight foreground fetch: a cancellation token plus the
/// serial it was issued under.
#[derive(Debug, Clone)]
pub struct FetchTicket {
  serial: u64,
  token: CancellationToken,
}

impl FetchTicket {
  /// Resolves once this fetch has been cancelled.
  pub async fn cancelled(&self) {
    self.token.cancelled().await;
  }

  pub fn is_cancelled(&self) -> bool {
    self.token.is_cancelled()
  }
}

/// Tracks the active cancellation token of each fetch domain.
#[derive(Debug, Default)]
pub struct RequestLifecycle {
  foreground_serial: u64,
  foreground: Option<CancellationToken>,
  background: Option<CancellationToken>,
  background_fetching: bool,
  background_fetched: bool,
}

impl RequestLifecycle {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start a new foreground fetch, cancelling whichever one was active.
  pub fn begin_foreground(&mut self) -> FetchTicket {
    if let Some(token) = self.foreground.take() {
      token.cancel();
    }

    let token = CancellationToken::new();
    self.foreground_serial += 1;
    self.foreground = Some(token.clone());

    FetchTicket {
      serial: self.foreground_serial,
      token,
    }
  }

  /// Whether `ticket` still owns the foreground domain. A response arriving
  /// under a superseded ticket must be discarded by the caller.
  pub fn is_current(&self, ticket: &FetchTicket) -> bool {
    self.foreground.is_some() && self.foreground_serial == ticket.serial
  }

  /// Token for a new background sync, or `None` when a sync is already
  /// running or has already completed this session.
  pub fn begin_background(&mut self) -> Option<CancellationToken> {
    if self.background_fetching || self.background_fetched {
      return None;
    }

    let token = CancellationToken::new();
    self.background = Some(token.clone());
    self.background_fetching = true;
    Some(token)
  }

  /// Record the end of a background sync run. Only a completed run latches
  /// the fetched flag; an aborted or failed run may be started again.
  pub fn finish_background(&mut self, completed: bool) {
    self.background = None;
    self.background_fetching = false;
    if completed {
      self.background_fetched = true;
    }
  }

  /// Cancel a running background sync. The fetched flag is left untouched,
  /// so a future start remains possible.
  pub fn stop_background(&mut self) {
    if let Some(token) = self.background.take() {
      token.cancel();
    }
    self.background_fetching = false;
  }

  pub fn is_background_fetching(&self) -> bool {
    self.background_fetching
  }

  pub fn is_background_fetched(&self) -> bool {
    self.background_fetched
  }
}
