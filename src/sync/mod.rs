//! Catalog synchronization: cancellation lifecycles and the paging engine.
//!
//! Two independent fetch lifecycles feed the cache. Foreground fetches
//! retrieve the page a consumer is looking at right now and supersede each
//! other; the background sync walks the whole remote catalog once per
//! session so later queries run offline.

mod engine;
mod lifecycle;

pub use engine::{CatalogSync, SyncOutcome};
pub use lifecycle::{FetchTicket, RequestLifecycle};
