//! The remote movie catalog: domain types, wire types and HTTP clients.

pub mod api_types;
mod cached_client;
mod client;
mod types;

pub use cached_client::CachedCatalogClient;
pub use client::CatalogClient;
pub use types::Movie;
