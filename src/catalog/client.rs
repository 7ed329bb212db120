use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::config::Config;

use super::api_types::ApiCatalogPage;
use super::types::Movie;

/// HTTP client for the remote movie catalog.
///
/// Responses are decoded at this edge into `Vec<Movie>`; nothing past the
/// client ever sees the wire shape.
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base: Url,
}

impl CatalogClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut base = Url::parse(&config.catalog.url)
      .map_err(|e| eyre!("Invalid catalog url {}: {}", config.catalog.url, e))?;

    // Url::join replaces the last path segment unless the base ends in '/'
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("flick/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  /// Fetch one page of the catalog listing.
  pub async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<Movie>> {
    let mut url = self.endpoint("catalog")?;
    url
      .query_pairs_mut()
      .append_pair("page", &page.to_string())
      .append_pair("limit", &limit.to_string());

    self.fetch_movies(url).await
  }

  /// Free-text remote search; returns the same record shape as the listing.
  pub async fn search(&self, query: &str) -> Result<Vec<Movie>> {
    let mut url = self.endpoint("catalog/search")?;
    url.query_pairs_mut().append_pair("query", query);

    self.fetch_movies(url).await
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  async fn fetch_movies(&self, url: Url) -> Result<Vec<Movie>> {
    let page: ApiCatalogPage = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach catalog at {}: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("Catalog request failed: {}", e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to decode catalog response: {}", e))?;

    Ok(page.into_movies())
  }
}
