//! Serde-deserializable types matching the catalog API responses.
//!
//! These types are separate from domain types so that lenient wire decoding
//! stays at the network edge while domain types keep required fields plain.

use serde::Deserialize;

use super::types::Movie;

/// Raw movie object as the catalog endpoints return it.
///
/// Every field the server may omit or null out is optional here; conversion
/// to `Movie` fills defaults, and cache validation decides what is kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMovie {
  pub id: Option<i64>,
  pub title: Option<String>,
  pub poster_image_path: Option<String>,
  pub backdrop_image_path: Option<String>,
  pub release_date: Option<String>,
  pub genres: Option<Vec<String>>,
  pub vote_average: Option<f64>,
  pub overview: Option<String>,
  pub rank: Option<i64>,
  pub vote_count: Option<i64>,
}

impl ApiMovie {
  pub fn into_movie(self) -> Movie {
    Movie {
      id: self.id.unwrap_or_default(),
      title: self.title.unwrap_or_default(),
      poster_image_path: self.poster_image_path.unwrap_or_default(),
      backdrop_image_path: self.backdrop_image_path.unwrap_or_default(),
      release_date: self.release_date.unwrap_or_default(),
      genres: self.genres.unwrap_or_default(),
      vote_average: self.vote_average.unwrap_or_default(),
      overview: self.overview.unwrap_or_default(),
      rank: self.rank,
      vote_count: self.vote_count,
    }
  }
}

/// Page envelope for catalog listings.
///
/// Some endpoints return a bare JSON array of movies, others wrap the
/// records in a `{"content": [...]}` object. The distinction is decoded
/// exactly once, here; the rest of the crate only ever sees `Vec<Movie>`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiCatalogPage {
  Paged { content: Vec<ApiMovie> },
  Bare(Vec<ApiMovie>),
}

impl ApiCatalogPage {
  pub fn into_movies(self) -> Vec<Movie> {
    let raw = match self {
      Self::Paged { content } => content,
      Self::Bare(raw) => raw,
    };
    raw.into_iter().map(ApiMovie::into_movie).collect()
  }
}
