use serde::{Deserialize, Serialize};

/// A movie record, the unit of caching.
///
/// Records are persisted as JSON blobs, so this shape must stay stable
/// across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
  pub id: i64,
  pub title: String,
  pub poster_image_path: String,
  pub backdrop_image_path: String,
  /// ISO date ("YYYY-MM-DD") or empty when the catalog has none
  pub release_date: String,
  pub genres: Vec<String>,
  pub vote_average: f64,
  pub overview: String,
  pub rank: Option<i64>,
  pub vote_count: Option<i64>,
}

impl Movie {
  /// Whether this record may enter the cache. List views render title and
  /// both image paths unconditionally, so a record missing any of them is
  /// dropped at merge time.
  pub fn is_cacheable(&self) -> bool {
    !self.title.is_empty()
      && !self.poster_image_path.is_empty()
      && !self.backdrop_image_path.is_empty()
  }

  /// Release year as the 4-character prefix of the release date.
  pub fn release_year(&self) -> Option<&str> {
    self.release_date.get(..4)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn movie(title: &str, poster: &str, backdrop: &str) -> Movie {
    Movie {
      id: 1,
      title: title.to_string(),
      poster_image_path: poster.to_string(),
      backdrop_image_path: backdrop.to_string(),
      release_date: String::new(),
      genres: Vec::new(),
      vote_average: 0.0,
      overview: String::new(),
      rank: None,
      vote_count: None,
    }
  }

  #[test]
  fn test_cacheable_requires_title_and_images() {
    assert!(movie("Dune", "/p.jpg", "/b.jpg").is_cacheable());
    assert!(!movie("", "/p.jpg", "/b.jpg").is_cacheable());
    assert!(!movie("Dune", "", "/b.jpg").is_cacheable());
    assert!(!movie("Dune", "/p.jpg", "").is_cacheable());
  }

  #[test]
  fn test_release_year_is_date_prefix() {
    let mut m = movie("Dune", "/p.jpg", "/b.jpg");
    m.release_date = "2021-10-22".to_string();
    assert_eq!(m.release_year(), Some("2021"));

    m.release_date = String::new();
    assert_eq!(m.release_year(), None);
  }
}
