//! Pure query operations over cache snapshots.
//!
//! Everything here is synchronous and side-effect free: no network access,
//! no cache mutation, no hidden state. For a fixed snapshot and fixed
//! inputs the output is identical across calls, which is what lets the UI
//! re-run a query on every keystroke.

use crate::catalog::Movie;

/// Sort order applied to results before paginating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  /// Release date, newest first. Undated records sort last.
  Latest,
  /// Vote average, highest first.
  Rating,
  /// Title, lexicographic.
  Title,
}

impl std::str::FromStr for SortKey {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "latest" => Ok(Self::Latest),
      "rating" => Ok(Self::Rating),
      "title" => Ok(Self::Title),
      other => Err(format!(
        "unknown sort key '{other}' (expected latest, rating or title)"
      )),
    }
  }
}

fn matches(movie: &Movie, text_lower: &str, years: &[String], genres: &[String]) -> bool {
  if !text_lower.is_empty() && !movie.title.to_lowercase().contains(text_lower) {
    return false;
  }

  if !years.is_empty() {
    let year = movie.release_year();
    if !years.iter().any(|y| year == Some(y.as_str())) {
      return false;
    }
  }

  if !genres.is_empty() && !genres.iter().any(|g| movie.genres.contains(g)) {
    return false;
  }

  true
}

/// Filter a snapshot by title substring (case-insensitive), release year
/// and genre membership.
///
/// Filter groups compose with AND; within a group any member may match; an
/// empty group matches everything. Results keep the snapshot's iteration
/// order.
pub fn search<'a, I>(movies: I, text: &str, years: &[String], genres: &[String]) -> Vec<Movie>
where
  I: IntoIterator<Item = &'a Movie>,
{
  let text_lower = text.trim().to_lowercase();
  movies
    .into_iter()
    .filter(|m| matches(m, &text_lower, years, genres))
    .cloned()
    .collect()
}

/// Cardinality of [`search`] without materializing the result.
pub fn count<'a, I>(movies: I, text: &str, years: &[String], genres: &[String]) -> usize
where
  I: IntoIterator<Item = &'a Movie>,
{
  let text_lower = text.trim().to_lowercase();
  movies
    .into_iter()
    .filter(|m| matches(m, &text_lower, years, genres))
    .count()
}

/// Stable sort by `key`; ties keep the snapshot's id order, so repeated
/// calls over the same snapshot paginate identically.
pub fn sort(movies: &mut [Movie], key: SortKey) {
  match key {
    SortKey::Latest => movies.sort_by(|a, b| b.release_date.cmp(&a.release_date)),
    SortKey::Rating => movies.sort_by(|a, b| b.vote_average.total_cmp(&a.vote_average)),
    SortKey::Title => movies.sort_by(|a, b| a.title.cmp(&b.title)),
  }
}

/// The slice `[offset, offset + limit)` of a sorted result, saturating at
/// the end. Out-of-range offsets yield an empty slice.
pub fn page(movies: &[Movie], offset: usize, limit: usize) -> &[Movie] {
  let start = offset.min(movies.len());
  let end = offset.saturating_add(limit).min(movies.len());
  &movies[start..end]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn movie(id: i64, title: &str, date: &str, genres: &[&str], rating: f64) -> Movie {
    Movie {
      id,
      title: title.to_string(),
      poster_image_path: "/poster.jpg".to_string(),
      backdrop_image_path: "/backdrop.jpg".to_string(),
      release_date: date.to_string(),
      genres: genres.iter().map(|g| g.to_string()).collect(),
      vote_average: rating,
      overview: String::new(),
      rank: None,
      vote_count: None,
    }
  }

  fn snapshot() -> Vec<Movie> {
    vec![
      movie(1, "War of the Worlds", "2005-06-29", &["Sci-Fi"], 6.5),
      movie(2, "Warrior", "2011-09-09", &["Drama"], 8.1),
      movie(3, "Heat", "1995-12-15", &["Crime", "Drama"], 8.3),
      movie(4, "Cold War", "2018-06-08", &["Drama", "Romance"], 7.5),
      movie(5, "Dune", "2021-10-22", &["Sci-Fi"], 7.9),
    ]
  }

  #[test]
  fn test_search_title_is_case_insensitive_substring() {
    let movies = snapshot();
    let hits = search(&movies, "WAR", &[], &[]);
    let ids: Vec<i64> = hits.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
  }

  #[test]
  fn test_search_filters_compose_with_and() {
    let movies = snapshot();
    let years = vec!["2018".to_string()];
    let genres = vec!["Drama".to_string()];

    let hits = search(&movies, "war", &years, &genres);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 4);
  }

  #[test]
  fn test_search_empty_filters_match_everything() {
    let movies = snapshot();
    assert_eq!(search(&movies, "", &[], &[]).len(), movies.len());
  }

  #[test]
  fn test_search_any_member_of_a_filter_group_matches() {
    let movies = snapshot();
    let years = vec!["1995".to_string(), "2021".to_string()];

    let ids: Vec<i64> = search(&movies, "", &years, &[])
      .iter()
      .map(|m| m.id)
      .collect();
    assert_eq!(ids, vec![3, 5]);
  }

  #[test]
  fn test_search_is_deterministic() {
    let movies = snapshot();
    let first = search(&movies, "war", &[], &[]);
    let second = search(&movies, "war", &[], &[]);
    assert_eq!(first, second);
  }

  #[test]
  fn test_count_matches_search_len() {
    let movies = snapshot();
    let genres = vec!["Drama".to_string()];
    assert_eq!(
      count(&movies, "", &[], &genres),
      search(&movies, "", &[], &genres).len()
    );
  }

  #[test]
  fn test_sort_latest_puts_newest_first() {
    let mut movies = snapshot();
    sort(&mut movies, SortKey::Latest);
    let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![5, 4, 2, 1, 3]);
  }

  #[test]
  fn test_sort_rating_puts_highest_first() {
    let mut movies = snapshot();
    sort(&mut movies, SortKey::Rating);
    assert_eq!(movies[0].id, 3);
    assert_eq!(movies[1].id, 2);
  }

  #[test]
  fn test_sort_title_is_lexicographic() {
    let mut movies = snapshot();
    sort(&mut movies, SortKey::Title);
    assert_eq!(movies[0].title, "Cold War");
    assert_eq!(movies[4].title, "Warrior");
  }

  #[test]
  fn test_page_returns_exact_slice() {
    let movies: Vec<Movie> = (0..50)
      .map(|id| movie(id, "Film", "2020-01-01", &[], 5.0))
      .collect();

    let slice = page(&movies, 10, 5);
    let ids: Vec<i64> = slice.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![10, 11, 12, 13, 14]);

    // Stable across repeated calls with no mutation of the input.
    let again = page(&movies, 10, 5);
    assert_eq!(slice, again);
  }

  #[test]
  fn test_page_saturates_at_the_end() {
    let movies: Vec<Movie> = (0..3)
      .map(|id| movie(id, "Film", "2020-01-01", &[], 5.0))
      .collect();

    assert_eq!(page(&movies, 2, 5).len(), 1);
    assert!(page(&movies, 10, 5).is_empty());
    assert_eq!(page(&movies, 0, 0).len(), 0);
  }
}
