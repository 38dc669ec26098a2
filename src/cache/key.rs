use std::fmt::{Display, Write};
use std::time::Duration;

use md5::{Digest, Md5};

use crate::models::{MediaFilter, Timeframe};

/// Builds a fixed-length cache key from an operation name and ordered params
///
/// Each param is appended as `:<len><text>` so that params containing the
/// separator cannot collide with a different split of the same characters.
pub fn build_key(operation: &str, params: &[&dyn Display]) -> String {
    let mut raw = String::from(operation);
    for param in params {
        let text = param.to_string();
        // Writing to a String cannot fail
        let _ = write!(raw, ":{}{}", text.len(), text);
    }

    hex::encode(Md5::digest(raw.as_bytes()))
}

/// TTLs per kind of cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub details: Duration,
    pub search: Duration,
    pub trending: Duration,
    pub genres: Duration,
    pub recommendations: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            details: Duration::from_secs(60 * 60),
            search: Duration::from_secs(30 * 60),
            trending: Duration::from_secs(60 * 60),
            genres: Duration::from_secs(24 * 60 * 60),
            recommendations: Duration::from_secs(30 * 60),
        }
    }
}

/// Every cached operation with its parameters in key order
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    MovieDetails(u64),
    TvDetails(u64),
    Search {
        query: String,
        media_type: MediaFilter,
        include_adult: bool,
    },
    Trending {
        timeframe: Timeframe,
        page: u32,
        media_type: MediaFilter,
    },
    Genres,
    MoviesByGenre {
        genre_id: u32,
        page: u32,
        sort_by: String,
    },
    OmdbTitle {
        title: String,
        year: Option<i32>,
    },
    OmdbImdbId(String),
    OmdbSearch {
        query: String,
        page: u32,
    },
    Recommendations {
        user_id: String,
        limit: usize,
    },
    SimilarMovies {
        movie_id: u64,
        limit: usize,
    },
}

impl CacheKey {
    /// How long entries under this key live
    pub fn ttl(&self, ttls: &CacheTtls) -> Duration {
        match self {
            CacheKey::MovieDetails(_)
            | CacheKey::TvDetails(_)
            | CacheKey::OmdbTitle { .. }
            | CacheKey::OmdbImdbId(_)
            | CacheKey::MoviesByGenre { .. } => ttls.details,
            CacheKey::Search { .. } | CacheKey::OmdbSearch { .. } => ttls.search,
            CacheKey::Trending { .. } => ttls.trending,
            CacheKey::Genres => ttls.genres,
            CacheKey::Recommendations { .. } | CacheKey::SimilarMovies { .. } => {
                ttls.recommendations
            }
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match self {
            CacheKey::MovieDetails(id) => build_key("tmdb_movie", &[id]),
            CacheKey::TvDetails(id) => build_key("tmdb_tv", &[id]),
            CacheKey::Search {
                query,
                media_type,
                include_adult,
            } => build_key(
                "tmdb_search",
                &[&query.to_lowercase(), media_type, include_adult],
            ),
            CacheKey::Trending {
                timeframe,
                page,
                media_type,
            } => build_key("tmdb_trending", &[timeframe, page, media_type]),
            CacheKey::Genres => build_key("tmdb_genres", &[]),
            CacheKey::MoviesByGenre {
                genre_id,
                page,
                sort_by,
            } => build_key("tmdb_genre", &[genre_id, page, sort_by]),
            CacheKey::OmdbTitle { title, year } => {
                let year = year.map(|y| y.to_string()).unwrap_or_default();
                build_key("omdb_title", &[title, &year])
            }
            CacheKey::OmdbImdbId(id) => build_key("omdb_imdb", &[id]),
            CacheKey::OmdbSearch { query, page } => build_key("omdb_search", &[query, page]),
            CacheKey::Recommendations { user_id, limit } => {
                build_key("recommendations", &[user_id, limit])
            }
            CacheKey::SimilarMovies { movie_id, limit } => {
                build_key("similar_movies", &[movie_id, limit])
            }
        };
        f.write_str(&key)
    }
}
