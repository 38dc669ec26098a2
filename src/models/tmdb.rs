//! Raw TMDB API payloads and their conversion into domain types

use serde::Deserialize;

use super::{Credits, Genre, MediaType, Movie, Ratings, TvShow};

/// Paged list envelope used by search, trending and discover
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TmdbPage<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl<T> Default for TmdbPage<T> {
    fn default() -> Self {
        Self {
            page: 1,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbGenreList {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbVideo {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbVideos {
    pub results: Vec<TmdbVideo>,
}

impl TmdbVideos {
    /// Key of the first YouTube trailer
    pub fn trailer_key(&self) -> Option<String> {
        self.results
            .iter()
            .find(|v| v.site == "YouTube" && v.kind == "Trailer")
            .map(|v| v.key.clone())
    }
}

/// Movie as returned by list endpoints and `/movie/{id}`
///
/// Detail responses carry `genres`, `runtime` and the appended `credits` and
/// `videos`; list responses carry only `genre_ids`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbMovie {
    pub id: u64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub adult: bool,
    pub genre_ids: Vec<u32>,
    pub genres: Vec<Genre>,
    pub credits: Option<Credits>,
    pub videos: Option<TmdbVideos>,
}

impl From<TmdbMovie> for Movie {
    fn from(raw: TmdbMovie) -> Self {
        let genre_ids = if raw.genre_ids.is_empty() {
            raw.genres.iter().map(|g| g.id).collect()
        } else {
            raw.genre_ids
        };

        let mut movie = Movie {
            id: raw.id,
            title: raw.title.unwrap_or_default(),
            original_title: raw.original_title.unwrap_or_default(),
            overview: raw.overview.unwrap_or_default(),
            poster_path: raw.poster_path.unwrap_or_default(),
            backdrop_path: raw.backdrop_path.unwrap_or_default(),
            release_date: raw.release_date.unwrap_or_default(),
            runtime: raw.runtime.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            tagline: raw.tagline.unwrap_or_default(),
            vote_average: raw.vote_average,
            vote_count: raw.vote_count,
            popularity: raw.popularity,
            adult: raw.adult,
            genre_ids,
            genres: raw.genres,
            credits: raw.credits.unwrap_or_default(),
            ratings: Ratings {
                tmdb: raw.vote_average,
                ..Default::default()
            },
            media_type: MediaType::Movie,
            trailer_key: raw.videos.and_then(|v| v.trailer_key()),
        };
        movie.normalize();
        movie
    }
}

/// TV show as returned by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbTv {
    pub id: u64,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub genre_ids: Vec<u32>,
}

impl From<TmdbTv> for Movie {
    fn from(raw: TmdbTv) -> Self {
        let mut movie = Movie {
            id: raw.id,
            title: raw.name.unwrap_or_default(),
            original_title: raw.original_name.unwrap_or_default(),
            overview: raw.overview.unwrap_or_default(),
            poster_path: raw.poster_path.unwrap_or_default(),
            backdrop_path: raw.backdrop_path.unwrap_or_default(),
            release_date: raw.first_air_date.unwrap_or_default(),
            vote_average: raw.vote_average,
            vote_count: raw.vote_count,
            popularity: raw.popularity,
            genre_ids: raw.genre_ids,
            ratings: Ratings {
                tmdb: raw.vote_average,
                ..Default::default()
            },
            media_type: MediaType::Tv,
            ..Default::default()
        };
        movie.normalize();
        movie
    }
}

/// `/tv/{id}` payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbTvDetails {
    pub id: u64,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub number_of_seasons: u32,
    pub number_of_episodes: u32,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub genres: Vec<Genre>,
}

impl From<TmdbTvDetails> for TvShow {
    fn from(raw: TmdbTvDetails) -> Self {
        TvShow {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            original_name: raw.original_name.unwrap_or_default(),
            overview: raw.overview.unwrap_or_default(),
            poster_path: raw.poster_path.unwrap_or_default(),
            backdrop_path: raw.backdrop_path.unwrap_or_default(),
            first_air_date: raw.first_air_date.unwrap_or_default(),
            last_air_date: raw.last_air_date.unwrap_or_default(),
            number_of_seasons: raw.number_of_seasons,
            number_of_episodes: raw.number_of_episodes,
            status: raw.status.unwrap_or_default(),
            tagline: raw.tagline.unwrap_or_default(),
            vote_average: raw.vote_average,
            vote_count: raw.vote_count,
            popularity: raw.popularity,
            genres: raw.genres,
            media_type: MediaType::Tv,
        }
    }
}
