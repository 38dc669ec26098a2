use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod omdb;
pub mod response;
pub mod tmdb;
pub mod watchlist;

pub use response::{ApiResponse, Meta};
pub use watchlist::{
    AddItemRequest, CreateWatchlistRequest, Recommendation, UpdateItemRequest, WatchStatus,
    Watchlist, WatchlistItem, WatchlistStats,
};

/// Kind of a catalog entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Tv => write!(f, "tv"),
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("unsupported media type '{}'", other)),
        }
    }
}

/// Which media types a search or trending query should cover
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaFilter {
    Movie,
    Tv,
    #[default]
    All,
}

impl MediaFilter {
    pub fn includes_movies(self) -> bool {
        matches!(self, MediaFilter::Movie | MediaFilter::All)
    }

    pub fn includes_tv(self) -> bool {
        matches!(self, MediaFilter::Tv | MediaFilter::All)
    }
}

impl Display for MediaFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaFilter::Movie => write!(f, "movie"),
            MediaFilter::Tv => write!(f, "tv"),
            MediaFilter::All => write!(f, "all"),
        }
    }
}

impl FromStr for MediaFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaFilter::Movie),
            "tv" => Ok(MediaFilter::Tv),
            "all" => Ok(MediaFilter::All),
            other => Err(format!(
                "invalid type '{}', use 'movie', 'tv' or 'all'",
                other
            )),
        }
    }
}

/// Trending window
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Day,
    Week,
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::Day => write!(f, "day"),
            Timeframe::Week => write!(f, "week"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            other => Err(format!(
                "invalid timeframe '{}', use 'day' or 'week'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: String,
    pub profile_path: Option<String>,
    pub order: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    pub job: String,
    pub department: String,
    pub profile_path: Option<String>,
}

/// Ratings from every source; 0 means unknown
///
/// TMDB, OMDB and IMDB are on a 10-point scale, Rotten Tomatoes and
/// Metacritic on a 100-point scale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Ratings {
    pub tmdb: f64,
    pub omdb: f64,
    pub rotten_tomatoes: f64,
    pub imdb: f64,
    pub metacritic: f64,
}

impl Ratings {
    /// Zeroes any rating outside its scale
    pub fn clamp_to_scales(&mut self) {
        for (value, max) in [
            (&mut self.tmdb, 10.0),
            (&mut self.omdb, 10.0),
            (&mut self.imdb, 10.0),
            (&mut self.rotten_tomatoes, 100.0),
            (&mut self.metacritic, 100.0),
        ] {
            if !(0.0..=max).contains(&*value) {
                *value = 0.0;
            }
        }
    }
}

pub const NO_OVERVIEW: &str = "No overview available";

/// A movie or TV show as returned to clients and scored by the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub poster_path: String,
    pub backdrop_path: String,
    /// `YYYY-MM-DD`, `YYYY` or `Unknown`
    pub release_date: String,
    /// Minutes
    pub runtime: u32,
    pub status: String,
    pub tagline: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub adult: bool,
    pub genre_ids: Vec<u32>,
    pub genres: Vec<Genre>,
    pub credits: Credits,
    pub ratings: Ratings,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer_key: Option<String>,
}

impl Movie {
    /// Fills missing text with placeholders and clamps out-of-range numbers
    pub fn normalize(&mut self) {
        fn placeholder(field: &mut String, value: &str) {
            if field.trim().is_empty() {
                *field = value.to_string();
            }
        }

        placeholder(&mut self.title, "Unknown Title");
        placeholder(&mut self.overview, NO_OVERVIEW);
        placeholder(&mut self.poster_path, "/placeholder-poster.jpg");
        placeholder(&mut self.backdrop_path, "/placeholder-backdrop.jpg");
        placeholder(&mut self.release_date, "Unknown");
        placeholder(&mut self.status, "Unknown");
        placeholder(&mut self.tagline, "No tagline available");

        if !(0.0..=10.0).contains(&self.vote_average) {
            self.vote_average = 0.0;
        }
        if !self.popularity.is_finite() || self.popularity < 0.0 {
            self.popularity = 0.0;
        }
        self.ratings.clamp_to_scales();
    }

    /// Year taken from the leading `YYYY` of the release date
    pub fn release_year(&self) -> Option<i32> {
        parse_year(&self.release_date)
    }

    pub fn has_overview(&self) -> bool {
        !self.overview.is_empty() && self.overview != NO_OVERVIEW
    }
}

/// Parses the year out of `YYYY-MM-DD` or `YYYY`; anything else is `None`
pub fn parse_year(date: &str) -> Option<i32> {
    date.split('-')
        .next()
        .and_then(|year| year.trim().parse::<i32>().ok())
        .filter(|year| *year > 0)
}

/// TV show details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TvShow {
    pub id: u64,
    pub name: String,
    pub original_name: String,
    pub overview: String,
    pub poster_path: String,
    pub backdrop_path: String,
    pub first_air_date: String,
    pub last_air_date: String,
    pub number_of_seasons: u32,
    pub number_of_episodes: u32,
    pub status: String,
    pub tagline: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub genres: Vec<Genre>,
    pub media_type: MediaType,
}

/// One page of catalog results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PagedMovies {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl PagedMovies {
    /// Slices `all` into the 1-based `page` of size `per_page`
    ///
    /// A page past the end is empty but keeps the real totals.
    pub fn paginate(all: &[Movie], page: u32, per_page: u32) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total = all.len();

        let start = ((page - 1) as usize)
            .saturating_mul(per_page as usize)
            .min(total);
        let end = start.saturating_add(per_page as usize).min(total);

        Self {
            page,
            results: all[start..end].to_vec(),
            total_pages: total.div_ceil(per_page as usize) as u32,
            total_results: total as u32,
        }
    }

    pub fn meta(&self, per_page: u32) -> Meta {
        Meta::new(self.page, per_page, self.total_pages, self.total_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("1999-03-31"), Some(1999));
        assert_eq!(parse_year("2010"), Some(2010));
        assert_eq!(parse_year("Unknown"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("0000-01-01"), None);
    }

    #[test]
    fn test_normalize_fills_placeholders() {
        let mut m = Movie {
            id: 1,
            vote_average: 11.0,
            popularity: -3.0,
            ..Default::default()
        };
        m.normalize();

        assert_eq!(m.title, "Unknown Title");
        assert_eq!(m.overview, NO_OVERVIEW);
        assert_eq!(m.release_date, "Unknown");
        assert_eq!(m.vote_average, 0.0);
        assert_eq!(m.popularity, 0.0);
        assert!(!m.has_overview());
        assert_eq!(m.release_year(), None);
    }

    #[test]
    fn test_paginate() {
        let all: Vec<Movie> = (1..=25).map(movie).collect();

        let first = PagedMovies::paginate(&all, 1, 10);
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_results, 25);

        let last = PagedMovies::paginate(&all, 3, 10);
        assert_eq!(last.results.len(), 5);
        assert_eq!(last.results[0].id, 21);

        let past_end = PagedMovies::paginate(&all, 9, 10);
        assert!(past_end.results.is_empty());
        assert_eq!(past_end.total_results, 25);
    }

    #[test]
    fn test_media_filter_parse() {
        assert_eq!("tv".parse::<MediaFilter>(), Ok(MediaFilter::Tv));
        assert!("anime".parse::<MediaFilter>().is_err());
        assert!(MediaFilter::All.includes_movies() && MediaFilter::All.includes_tv());
        assert!(!MediaFilter::Movie.includes_tv());
    }

    #[test]
    fn test_ratings_clamp() {
        let mut r = Ratings {
            tmdb: 12.0,
            rotten_tomatoes: 95.0,
            metacritic: 130.0,
            ..Default::default()
        };
        r.clamp_to_scales();

        assert_eq!(r.tmdb, 0.0);
        assert_eq!(r.rotten_tomatoes, 95.0);
        assert_eq!(r.metacritic, 0.0);
    }
}
