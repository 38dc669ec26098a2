//! Upstream data providers
//!
//! The catalog provider (TMDB) supplies movies, TV shows, genres and trending
//! lists. The ratings provider (OMDB) adds IMDB, Rotten Tomatoes and
//! Metacritic scores on top of catalog entries. Both sit behind traits so the
//! engine and the REST layer can be exercised against fakes.
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    http::HttpError,
    models::{omdb::OmdbTitle, Genre, MediaFilter, Movie, PagedMovies, Timeframe, TvShow},
};

pub mod omdb;
pub mod tmdb;

pub use omdb::{merge_ratings_record, OmdbProvider};
pub use tmdb::TmdbProvider;

/// Parameters of a catalog search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    pub media_type: MediaFilter,
    pub include_adult: bool,
}

/// Primary catalog of movies and TV shows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Trending entries for one upstream page; movies and TV are merged when
    /// `media_type` is `All`
    async fn trending(
        &self,
        timeframe: Timeframe,
        page: u32,
        media_type: MediaFilter,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies>;

    /// Full movie details including credits and trailer
    async fn movie_details(&self, id: u64, cancel: &CancellationToken) -> AppResult<Movie>;

    async fn tv_details(&self, id: u64, cancel: &CancellationToken) -> AppResult<TvShow>;

    /// Searches movies and/or TV and pages through the combined results
    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies>;

    /// Discover endpoint filtered to one genre
    async fn movies_by_genre(
        &self,
        genre_id: u32,
        page: u32,
        sort_by: &str,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies>;

    async fn genres(&self, cancel: &CancellationToken) -> AppResult<Vec<Genre>>;
}

/// Secondary source of critic and audience ratings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingsProvider: Send + Sync {
    /// Looks a title up by name and optional release year
    async fn by_title(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> AppResult<OmdbTitle>;

    async fn by_imdb_id(&self, imdb_id: &str, cancel: &CancellationToken)
        -> AppResult<OmdbTitle>;

    /// Free-text search; no matches is an empty list
    async fn search(
        &self,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<OmdbTitle>>;

    /// Merges ratings, plot and runtime from the ratings source into `movie`
    ///
    /// Falls back to the original title when the display title is unknown
    /// upstream.
    async fn enrich(&self, movie: Movie, cancel: &CancellationToken) -> AppResult<Movie> {
        let mut movie = movie;
        let year = movie.release_year();

        let record = match self.by_title(&movie.title, year, cancel).await {
            Ok(record) => record,
            Err(e)
                if !matches!(e, AppError::Http(HttpError::Cancelled))
                    && !movie.original_title.is_empty()
                    && movie.original_title != movie.title =>
            {
                tracing::debug!(
                    error = %e,
                    title = %movie.title,
                    original_title = %movie.original_title,
                    "Ratings lookup failed, retrying with original title"
                );
                self.by_title(&movie.original_title, year, cancel).await?
            }
            Err(e) => return Err(e),
        };

        merge_ratings_record(&mut movie, &record);
        Ok(movie)
    }
}
