//! TMDB catalog provider
//!
//! All calls go through the shared [`RateLimitedClient`] and read-through
//! cache. Endpoints used:
//! - `/movie/{id}?append_to_response=credits,videos`
//! - `/tv/{id}`
//! - `/search/movie`, `/search/tv`
//! - `/trending/{movie|tv}/{day|week}`
//! - `/discover/movie?with_genres=`
//! - `/genre/movie/list`
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{Cache, CacheKey, CacheTtls},
    cached,
    error::{AppError, AppResult},
    http::RateLimitedClient,
    models::{
        tmdb::{TmdbGenreList, TmdbMovie, TmdbPage, TmdbTv, TmdbTvDetails},
        Genre, MediaFilter, Movie, PagedMovies, Timeframe, TvShow,
    },
    services::providers::{CatalogProvider, SearchQuery},
};

#[derive(Clone)]
pub struct TmdbProvider {
    client: RateLimitedClient,
    api_key: String,
    base_url: String,
    cache: Cache,
    ttls: CacheTtls,
}

impl TmdbProvider {
    pub fn new(
        client: RateLimitedClient,
        api_key: String,
        base_url: String,
        cache: Cache,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            ttls,
        }
    }

    /// GETs `path` and decodes the JSON body
    ///
    /// 404 maps to `NotFound`; any other non-2xx status is an upstream error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut query = vec![
            ("api_key", self.api_key.clone()),
            ("language", "en-US".to_string()),
        ];
        query.extend_from_slice(params);

        let response = self.client.get(&url, &query, cancel).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e)))
    }

    async fn fetch_movie_details(&self, id: u64, cancel: &CancellationToken) -> AppResult<Movie> {
        let raw: TmdbMovie = self
            .get_json(
                &format!("/movie/{}", id),
                &[("append_to_response", "credits,videos".to_string())],
                cancel,
            )
            .await?;

        let movie = Movie::from(raw);
        tracing::info!(movie_id = id, title = %movie.title, provider = "tmdb", "Fetched movie details");
        Ok(movie)
    }

    async fn fetch_tv_details(&self, id: u64, cancel: &CancellationToken) -> AppResult<TvShow> {
        let raw: TmdbTvDetails = self.get_json(&format!("/tv/{}", id), &[], cancel).await?;

        tracing::info!(tv_id = id, provider = "tmdb", "Fetched TV details");
        Ok(TvShow::from(raw))
    }

    /// First upstream page of movie and/or TV matches, movies first
    async fn fetch_search_results(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Movie>> {
        let mut results = Vec::new();

        if query.media_type.includes_movies() {
            let page: TmdbPage<TmdbMovie> = self
                .get_json(
                    "/search/movie",
                    &[
                        ("query", query.query.clone()),
                        ("page", "1".to_string()),
                        ("include_adult", query.include_adult.to_string()),
                    ],
                    cancel,
                )
                .await?;
            results.extend(page.results.into_iter().map(Movie::from));
        }

        if query.media_type.includes_tv() {
            let page: TmdbPage<TmdbTv> = self
                .get_json(
                    "/search/tv",
                    &[
                        ("query", query.query.clone()),
                        ("page", "1".to_string()),
                        ("include_adult", query.include_adult.to_string()),
                    ],
                    cancel,
                )
                .await?;
            results.extend(page.results.into_iter().map(Movie::from));
        }

        tracing::info!(
            query = %query.query,
            media_type = %query.media_type,
            results = results.len(),
            provider = "tmdb",
            "Search completed"
        );
        Ok(results)
    }

    async fn fetch_trending(
        &self,
        timeframe: Timeframe,
        page: u32,
        media_type: MediaFilter,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies> {
        let mut merged = PagedMovies {
            page,
            ..Default::default()
        };
        let params = [("page", page.to_string())];

        if media_type.includes_movies() {
            let movies: TmdbPage<TmdbMovie> = self
                .get_json(&format!("/trending/movie/{}", timeframe), &params, cancel)
                .await?;
            merged.total_pages = merged.total_pages.max(movies.total_pages);
            merged.total_results += movies.total_results;
            merged
                .results
                .extend(movies.results.into_iter().map(Movie::from));
        }

        if media_type.includes_tv() {
            let shows: TmdbPage<TmdbTv> = self
                .get_json(&format!("/trending/tv/{}", timeframe), &params, cancel)
                .await?;
            merged.total_pages = merged.total_pages.max(shows.total_pages);
            merged.total_results += shows.total_results;
            merged
                .results
                .extend(shows.results.into_iter().map(Movie::from));
        }

        tracing::info!(
            timeframe = %timeframe,
            page,
            media_type = %media_type,
            results = merged.results.len(),
            provider = "tmdb",
            "Fetched trending"
        );
        Ok(merged)
    }

    async fn fetch_movies_by_genre(
        &self,
        genre_id: u32,
        page: u32,
        sort_by: &str,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies> {
        let raw: TmdbPage<TmdbMovie> = self
            .get_json(
                "/discover/movie",
                &[
                    ("with_genres", genre_id.to_string()),
                    ("page", page.to_string()),
                    ("sort_by", sort_by.to_string()),
                    ("include_adult", "false".to_string()),
                ],
                cancel,
            )
            .await?;

        Ok(PagedMovies {
            page: raw.page,
            results: raw.results.into_iter().map(Movie::from).collect(),
            total_pages: raw.total_pages,
            total_results: raw.total_results,
        })
    }

    async fn fetch_genres(&self, cancel: &CancellationToken) -> AppResult<Vec<Genre>> {
        let list: TmdbGenreList = self.get_json("/genre/movie/list", &[], cancel).await?;
        tracing::info!(count = list.genres.len(), provider = "tmdb", "Fetched genres");
        Ok(list.genres)
    }
}

#[async_trait]
impl CatalogProvider for TmdbProvider {
    async fn trending(
        &self,
        timeframe: Timeframe,
        page: u32,
        media_type: MediaFilter,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies> {
        let key = CacheKey::Trending {
            timeframe,
            page,
            media_type,
        };
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_trending(timeframe, page, media_type, cancel)
        )
    }

    async fn movie_details(&self, id: u64, cancel: &CancellationToken) -> AppResult<Movie> {
        let key = CacheKey::MovieDetails(id);
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_movie_details(id, cancel)
        )
    }

    async fn tv_details(&self, id: u64, cancel: &CancellationToken) -> AppResult<TvShow> {
        let key = CacheKey::TvDetails(id);
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_tv_details(id, cancel)
        )
    }

    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies> {
        let key = CacheKey::Search {
            query: query.query.clone(),
            media_type: query.media_type,
            include_adult: query.include_adult,
        };
        let all: AppResult<Vec<Movie>> = cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_search_results(query, cancel)
        );

        Ok(PagedMovies::paginate(&all?, query.page, query.per_page))
    }

    async fn movies_by_genre(
        &self,
        genre_id: u32,
        page: u32,
        sort_by: &str,
        cancel: &CancellationToken,
    ) -> AppResult<PagedMovies> {
        let key = CacheKey::MoviesByGenre {
            genre_id,
            page,
            sort_by: sort_by.to_string(),
        };
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_movies_by_genre(genre_id, page, sort_by, cancel)
        )
    }

    async fn genres(&self, cancel: &CancellationToken) -> AppResult<Vec<Genre>> {
        let key = CacheKey::Genres;
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_genres(cancel)
        )
    }
}
