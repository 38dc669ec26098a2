//! OMDB ratings provider
//!
//! OMDB answers every lookup with HTTP 200 and reports failures in the body
//! as `"Response": "False"` plus an `"Error"` message.
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{Cache, CacheKey, CacheTtls},
    cached,
    error::{AppError, AppResult},
    http::RateLimitedClient,
    models::{
        omdb::{OmdbSearch, OmdbTitle},
        Movie,
    },
    services::providers::RatingsProvider,
};

#[derive(Clone)]
pub struct OmdbProvider {
    client: RateLimitedClient,
    api_key: String,
    base_url: String,
    cache: Cache,
    ttls: CacheTtls,
}

/// Copies ratings, plot and runtime from an OMDB record onto a catalog entry
///
/// Existing TMDB data wins except where OMDB has a positive rating, or the
/// entry has no overview or runtime of its own.
pub fn merge_ratings_record(movie: &mut Movie, record: &OmdbTitle) {
    let ratings = record.ratings();

    if ratings.imdb > 0.0 {
        movie.ratings.imdb = ratings.imdb;
    }
    if ratings.rotten_tomatoes > 0.0 {
        movie.ratings.rotten_tomatoes = ratings.rotten_tomatoes;
    }
    if ratings.metacritic > 0.0 {
        movie.ratings.metacritic = ratings.metacritic;
    }
    if ratings.omdb > 0.0 {
        movie.ratings.omdb = ratings.omdb;
    }

    if !movie.has_overview() {
        if let Some(plot) = record.plot() {
            movie.overview = plot.to_string();
        }
    }
    if movie.runtime == 0 {
        if let Some(runtime) = record.runtime_minutes() {
            movie.runtime = runtime;
        }
    }

    movie.normalize();
}

impl OmdbProvider {
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
            base_url,
            cache,
            ttls,
        }
    }

    async fn get_response(
        &self,
        params: Vec<(&str, String)>,
        cancel: &CancellationToken,
    ) -> AppResult<reqwest::Response> {
        let mut query = vec![("apikey", self.api_key.clone())];
        query.extend(params);

        let response = self.client.get(&self.base_url, &query, cancel).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDB returned status {}: {}",
                status, body
            )));
        }
        Ok(response)
    }

    async fn fetch_title(
        &self,
        params: Vec<(&str, String)>,
        lookup: &str,
        cancel: &CancellationToken,
    ) -> AppResult<OmdbTitle> {
        let record: OmdbTitle = self
            .get_response(params, cancel)
            .await?
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDB response: {}", e)))?;

        if record.is_failure() {
            let message = record.error.unwrap_or_default();
            if message.to_lowercase().contains("not found") {
                return Err(AppError::NotFound(format!("OMDB has no match for {}", lookup)));
            }
            return Err(AppError::ExternalApi(format!("OMDB API error: {}", message)));
        }

        tracing::info!(lookup = %lookup, imdb_id = %record.imdb_id, provider = "omdb", "Fetched ratings record");
        Ok(record)
    }

    async fn fetch_by_title(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> AppResult<OmdbTitle> {
        let mut params = vec![("t", title.to_string()), ("plot", "full".to_string())];
        if let Some(year) = year {
            params.push(("y", year.to_string()));
        }
        self.fetch_title(params, title, cancel).await
    }

    async fn fetch_by_imdb_id(
        &self,
        imdb_id: &str,
        cancel: &CancellationToken,
    ) -> AppResult<OmdbTitle> {
        let params = vec![("i", imdb_id.to_string()), ("plot", "full".to_string())];
        self.fetch_title(params, imdb_id, cancel).await
    }

    async fn fetch_search(
        &self,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<OmdbTitle>> {
        let params = vec![
            ("s", query.to_string()),
            ("type", "movie".to_string()),
            ("page", page.to_string()),
        ];
        let search: OmdbSearch = self
            .get_response(params, cancel)
            .await?
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDB response: {}", e)))?;

        if search.response.eq_ignore_ascii_case("false") {
            let message = search.error.unwrap_or_default();
            if message.to_lowercase().contains("not found") {
                return Ok(Vec::new());
            }
            return Err(AppError::ExternalApi(format!("OMDB API error: {}", message)));
        }

        tracing::info!(query = %query, results = search.search.len(), provider = "omdb", "Search completed");
        Ok(search.search)
    }
}

#[async_trait]
impl RatingsProvider for OmdbProvider {
    async fn by_title(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> AppResult<OmdbTitle> {
        let key = CacheKey::OmdbTitle {
            title: title.to_string(),
            year,
        };
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_by_title(title, year, cancel)
        )
    }

    async fn by_imdb_id(
        &self,
        imdb_id: &str,
        cancel: &CancellationToken,
    ) -> AppResult<OmdbTitle> {
        let key = CacheKey::OmdbImdbId(imdb_id.to_string());
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_by_imdb_id(imdb_id, cancel)
        )
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<OmdbTitle>> {
        let key = CacheKey::OmdbSearch {
            query: query.to_string(),
            page,
        };
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.fetch_search(query, page, cancel)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{spawn_test_upstream, RetryPolicy};
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    async fn provider(router: Router) -> OmdbProvider {
        let base = spawn_test_upstream(router).await;
        let client = RateLimitedClient::new(
            Duration::from_secs(5),
            100,
            RetryPolicy {
                max_retries: 1,
                initial_backoff: Duration::from_millis(5),
            },
        )
        .unwrap();
        OmdbProvider::new(
            client,
            "test-key".into(),
            format!("{}/", base),
            Cache::new(),
            CacheTtls::default(),
        )
    }

    /// Knows one film, under its original title only
    async fn omdb_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        match params.get("t").map(String::as_str) {
            Some("Le Fabuleux Destin d'Amélie Poulain") => Json(json!({
                "Title": "Amélie",
                "Year": "2001",
                "Runtime": "122 min",
                "Plot": "A shy waitress decides to change the lives of those around her.",
                "imdbRating": "8.3",
                "Metascore": "69",
                "Ratings": [{"Source": "Rotten Tomatoes", "Value": "89%"}],
                "imdbID": "tt0211915",
                "Response": "True"
            })),
            Some(_) => Json(json!({"Response": "False", "Error": "Movie not found!"})),
            None => Json(json!({"Response": "False", "Error": "Invalid API key!"})),
        }
    }

    fn amelie() -> Movie {
        let mut movie = Movie {
            id: 194,
            title: "Amélie".into(),
            original_title: "Le Fabuleux Destin d'Amélie Poulain".into(),
            release_date: "2001-04-25".into(),
            vote_average: 7.9,
            ..Default::default()
        };
        movie.ratings.tmdb = 7.9;
        movie.normalize();
        movie
    }

    #[tokio::test]
    async fn test_enrich_falls_back_to_original_title() {
        let omdb = provider(Router::new().route("/", get(omdb_handler))).await;

        let movie = omdb
            .enrich(amelie(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(movie.ratings.imdb, 8.3);
        assert_eq!(movie.ratings.rotten_tomatoes, 89.0);
        assert_eq!(movie.ratings.tmdb, 7.9);
        assert_eq!(movie.runtime, 122);
        assert!(movie.overview.starts_with("A shy waitress"));
    }

    #[tokio::test]
    async fn test_unknown_title_is_not_found() {
        let omdb = provider(Router::new().route("/", get(omdb_handler))).await;

        let result = omdb
            .by_title("Nothing Like This", None, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_api_error_is_external() {
        let omdb = provider(Router::new().route("/", get(omdb_handler))).await;

        let result = omdb
            .by_imdb_id("tt0211915", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let router = Router::new().route(
            "/",
            get(|| async { Json(json!({"Response": "False", "Error": "Movie not found!"})) }),
        );
        let omdb = provider(router).await;

        let results = omdb
            .search("zzzz", 1, &CancellationToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_merge_keeps_existing_overview_and_runtime() {
        let mut movie = Movie {
            overview: "Original overview".into(),
            runtime: 100,
            ..Default::default()
        };
        let record = OmdbTitle {
            plot: "Other plot".into(),
            runtime: "130 min".into(),
            imdb_rating: "N/A".into(),
            ..Default::default()
        };

        merge_ratings_record(&mut movie, &record);

        assert_eq!(movie.overview, "Original overview");
        assert_eq!(movie.runtime, 100);
        assert_eq!(movie.ratings.imdb, 0.0);
    }
}
