use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    cache::{Cache, CacheKey, CacheTtls},
    cached,
    error::AppResult,
    models::{MediaFilter, Movie, Recommendation, Timeframe, WatchlistItem},
    services::{providers::CatalogProvider, similarity::rank_similar, watchlist::WatchlistService},
};

/// Used when a caller asks for zero or a negative number of results
pub const DEFAULT_LIMIT: usize = 10;

pub const REASON_GENRES: &str = "Similar genres to your favorites";
pub const REASON_RATING: &str = "Matches your rating preferences";
pub const REASON_PERIOD: &str = "From your preferred time period";
pub const REASON_DEFAULT: &str = "Based on your watchlist preferences";

/// Turns a caller-supplied limit into a result count
pub fn effective_limit(limit: i64) -> usize {
    if limit <= 0 {
        DEFAULT_LIMIT
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Weights of the content-based score
///
/// `score = genre * g + rating * r + year * y + min(popularity / 100, popularity_cap)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub genre: f64,
    pub rating: f64,
    pub year: f64,
    /// Upper bound of the popularity bonus
    pub popularity_cap: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            genre: 0.5,
            rating: 0.3,
            year: 0.2,
            popularity_cap: 0.1,
        }
    }
}

/// What a user's watchlist says about their taste
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceVector {
    /// Genre id -> share of items carrying it
    pub genres: HashMap<u32, f64>,
    /// Mean of ratings above 0
    pub avg_rating: Option<f64>,
    /// Release year -> share of items from that year
    pub years: HashMap<i32, f64>,
}

impl PreferenceVector {
    pub fn from_items(items: &[WatchlistItem]) -> Self {
        let mut prefs = Self::default();
        if items.is_empty() {
            return prefs;
        }

        let total = items.len() as f64;
        let mut genre_counts: HashMap<u32, usize> = HashMap::new();
        let mut year_counts: HashMap<i32, usize> = HashMap::new();
        let mut rating_sum = 0.0;
        let mut rated = 0usize;

        for item in items {
            for genre in &item.movie.genre_ids {
                *genre_counts.entry(*genre).or_default() += 1;
            }
            if let Some(year) = item.movie.release_year() {
                *year_counts.entry(year).or_default() += 1;
            }
            if item.rating > 0.0 {
                rating_sum += item.rating;
                rated += 1;
            }
        }

        prefs.genres = genre_counts
            .into_iter()
            .map(|(genre, count)| (genre, count as f64 / total))
            .collect();
        prefs.years = year_counts
            .into_iter()
            .map(|(year, count)| (year, count as f64 / total))
            .collect();
        if rated > 0 {
            prefs.avg_rating = Some(rating_sum / rated as f64);
        }
        prefs
    }

    fn genre_match(&self, candidate: &Movie) -> f64 {
        if candidate.genre_ids.is_empty() {
            return 0.0;
        }
        let sum: f64 = candidate
            .genre_ids
            .iter()
            .filter_map(|genre| self.genres.get(genre))
            .sum();
        sum / candidate.genre_ids.len() as f64
    }

    fn rating_match(&self, candidate: &Movie) -> f64 {
        match self.avg_rating {
            Some(avg) if candidate.vote_average > 0.0 => {
                1.0 - (candidate.vote_average - avg).abs() / 10.0
            }
            _ => 0.0,
        }
    }

    fn year_match(&self, candidate: &Movie) -> f64 {
        candidate
            .release_year()
            .and_then(|year| self.years.get(&year).copied())
            .unwrap_or(0.0)
    }
}

/// Scores one candidate against the preferences
pub fn score_candidate(
    candidate: &Movie,
    prefs: &PreferenceVector,
    weights: &ScoringWeights,
) -> Recommendation {
    let genre_match = prefs.genre_match(candidate);
    let rating_match = prefs.rating_match(candidate);
    let year_match = prefs.year_match(candidate);

    let mut score =
        genre_match * weights.genre + rating_match * weights.rating + year_match * weights.year;
    if candidate.popularity > 0.0 {
        score += (candidate.popularity / 100.0).min(weights.popularity_cap);
    }

    let reason = if genre_match > 0.5 {
        REASON_GENRES
    } else if rating_match > 0.7 {
        REASON_RATING
    } else if year_match > 0.3 {
        REASON_PERIOD
    } else {
        REASON_DEFAULT
    };

    Recommendation {
        movie: candidate.clone(),
        score,
        reason: reason.to_string(),
        genre_match,
        rating_match,
    }
}

/// Scores every candidate, best first, truncated to `limit`
///
/// Equal scores keep their candidate order.
pub fn score_candidates(
    candidates: &[Movie],
    prefs: &PreferenceVector,
    weights: &ScoringWeights,
    limit: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = candidates
        .iter()
        .map(|candidate| score_candidate(candidate, prefs, weights))
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

/// Content-based recommendations over the weekly trending pool
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogProvider>,
    watchlists: Arc<WatchlistService>,
    cache: Cache,
    weights: ScoringWeights,
    ttls: CacheTtls,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        watchlists: Arc<WatchlistService>,
        cache: Cache,
        weights: ScoringWeights,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            catalog,
            watchlists,
            cache,
            weights,
            ttls,
        }
    }

    async fn candidate_pool(&self, cancel: &CancellationToken) -> AppResult<Vec<Movie>> {
        let trending = self
            .catalog
            .trending(Timeframe::Week, 1, MediaFilter::All, cancel)
            .await?;
        Ok(trending.results)
    }

    /// Ranked recommendations for `user_id`
    ///
    /// An empty watchlist yields an empty list and is not cached. A user with
    /// no watchlist is `NotFound`.
    pub async fn recommendations(
        &self,
        user_id: &str,
        limit: i64,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Recommendation>> {
        let limit = effective_limit(limit);
        let key = CacheKey::Recommendations {
            user_id: user_id.to_string(),
            limit,
        };
        let cache_key = key.to_string();

        if let Some(cached) = self.cache.get::<Vec<Recommendation>>(&cache_key) {
            tracing::debug!(user_id = %user_id, limit, "Recommendations served from cache");
            return Ok(cached);
        }

        let items = self.watchlists.items(user_id).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let prefs = PreferenceVector::from_items(&items);
        let pool = self.candidate_pool(cancel).await?;
        let recommendations = score_candidates(&pool, &prefs, &self.weights, limit);

        tracing::info!(
            user_id = %user_id,
            watchlist_items = items.len(),
            candidates = pool.len(),
            returned = recommendations.len(),
            "Generated recommendations"
        );

        self.cache
            .set(&cache_key, &recommendations, key.ttl(&self.ttls));
        Ok(recommendations)
    }

    async fn compute_similar(
        &self,
        movie_id: u64,
        limit: usize,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Movie>> {
        let source = self.catalog.movie_details(movie_id, cancel).await?;
        let pool = self.candidate_pool(cancel).await?;
        let similar = rank_similar(&source, &pool, limit);

        tracing::info!(
            movie_id,
            candidates = pool.len(),
            returned = similar.len(),
            "Found similar movies"
        );
        Ok(similar)
    }

    /// Trending entries sharing the most genres with `movie_id`
    pub async fn similar(
        &self,
        movie_id: u64,
        limit: i64,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Movie>> {
        let limit = effective_limit(limit);
        let key = CacheKey::SimilarMovies { movie_id, limit };
        cached!(
            self.cache,
            key,
            key.ttl(&self.ttls),
            self.compute_similar(movie_id, limit, cancel)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{
        AddItemRequest, CreateWatchlistRequest, PagedMovies, WatchStatus,
    };
    use crate::services::providers::MockCatalogProvider;
    use chrono::Utc;

    fn movie(id: u64, genres: &[u32], vote_average: f64, popularity: f64) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            genre_ids: genres.to_vec(),
            vote_average,
            popularity,
            ..Default::default()
        }
    }

    fn item(id: u64, movie: Movie, rating: f64) -> WatchlistItem {
        WatchlistItem {
            id,
            watchlist_id: 1,
            movie_id: movie.id,
            movie,
            status: WatchStatus::Completed,
            rating,
            notes: String::new(),
            added_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn page(results: Vec<Movie>) -> PagedMovies {
        PagedMovies {
            page: 1,
            total_pages: 1,
            total_results: results.len() as u32,
            results,
        }
    }

    /// Catalog whose details lookups return Action titles and whose trending
    /// pool is fixed
    fn catalog_with_pool(pool: Vec<Movie>, trending_calls: usize) -> MockCatalogProvider {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .returning(|id, _| Ok(movie(id, &[28], 7.0, 10.0)));
        catalog
            .expect_trending()
            .withf(|timeframe, page, media_type, _| {
                *timeframe == Timeframe::Week && *page == 1 && *media_type == MediaFilter::All
            })
            .times(trending_calls)
            .returning(move |_, _, _, _| Ok(page(pool.clone())));
        catalog
    }

    async fn engine_for(catalog: MockCatalogProvider) -> (RecommendationEngine, Arc<WatchlistService>) {
        let catalog: Arc<dyn CatalogProvider> = Arc::new(catalog);
        let watchlists = Arc::new(WatchlistService::new(catalog.clone()));
        let engine = RecommendationEngine::new(
            catalog,
            watchlists.clone(),
            Cache::new(),
            ScoringWeights::default(),
            CacheTtls::default(),
        );
        (engine, watchlists)
    }

    async fn seed_action_watchlist(watchlists: &WatchlistService) {
        watchlists
            .create(
                "u1",
                CreateWatchlistRequest {
                    name: "Mine".into(),
                    description: String::new(),
                    is_public: false,
                },
            )
            .await
            .unwrap();
        for (movie_id, rating) in [(100, 8.0), (101, 9.0)] {
            watchlists
                .add_item(
                    "u1",
                    AddItemRequest {
                        movie_id,
                        status: WatchStatus::Completed,
                        rating,
                        notes: String::new(),
                    },
                    &CancellationToken::new(),
                )
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(0), DEFAULT_LIMIT);
        assert_eq!(effective_limit(-5), DEFAULT_LIMIT);
        assert_eq!(effective_limit(3), 3);
    }

    #[test]
    fn test_preference_vector() {
        let mut dated = movie(2, &[28, 12], 0.0, 0.0);
        dated.release_date = "1999-03-30".into();
        let items = vec![
            item(1, movie(1, &[28], 0.0, 0.0), 8.0),
            item(2, dated, 0.0),
        ];

        let prefs = PreferenceVector::from_items(&items);

        assert_eq!(prefs.genres.get(&28), Some(&1.0));
        assert_eq!(prefs.genres.get(&12), Some(&0.5));
        assert_eq!(prefs.avg_rating, Some(8.0));
        assert_eq!(prefs.years.get(&1999), Some(&0.5));
    }

    #[test]
    fn test_no_ratings_means_no_rating_match() {
        let items = vec![item(1, movie(1, &[28], 0.0, 0.0), 0.0)];
        let prefs = PreferenceVector::from_items(&items);

        assert_eq!(prefs.avg_rating, None);
        let rec = score_candidate(&movie(9, &[35], 9.0, 0.0), &prefs, &ScoringWeights::default());
        assert_eq!(rec.rating_match, 0.0);
        assert_eq!(rec.score, 0.0);
        assert_eq!(rec.reason, REASON_DEFAULT);
    }

    #[test]
    fn test_period_reason() {
        let mut liked = movie(1, &[18], 0.0, 0.0);
        liked.release_date = "1994-09-23".into();
        let prefs = PreferenceVector::from_items(&[item(1, liked, 0.0)]);

        let mut candidate = movie(2, &[35], 0.0, 0.0);
        candidate.release_date = "1994-07-06".into();
        let rec = score_candidate(&candidate, &prefs, &ScoringWeights::default());

        assert_eq!(rec.reason, REASON_PERIOD);
        assert!((rec.score - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let prefs = PreferenceVector::from_items(&[item(1, movie(1, &[28], 0.0, 0.0), 0.0)]);
        let candidates = vec![
            movie(10, &[28], 0.0, 0.0),
            movie(11, &[28], 0.0, 0.0),
            movie(12, &[28], 0.0, 0.0),
        ];

        let ids: Vec<u64> = score_candidates(&candidates, &prefs, &ScoringWeights::default(), 10)
            .iter()
            .map(|r| r.movie.id)
            .collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn test_action_fan_prefers_action_candidate() {
        let pool = vec![movie(2, &[35], 8.5, 90.0), movie(1, &[28], 8.5, 50.0)];
        let (engine, watchlists) = engine_for(catalog_with_pool(pool, 1)).await;
        seed_action_watchlist(&watchlists).await;

        let recs = engine
            .recommendations("u1", 10, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].movie.id, 1);
        assert_eq!(recs[0].genre_match, 1.0);
        assert_eq!(recs[0].reason, REASON_GENRES);
        assert!((recs[0].score - 0.9).abs() < 1e-12);

        assert_eq!(recs[1].movie.id, 2);
        assert_eq!(recs[1].genre_match, 0.0);
        assert_eq!(recs[1].reason, REASON_RATING);
        assert!((recs[1].score - 0.4).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_limit_truncates_to_best() {
        let pool: Vec<Movie> = (1..=20)
            .map(|id| movie(id, &[28], id as f64 / 2.5, 0.0))
            .collect();
        let (engine, watchlists) = engine_for(catalog_with_pool(pool, 1)).await;
        seed_action_watchlist(&watchlists).await;

        let recs = engine
            .recommendations("u1", 3, &CancellationToken::new())
            .await
            .unwrap();

        // Average rating is 8.5; the highest vote averages (8.0, 7.6, 7.2) sit closest
        let ids: Vec<u64> = recs.iter().map(|r| r.movie.id).collect();
        assert_eq!(ids, vec![20, 19, 18]);
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let pool = vec![movie(1, &[28], 8.0, 30.0), movie(2, &[28, 35], 6.0, 80.0)];
        let (engine, watchlists) = engine_for(catalog_with_pool(pool, 1)).await;
        seed_action_watchlist(&watchlists).await;
        let cancel = CancellationToken::new();

        let first = engine.recommendations("u1", 10, &cancel).await.unwrap();
        let second = engine.recommendations("u1", 10, &cancel).await.unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_watchlist_returns_nothing() {
        let (engine, watchlists) = engine_for(catalog_with_pool(Vec::new(), 0)).await;
        watchlists
            .create(
                "u1",
                CreateWatchlistRequest {
                    name: "Empty".into(),
                    description: String::new(),
                    is_public: false,
                },
            )
            .await
            .unwrap();

        let recs = engine
            .recommendations("u1", 10, &CancellationToken::new())
            .await
            .unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (engine, _) = engine_for(catalog_with_pool(Vec::new(), 0)).await;

        let result = engine
            .recommendations("nobody", 10, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_trending_failure_propagates() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .returning(|id, _| Ok(movie(id, &[28], 7.0, 10.0)));
        catalog
            .expect_trending()
            .returning(|_, _, _, _| Err(AppError::ExternalApi("TMDB returned status 500".into())));
        let (engine, watchlists) = engine_for(catalog).await;
        seed_action_watchlist(&watchlists).await;

        let result = engine
            .recommendations("u1", 10, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_similar_uses_genre_overlap() {
        let pool = vec![
            movie(603, &[28, 878], 8.0, 50.0),
            movie(1, &[35], 7.0, 50.0),
            movie(2, &[28], 7.0, 50.0),
            movie(3, &[28, 878], 7.0, 50.0),
        ];
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .times(1)
            .returning(|id, _| Ok(movie(id, &[28, 878], 8.0, 50.0)));
        catalog
            .expect_trending()
            .times(1)
            .returning(move |_, _, _, _| Ok(page(pool.clone())));
        let (engine, _) = engine_for(catalog).await;
        let cancel = CancellationToken::new();

        let similar = engine.similar(603, 10, &cancel).await.unwrap();
        let ids: Vec<u64> = similar.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2]);

        // Memoized: the mock would panic on a second upstream call
        let again = engine.similar(603, 10, &cancel).await.unwrap();
        assert_eq!(again, similar);
    }
}
