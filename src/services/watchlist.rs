use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    http::HttpError,
    models::{
        AddItemRequest, CreateWatchlistRequest, Movie, UpdateItemRequest, WatchStatus, Watchlist,
        WatchlistItem, WatchlistStats,
    },
    services::providers::CatalogProvider,
};

/// In-memory watchlists, one per user
pub struct WatchlistService {
    catalog: Arc<dyn CatalogProvider>,
    watchlists: RwLock<HashMap<String, Watchlist>>,
    next_id: AtomicU64,
}

fn not_found(user_id: &str) -> AppError {
    AppError::NotFound(format!("watchlist for user {}", user_id))
}

impl WatchlistService {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self {
            catalog,
            watchlists: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateWatchlistRequest,
    ) -> AppResult<Watchlist> {
        request.validate()?;

        let mut watchlists = self.watchlists.write().await;
        if watchlists.contains_key(user_id) {
            return Err(AppError::Conflict(format!(
                "user {} already has a watchlist",
                user_id
            )));
        }

        let now = Utc::now();
        let watchlist = Watchlist {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            user_id: user_id.to_string(),
            name: request.name.trim().to_string(),
            description: request.description,
            is_public: request.is_public,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        watchlists.insert(user_id.to_string(), watchlist.clone());

        tracing::info!(user_id = %user_id, watchlist_id = watchlist.id, "Created watchlist");
        Ok(watchlist)
    }

    pub async fn get(&self, user_id: &str) -> AppResult<Watchlist> {
        self.watchlists
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| not_found(user_id))
    }

    /// Snapshot of the user's items
    pub async fn items(&self, user_id: &str) -> AppResult<Vec<WatchlistItem>> {
        self.watchlists
            .read()
            .await
            .get(user_id)
            .map(|w| w.items.clone())
            .ok_or_else(|| not_found(user_id))
    }

    fn ensure_not_listed(watchlist: &Watchlist, movie_id: u64) -> AppResult<()> {
        if watchlist.items.iter().any(|item| item.movie_id == movie_id) {
            return Err(AppError::Conflict(format!(
                "movie {} is already in the watchlist",
                movie_id
            )));
        }
        Ok(())
    }

    /// Adds a movie, capturing its catalog details
    ///
    /// A failed details lookup is logged and the item is stored with
    /// placeholder details. Cancellation still aborts the add.
    pub async fn add_item(
        &self,
        user_id: &str,
        request: AddItemRequest,
        cancel: &CancellationToken,
    ) -> AppResult<WatchlistItem> {
        request.validate()?;

        {
            let watchlists = self.watchlists.read().await;
            let watchlist = watchlists.get(user_id).ok_or_else(|| not_found(user_id))?;
            Self::ensure_not_listed(watchlist, request.movie_id)?;
        }

        // Fetched without holding the lock
        let movie = match self.catalog.movie_details(request.movie_id, cancel).await {
            Ok(movie) => movie,
            Err(AppError::Http(HttpError::Cancelled)) => {
                return Err(AppError::Http(HttpError::Cancelled))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    movie_id = request.movie_id,
                    "Could not fetch movie details for watchlist item"
                );
                let mut placeholder = Movie {
                    id: request.movie_id,
                    ..Default::default()
                };
                placeholder.normalize();
                placeholder
            }
        };

        let mut watchlists = self.watchlists.write().await;
        let watchlist = watchlists
            .get_mut(user_id)
            .ok_or_else(|| not_found(user_id))?;
        Self::ensure_not_listed(watchlist, request.movie_id)?;

        let now = Utc::now();
        let item = WatchlistItem {
            id: watchlist.items.iter().map(|i| i.id).max().unwrap_or(0) + 1,
            watchlist_id: watchlist.id,
            movie_id: request.movie_id,
            movie,
            status: request.status,
            rating: request.rating,
            notes: request.notes,
            added_at: now,
            updated_at: now,
        };
        watchlist.items.push(item.clone());
        watchlist.updated_at = now;

        tracing::info!(
            user_id = %user_id,
            movie_id = item.movie_id,
            item_id = item.id,
            "Added watchlist item"
        );
        Ok(item)
    }

    pub async fn update_item(
        &self,
        user_id: &str,
        item_id: u64,
        request: UpdateItemRequest,
    ) -> AppResult<WatchlistItem> {
        request.validate()?;

        let mut watchlists = self.watchlists.write().await;
        let watchlist = watchlists
            .get_mut(user_id)
            .ok_or_else(|| not_found(user_id))?;

        let now = Utc::now();
        let item = watchlist
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("watchlist item {}", item_id)))?;

        item.status = request.status;
        item.rating = request.rating;
        item.notes = request.notes;
        item.updated_at = now;
        let updated = item.clone();
        watchlist.updated_at = now;

        Ok(updated)
    }

    pub async fn remove_item(&self, user_id: &str, item_id: u64) -> AppResult<()> {
        let mut watchlists = self.watchlists.write().await;
        let watchlist = watchlists
            .get_mut(user_id)
            .ok_or_else(|| not_found(user_id))?;

        let position = watchlist
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("watchlist item {}", item_id)))?;

        watchlist.items.remove(position);
        watchlist.updated_at = Utc::now();

        tracing::info!(user_id = %user_id, item_id, "Removed watchlist item");
        Ok(())
    }

    pub async fn stats(&self, user_id: &str) -> AppResult<WatchlistStats> {
        let items = self.items(user_id).await?;
        Ok(compute_stats(&items))
    }
}

/// Status counts, mean positive rating and total runtime in whole hours
pub fn compute_stats(items: &[WatchlistItem]) -> WatchlistStats {
    let mut stats = WatchlistStats {
        total_items: items.len(),
        ..Default::default()
    };

    let mut rating_sum = 0.0;
    let mut rated = 0usize;
    let mut minutes = 0u32;

    for item in items {
        match item.status {
            WatchStatus::Completed => stats.completed_items += 1,
            WatchStatus::Watching => stats.watching_items += 1,
            WatchStatus::ToWatch => stats.to_watch_items += 1,
            WatchStatus::Dropped => stats.dropped_items += 1,
        }

        if item.rating > 0.0 {
            rating_sum += item.rating;
            rated += 1;
        }
        minutes = minutes.saturating_add(item.movie.runtime);
    }

    if rated > 0 {
        stats.average_rating = rating_sum / rated as f64;
    }
    stats.total_hours = minutes / 60;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockCatalogProvider;

    fn details(id: u64, runtime: u32) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            runtime,
            genre_ids: vec![28],
            ..Default::default()
        }
    }

    fn service_with(catalog: MockCatalogProvider) -> WatchlistService {
        WatchlistService::new(Arc::new(catalog))
    }

    fn create_request() -> CreateWatchlistRequest {
        CreateWatchlistRequest {
            name: "Weekend".into(),
            description: String::new(),
            is_public: false,
        }
    }

    fn add_request(movie_id: u64, status: WatchStatus, rating: f64) -> AddItemRequest {
        AddItemRequest {
            movie_id,
            status,
            rating,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_once_per_user() {
        let service = service_with(MockCatalogProvider::new());

        let first = service.create("u1", create_request()).await.unwrap();
        assert_eq!(first.user_id, "u1");
        assert!(first.items.is_empty());

        let again = service.create("u1", create_request()).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let other = service.create("u2", create_request()).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let service = service_with(MockCatalogProvider::new());
        assert!(matches!(
            service.get("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_item_captures_details_and_rejects_duplicates() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .times(1)
            .returning(|id, _| Ok(details(id, 136)));
        let service = service_with(catalog);
        let cancel = CancellationToken::new();
        service.create("u1", create_request()).await.unwrap();

        let item = service
            .add_item("u1", add_request(603, WatchStatus::ToWatch, 0.0), &cancel)
            .await
            .unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(item.movie.runtime, 136);

        let duplicate = service
            .add_item("u1", add_request(603, WatchStatus::Watching, 0.0), &cancel)
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_add_item_tolerates_lookup_failure() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .returning(|id, _| Err(AppError::NotFound(format!("movie {}", id))));
        let service = service_with(catalog);
        service.create("u1", create_request()).await.unwrap();

        let item = service
            .add_item(
                "u1",
                add_request(42, WatchStatus::ToWatch, 0.0),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(item.movie.id, 42);
        assert_eq!(item.movie.title, "Unknown Title");
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .returning(|id, _| Ok(details(id, 90)));
        let service = service_with(catalog);
        let cancel = CancellationToken::new();
        service.create("u1", create_request()).await.unwrap();
        service
            .add_item("u1", add_request(1, WatchStatus::ToWatch, 0.0), &cancel)
            .await
            .unwrap();
        service
            .add_item("u1", add_request(2, WatchStatus::ToWatch, 0.0), &cancel)
            .await
            .unwrap();

        let updated = service
            .update_item(
                "u1",
                2,
                UpdateItemRequest {
                    status: WatchStatus::Completed,
                    rating: 9.0,
                    notes: "great".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, WatchStatus::Completed);
        assert_eq!(updated.rating, 9.0);

        service.remove_item("u1", 1).await.unwrap();
        assert!(matches!(
            service.remove_item("u1", 1).await,
            Err(AppError::NotFound(_))
        ));

        // Ids continue from the highest remaining item
        let next = service
            .add_item("u1", add_request(3, WatchStatus::ToWatch, 0.0), &cancel)
            .await
            .unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_movie_details()
            .returning(|id, _| Ok(details(id, 100)));
        let service = service_with(catalog);
        let cancel = CancellationToken::new();
        service.create("u1", create_request()).await.unwrap();

        for (id, status, rating) in [
            (1, WatchStatus::Completed, 8.0),
            (2, WatchStatus::Completed, 6.0),
            (3, WatchStatus::Watching, 0.0),
            (4, WatchStatus::Dropped, 0.0),
        ] {
            service
                .add_item("u1", add_request(id, status, rating), &cancel)
                .await
                .unwrap();
        }

        let stats = service.stats("u1").await.unwrap();
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.completed_items, 2);
        assert_eq!(stats.watching_items, 1);
        assert_eq!(stats.dropped_items, 1);
        assert_eq!(stats.to_watch_items, 0);
        assert_eq!(stats.average_rating, 7.0);
        assert_eq!(stats.total_hours, 6);
    }

    #[test]
    fn test_stats_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.average_rating, 0.0);
    }
}
