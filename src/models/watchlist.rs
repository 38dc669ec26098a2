use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Movie;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    ToWatch,
    Watching,
    Completed,
    Dropped,
}

/// A user's watchlist; each user has at most one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Watchlist {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub is_public: bool,
    pub items: Vec<WatchlistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistItem {
    pub id: u64,
    pub watchlist_id: u64,
    pub movie_id: u64,
    /// Catalog details captured when the item was added; default when the
    /// lookup failed
    pub movie: Movie,
    pub status: WatchStatus,
    /// 0 means unrated
    pub rating: f64,
    pub notes: String,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_rating(rating: f64) -> AppResult<()> {
    if !(0.0..=10.0).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "rating must be between 0 and 10, got {}",
            rating
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWatchlistRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
}

impl CreateWatchlistRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub movie_id: u64,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub notes: String,
}

impl AddItemRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.movie_id == 0 {
            return Err(AppError::InvalidInput("movie_id is required".to_string()));
        }
        validate_rating(self.rating)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub status: WatchStatus,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub notes: String,
}

impl UpdateItemRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_rating(self.rating)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WatchlistStats {
    pub total_items: usize,
    pub completed_items: usize,
    pub watching_items: usize,
    pub to_watch_items: usize,
    pub dropped_items: usize,
    /// Mean over items rated above 0
    pub average_rating: f64,
    /// Sum of known runtimes in whole hours
    pub total_hours: u32,
}

/// A scored candidate for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie: Movie,
    pub score: f64,
    pub reason: String,
    pub genre_match: f64,
    pub rating_match: f64,
}
