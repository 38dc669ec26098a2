use std::collections::HashMap;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{ApiResponse, Genre, MediaFilter, Movie, Timeframe},
};

use super::{page_or_first, parse_or_default, AppState, DEFAULT_SORT, UPSTREAM_PAGE_SIZE};

const TOP_COUNT: usize = 5;

/// Minimum number of weekly trending titles for a genre to count as popular
pub const POPULAR_GENRE_THRESHOLD: usize = 3;

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    timeframe: Option<String>,
    page: Option<u32>,
    #[serde(rename = "type")]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ByGenreParams {
    genre_id: Option<u32>,
    page: Option<u32>,
    sort_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendingStats {
    pub daily_trending_count: usize,
    pub weekly_trending_count: usize,
    pub daily_top_movies: Vec<Movie>,
    pub weekly_top_movies: Vec<Movie>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TrendingGenre {
    pub genre: Genre,
    pub count: usize,
    pub popular: bool,
}

/// Counts how often each genre occurs in `trending`, in `genres` order
pub fn count_trending_genres(genres: Vec<Genre>, trending: &[Movie]) -> Vec<TrendingGenre> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for movie in trending {
        for genre_id in &movie.genre_ids {
            *counts.entry(*genre_id).or_default() += 1;
        }
    }

    genres
        .into_iter()
        .map(|genre| {
            let count = counts.get(&genre.id).copied().unwrap_or(0);
            TrendingGenre {
                genre,
                count,
                popular: count >= POPULAR_GENRE_THRESHOLD,
            }
        })
        .collect()
}

pub async fn trending(
    State(state): State<AppState>,
    params: Result<Query<TrendingParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Movie>>>> {
    let Query(params) = params?;
    let timeframe: Timeframe = parse_or_default(params.timeframe.as_deref())?;
    let media_type: MediaFilter = parse_or_default(params.media_type.as_deref())?;

    let results = state
        .catalog
        .trending(
            timeframe,
            page_or_first(params.page),
            media_type,
            &state.request_token(),
        )
        .await?;
    let meta = results.meta(UPSTREAM_PAGE_SIZE);

    Ok(Json(
        ApiResponse::ok(
            results.results,
            format!("Trending content for the {} retrieved successfully", timeframe),
        )
        .with_meta(meta),
    ))
}

pub async fn by_genre(
    State(state): State<AppState>,
    params: Result<Query<ByGenreParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Movie>>>> {
    let Query(params) = params?;
    let genre_id = params
        .genre_id
        .ok_or_else(|| AppError::InvalidInput("query parameter 'genre_id' is required".to_string()))?;
    let sort_by = params.sort_by.as_deref().unwrap_or(DEFAULT_SORT);

    let results = state
        .catalog
        .movies_by_genre(
            genre_id,
            page_or_first(params.page),
            sort_by,
            &state.request_token(),
        )
        .await?;
    let meta = results.meta(UPSTREAM_PAGE_SIZE);

    Ok(Json(
        ApiResponse::ok(
            results.results,
            "Trending content by genre retrieved successfully",
        )
        .with_meta(meta),
    ))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TrendingStats>>> {
    let cancel = state.request_token();
    let day = state
        .catalog
        .trending(Timeframe::Day, 1, MediaFilter::Movie, &cancel)
        .await?;
    let week = state
        .catalog
        .trending(Timeframe::Week, 1, MediaFilter::Movie, &cancel)
        .await?;

    let stats = TrendingStats {
        daily_trending_count: day.results.len(),
        weekly_trending_count: week.results.len(),
        daily_top_movies: day.results.into_iter().take(TOP_COUNT).collect(),
        weekly_top_movies: week.results.into_iter().take(TOP_COUNT).collect(),
    };

    Ok(Json(ApiResponse::ok(
        stats,
        "Trending stats retrieved successfully",
    )))
}

pub async fn genres(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<TrendingGenre>>>> {
    let cancel = state.request_token();
    let genres = state.catalog.genres(&cancel).await?;
    let week = state
        .catalog
        .trending(Timeframe::Week, 1, MediaFilter::Movie, &cancel)
        .await?;

    Ok(Json(ApiResponse::ok(
        count_trending_genres(genres, &week.results),
        "Trending genres retrieved successfully",
    )))
}
