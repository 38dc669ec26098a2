use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        AddItemRequest, ApiResponse, CreateWatchlistRequest, Recommendation, UpdateItemRequest,
        Watchlist, WatchlistItem, WatchlistStats,
    },
};

use super::{AppState, UserId};

#[derive(Debug, Deserialize)]
pub struct ItemParams {
    item_id: Option<u64>,
}

impl ItemParams {
    fn item_id(&self) -> AppResult<u64> {
        self.item_id
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::InvalidInput("query parameter 'item_id' is required".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    #[serde(default)]
    limit: i64,
}

pub async fn create(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    body: Result<Json<CreateWatchlistRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Watchlist>>)> {
    let Json(request) = body?;
    let watchlist = state.watchlists.create(&user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(watchlist, "Watchlist created successfully")),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<ApiResponse<Watchlist>>> {
    let watchlist = state.watchlists.get(&user_id).await?;
    Ok(Json(ApiResponse::ok(
        watchlist,
        "Watchlist retrieved successfully",
    )))
}

pub async fn items(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<ApiResponse<Vec<WatchlistItem>>>> {
    let items = state.watchlists.items(&user_id).await?;
    Ok(Json(ApiResponse::ok(
        items,
        "Watchlist items retrieved successfully",
    )))
}

pub async fn add_item(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<WatchlistItem>>)> {
    let Json(request) = body?;
    let item = state
        .watchlists
        .add_item(&user_id, request, &state.request_token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(item, "Item added to watchlist")),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    params: Result<Query<ItemParams>, QueryRejection>,
    body: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<WatchlistItem>>> {
    let Query(params) = params?;
    let item_id = params.item_id()?;
    let Json(request) = body?;

    let item = state
        .watchlists
        .update_item(&user_id, item_id, request)
        .await?;
    Ok(Json(ApiResponse::ok(item, "Watchlist item updated")))
}

pub async fn remove_item(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    params: Result<Query<ItemParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<()>>> {
    let Query(params) = params?;
    let item_id = params.item_id()?;

    state.watchlists.remove_item(&user_id, item_id).await?;
    Ok(Json(ApiResponse::ok((), "Item removed from watchlist")))
}

pub async fn stats(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<ApiResponse<WatchlistStats>>> {
    let stats = state.watchlists.stats(&user_id).await?;
    Ok(Json(ApiResponse::ok(
        stats,
        "Watchlist stats retrieved successfully",
    )))
}

pub async fn recommendations(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    params: Result<Query<RecommendationParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Recommendation>>>> {
    let Query(params) = params?;

    let recommendations = state
        .recommendations
        .recommendations(&user_id, params.limit, &state.request_token())
        .await?;

    Ok(Json(ApiResponse::ok(
        recommendations,
        "Recommendations generated successfully",
    )))
}
