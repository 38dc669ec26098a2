use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{omdb::OmdbTitle, ApiResponse},
};

use super::{page_or_first, AppState};

#[derive(Debug, Deserialize)]
pub struct RatingsSearchParams {
    q: Option<String>,
    page: Option<u32>,
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<RatingsSearchParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<OmdbTitle>>>> {
    let Query(params) = params?;
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("query parameter 'q' is required".to_string()))?;

    let titles = state
        .ratings
        .search(query, page_or_first(params.page), &state.request_token())
        .await?;

    Ok(Json(ApiResponse::ok(
        titles,
        "Ratings search completed successfully",
    )))
}

pub async fn by_imdb_id(
    State(state): State<AppState>,
    imdb_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ApiResponse<OmdbTitle>>> {
    let Path(imdb_id) = imdb_id?;
    if !is_imdb_id(&imdb_id) {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not an IMDB id",
            imdb_id
        )));
    }

    let title = state
        .ratings
        .by_imdb_id(&imdb_id, &state.request_token())
        .await?;
    Ok(Json(ApiResponse::ok(
        title,
        "Ratings retrieved successfully",
    )))
}

/// `tt` followed by digits
fn is_imdb_id(id: &str) -> bool {
    id.strip_prefix("tt")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
