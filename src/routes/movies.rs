use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{ApiResponse, Genre, MediaFilter, MediaType, Movie, TvShow},
    services::providers::SearchQuery,
};

use super::{page_or_first, parse_or_default, AppState, DEFAULT_SORT, UPSTREAM_PAGE_SIZE};

const DEFAULT_PER_PAGE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
    #[serde(rename = "type")]
    media_type: Option<String>,
    #[serde(default)]
    include_adult: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenrePageParams {
    page: Option<u32>,
    sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    #[serde(default)]
    limit: i64,
}

/// Details of either media type
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MediaDetails {
    Movie(Movie),
    Tv(TvShow),
}

/// Ratings enrichment is best effort; the catalog entry is returned either way
async fn enrich_or_keep(state: &AppState, movie: Movie) -> Movie {
    let cancel = state.request_token();
    match state.ratings.enrich(movie.clone(), &cancel).await {
        Ok(enriched) => enriched,
        Err(e) => {
            tracing::warn!(
                error = %e,
                movie_id = movie.id,
                transient = e.is_transient(),
                "Ratings enrichment failed"
            );
            movie
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Movie>>>> {
    let Query(params) = params?;

    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("query parameter 'q' is required".to_string()))?
        .to_string();
    let per_page = params.per_page.filter(|p| *p > 0).unwrap_or(DEFAULT_PER_PAGE);
    let search = SearchQuery {
        query,
        page: page_or_first(params.page),
        per_page,
        media_type: parse_or_default::<MediaFilter>(params.media_type.as_deref())?,
        include_adult: params.include_adult,
    };

    let results = state.catalog.search(&search, &state.request_token()).await?;
    let meta = results.meta(per_page);

    Ok(Json(
        ApiResponse::ok(results.results, "Search completed successfully").with_meta(meta),
    ))
}

pub async fn details(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> AppResult<Json<ApiResponse<Movie>>> {
    let Path(id) = id?;

    let movie = state.catalog.movie_details(id, &state.request_token()).await?;
    let movie = enrich_or_keep(&state, movie).await;

    Ok(Json(ApiResponse::ok(
        movie,
        "Movie details retrieved successfully",
    )))
}

pub async fn similar(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Movie>>>> {
    let Path(id) = id?;
    let Query(params) = params?;

    let movies = state
        .recommendations
        .similar(id, params.limit, &state.request_token())
        .await?;

    Ok(Json(ApiResponse::ok(
        movies,
        "Similar movies retrieved successfully",
    )))
}

pub async fn genres(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Genre>>>> {
    let genres = state.catalog.genres(&state.request_token()).await?;
    Ok(Json(ApiResponse::ok(
        genres,
        "Genres retrieved successfully",
    )))
}

pub async fn by_genre(
    State(state): State<AppState>,
    genre_id: Result<Path<u32>, PathRejection>,
    params: Result<Query<GenrePageParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Movie>>>> {
    let Path(genre_id) = genre_id?;
    let Query(params) = params?;
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
        ApiResponse::ok(results.results, "Movies by genre retrieved successfully")
            .with_meta(meta),
    ))
}

pub async fn media_details(
    State(state): State<AppState>,
    path: Result<Path<(String, u64)>, PathRejection>,
) -> AppResult<Json<ApiResponse<MediaDetails>>> {
    let Path((media_type, id)) = path?;
    let media_type: MediaType = media_type.parse().map_err(AppError::InvalidInput)?;

    match media_type {
        MediaType::Movie => {
            let movie = state.catalog.movie_details(id, &state.request_token()).await?;
            let movie = enrich_or_keep(&state, movie).await;
            Ok(Json(ApiResponse::ok(
                MediaDetails::Movie(movie),
                "Movie details retrieved successfully",
            )))
        }
        MediaType::Tv => {
            let show = state.catalog.tv_details(id, &state.request_token()).await?;
            Ok(Json(ApiResponse::ok(
                MediaDetails::Tv(show),
                "TV show details retrieved successfully",
            )))
        }
    }
}
