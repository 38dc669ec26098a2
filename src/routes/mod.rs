use std::{any::Any, str::FromStr, sync::Arc};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderName, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    middleware::{
        make_span_with_request_id, rate_limit_middleware, request_id_middleware,
        ClientRateLimiter,
    },
    services::{
        providers::{CatalogProvider, RatingsProvider},
        RecommendationEngine, WatchlistService,
    },
};

pub mod movies;
pub mod ratings;
pub mod trending;
pub mod watchlist;

pub const SERVICE_NAME: &str = "movie-discovery-api";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Results per upstream TMDB page
pub const UPSTREAM_PAGE_SIZE: u32 = 20;

pub(crate) const DEFAULT_SORT: &str = "popularity.desc";

/// Parses an optional enum-like query value, falling back to its default
pub(crate) fn parse_or_default<T>(value: Option<&str>) -> AppResult<T>
where
    T: FromStr<Err = String> + Default,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().map_err(AppError::InvalidInput),
        None => Ok(T::default()),
    }
}

/// Zero or missing page means the first page
pub(crate) fn page_or_first(page: Option<u32>) -> u32 {
    page.filter(|p| *p > 0).unwrap_or(1)
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogProvider>,
    pub ratings: Arc<dyn RatingsProvider>,
    pub watchlists: Arc<WatchlistService>,
    pub recommendations: Arc<RecommendationEngine>,
    pub inbound_limiter: Arc<ClientRateLimiter>,
    /// Cancelled on shutdown; handlers derive child tokens from it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Token for one request's outbound calls
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

/// Caller identity from the `X-User-ID` header
#[derive(Debug, Clone)]
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| UserId(value.to_string()))
            .ok_or_else(|| AppError::InvalidInput("X-User-ID header is required".to_string()))
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let limiter = state.inbound_limiter.clone();
    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state);

    with_middleware(router, limiter)
}

/// Wraps `router` in the request-id, trace, CORS, panic and rate-limit layers
fn with_middleware(router: Router, limiter: Arc<ClientRateLimiter>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)]);

    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
            .layer(cors)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware)),
    )
}

/// Turns a handler panic into the 500 error envelope
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    tracing::error!(panic = %detail, "Handler panicked");

    AppError::Internal("request handler panicked".to_string()).into_response()
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Movies
        .route("/movies/search", get(movies::search))
        .route("/movies/genres", get(movies::genres))
        .route("/movies/genres/:genre_id", get(movies::by_genre))
        .route("/movies/:id", get(movies::details))
        .route("/movies/:id/similar", get(movies::similar))
        .route("/media/:media_type/:id", get(movies::media_details))
        // Trending
        .route("/trending", get(trending::trending))
        .route("/trending/by-genre", get(trending::by_genre))
        .route("/trending/stats", get(trending::stats))
        .route("/trending/genres", get(trending::genres))
        // Watchlist
        .route("/watchlist", get(watchlist::get).post(watchlist::create))
        .route(
            "/watchlist/items",
            get(watchlist::items)
                .post(watchlist::add_item)
                .put(watchlist::update_item)
                .delete(watchlist::remove_item),
        )
        .route("/watchlist/stats", get(watchlist::stats))
        .route("/watchlist/recommendations", get(watchlist::recommendations))
        // Ratings
        .route("/ratings/search", get(ratings::search))
        .route("/ratings/:imdb_id", get(ratings::by_imdb_id))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "service": SERVICE_NAME })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    fn server() -> TestServer {
        let router = Router::new()
            .route("/explode", get(explode))
            .route("/fine", get(|| async { "fine" }));
        TestServer::new(with_middleware(
            router,
            Arc::new(ClientRateLimiter::per_minute(100)),
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_panic_becomes_500_envelope() {
        let server = server();

        let response = server.get("/explode").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 500);
        assert_eq!(
            body["message"],
            "Internal server error: request handler panicked"
        );
        assert!(!response.header("x-request-id").is_empty());

        server.get("/fine").await.assert_status_ok();
    }

    #[test]
    fn test_panic_payload_kinds() {
        let from_str = panic_response(Box::new("static message"));
        assert_eq!(from_str.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let from_string = panic_response(Box::new(String::from("owned message")));
        assert_eq!(from_string.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let opaque = panic_response(Box::new(42u8));
        assert_eq!(opaque.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
