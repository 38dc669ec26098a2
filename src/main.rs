use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use movie_discovery_api::{
    cache::Cache,
    config::Config,
    http::RateLimitedClient,
    middleware::ClientRateLimiter,
    routes::{create_router, AppState},
    services::{
        providers::{CatalogProvider, OmdbProvider, RatingsProvider, TmdbProvider},
        RecommendationEngine, ScoringWeights, WatchlistService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cache = Cache::new();
    let sweeper = cache.spawn_sweeper(config.cache_sweep_interval());
    let ttls = config.cache_ttls();

    let tmdb_client = RateLimitedClient::new(
        config.http_timeout(),
        config.tmdb_rate_limit,
        config.retry_policy(),
    )
    .context("failed to build TMDB client")?;
    let omdb_client = RateLimitedClient::new(
        config.http_timeout(),
        config.omdb_rate_limit,
        config.retry_policy(),
    )
    .context("failed to build OMDB client")?;
    tracing::info!(
        tmdb_rps = config.tmdb_rate_limit,
        omdb_rps = config.omdb_rate_limit,
        max_retries = tmdb_client.policy().max_retries,
        "Outbound clients ready"
    );

    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::new(
        tmdb_client,
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        cache.clone(),
        ttls,
    ));
    let ratings: Arc<dyn RatingsProvider> = Arc::new(OmdbProvider::new(
        omdb_client,
        config.omdb_api_key.clone(),
        config.omdb_base_url.clone(),
        cache.clone(),
        ttls,
    ));
    let watchlists = Arc::new(WatchlistService::new(catalog.clone()));
    let recommendations = Arc::new(RecommendationEngine::new(
        catalog.clone(),
        watchlists.clone(),
        cache.clone(),
        ScoringWeights::default(),
        ttls,
    ));

    let shutdown = CancellationToken::new();
    let inbound_limiter = Arc::new(ClientRateLimiter::per_minute(
        config.inbound_rate_limit_per_minute,
    ));
    let pruner = inbound_limiter
        .clone()
        .spawn_pruner(config.cache_sweep_interval(), shutdown.clone());

    let state = AppState {
        catalog,
        ratings,
        watchlists,
        recommendations,
        inbound_limiter,
        shutdown: shutdown.clone(),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(
        addr = %addr,
        per_client_per_minute = config.inbound_rate_limit_per_minute,
        "Server running"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    sweeper.shutdown().await;
    if let Err(e) = pruner.await {
        tracing::warn!(error = %e, "Inbound limiter pruner failed");
    }
    tracing::info!(cached_entries = cache.len(), "Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels every in-flight upstream call
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
