//! Outbound HTTP plumbing shared by the upstream providers
//!
//! Every request goes through a per-provider [`RateLimiter`] and is retried
//! with exponential backoff on transient failures.

pub mod client;
pub mod rate_limiter;

pub use client::{HttpError, RateLimitedClient, RetryPolicy};
pub use rate_limiter::RateLimiter;

/// Serves `router` on an ephemeral local port and returns its base URL
#[cfg(test)]
pub(crate) async fn spawn_test_upstream(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
