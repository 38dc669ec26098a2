use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Key used when the peer address is not available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Per-client inbound limit, keyed by peer IP
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    per_minute: NonZeroU32,
}

impl ClientRateLimiter {
    /// `limit` requests per minute per client, with a burst of `limit`
    pub fn per_minute(limit: u32) -> Self {
        let per_minute = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            per_minute,
        }
    }

    /// Counts one request for `client`; false when it is over the limit
    pub fn check(&self, client: &str) -> bool {
        self.limiter.check_key(&client.to_string()).is_ok()
    }

    pub fn limit(&self) -> u32 {
        self.per_minute.get()
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Forgets clients whose quota has fully recovered
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Prunes every `period` until `shutdown` fires
    pub fn spawn_pruner(
        self: Arc<Self>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.prune();
                        tracing::debug!(
                            clients = self.tracked_clients(),
                            "Pruned inbound limiter"
                        );
                    }
                }
            }
        })
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Rejects requests over the client's quota with 429
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    if !limiter.check(&client) {
        tracing::warn!(
            client = %client,
            path = %request.uri().path(),
            "Inbound rate limit exceeded"
        );
        return AppError::TooManyRequests(format!(
            "limit is {} requests per minute",
            limiter.limit()
        ))
        .into_response();
    }

    next.run(request).await
}
