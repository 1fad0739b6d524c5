// Per-IP throttle for the lookup endpoints (manual verification, credential retrieval)
// Both accept guessable input, so they are rate limited in-process

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::{task::JoinHandle, time::interval};
use tracing::{debug, warn};

use crate::{app::AppState, utils::ApiError};

pub type LookupRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

pub fn new_lookup_rate_limiter(per_minute: u32) -> LookupRateLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_minute(per_minute))
}

/// How often clients with a fully replenished quota are dropped from the limiter
pub const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically forget clients whose quota has fully replenished, so the
/// per-IP map only holds recently active addresses. Stops once the limiter is dropped.
pub fn spawn_limiter_pruning(
    limiter: &Arc<LookupRateLimiter>,
    every: Duration,
) -> JoinHandle<()> {
    let limiter = Arc::downgrade(limiter);

    tokio::spawn(async move {
        let mut ticker = interval(every);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!("Lookup limiter now tracks {} clients", limiter.len());
        }
    })
}

/// Client address: first X-Forwarded-For hop when trusted, else the socket peer
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    peer.map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn lookup_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.features.enable_rate_limiting {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(
        req.headers(),
        peer,
        state.config.security.trust_forwarded_for,
    );

    if state.lookup_limiter.check_key(&ip).is_err() {
        warn!("Lookup rate limit exceeded for {}", ip);
        return ApiError::RateLimited.into_response();
    }

    next.run(req).await
}
