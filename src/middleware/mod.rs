// Middleware modules for Flint WiFi Backend

pub mod cors;
pub mod rate_limit;

pub use cors::dynamic_cors_middleware;
pub use rate_limit::{
    client_ip, lookup_rate_limit, new_lookup_rate_limiter, spawn_limiter_pruning,
    LookupRateLimiter, LIMITER_PRUNE_INTERVAL,
};
