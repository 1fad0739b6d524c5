use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use std::sync::Arc;
use tracing::debug;

use crate::app_config::AppConfig;

/// Origin to echo back, if the request's origin is allowed
fn allowed_origin(config: &AppConfig, origin: Option<&str>) -> Option<HeaderValue> {
    let origin = origin?;
    let has_wildcard = config
        .security
        .cors_allowed_origins
        .iter()
        .any(|o| o == "*");

    let allowed = if has_wildcard {
        debug!("CORS: Reflecting origin: {}", origin);
        true
    } else if config
        .security
        .cors_allowed_origins
        .iter()
        .any(|o| o == origin)
    {
        debug!("CORS: Origin allowed from whitelist: {}", origin);
        true
    } else {
        debug!("CORS: Origin not in whitelist: {}", origin);
        false
    };

    if allowed {
        HeaderValue::from_str(origin).ok()
    } else {
        None
    }
}

/// CORS middleware driven by `CORS_ALLOWED_ORIGINS` ("*" reflects any origin)
pub async fn dynamic_cors_middleware(
    State(config): State<Arc<AppConfig>>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let allowed = allowed_origin(&config, origin.as_deref());

    // Handle preflight OPTIONS requests
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());

        if let Some(allowed) = allowed {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, accept, origin, x-requested-with"),
            );
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static("3600"),
            );
            headers.insert(header::VARY, HeaderValue::from_static("origin"));
        }

        *response.status_mut() = StatusCode::NO_CONTENT;
        return response;
    }

    let mut response = next.run(req).await;

    if let Some(allowed) = allowed {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        headers.insert(header::VARY, HeaderValue::from_static("origin"));
    }

    response
}
