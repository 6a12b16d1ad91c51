//! Request gates and response hardening
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use crowdcheck_ratelimit::RateDecision;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Source address the limiter and engine key on, attached as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity(pub String);

pub const UNKNOWN_IDENTITY: &str = "unknown";

pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// Peer address, or the hop the trusted proxy appended to `X-Forwarded-For`.
///
/// Earlier hops are whatever the client sent and are never used.
pub fn network_identity(req: &Request<Body>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

pub async fn rate_limit(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = network_identity(&req, state.trust_proxy);

    match state.limiter.admit(&identity) {
        RateDecision::Admitted { .. } => {
            req.extensions_mut().insert(NetworkIdentity(identity));
            next.run(req).await
        }
        RateDecision::RateLimited {
            retry_after_seconds,
        } => {
            state.metrics.record_rate_limited();
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "ok": false,
                    "error": "Too many requests. Please try again later.",
                    "retryAfter": retry_after_seconds,
                })),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
            response
        }
    }
}

pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );
    response
}
