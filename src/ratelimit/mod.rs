//! Per-IP request limiting.
//!
//! Callers are identified by the first `X-Forwarded-For` entry, then
//! `X-Real-IP`, then the peer address of the connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::store::UsageTracker;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Caller identity derived from proxy headers or the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        resolve_client_ip(&parts.headers, peer)
            .map(ClientIp)
            .ok_or_else(missing_identity)
    }
}

/// Pick the caller identifier from the request headers, falling back to the peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header_value(FORWARDED_FOR_HEADER)
        .or_else(|| header_value(REAL_IP_HEADER))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn missing_identity() -> AppError {
    AppError::BadRequest("Unable to determine caller identity".to_string())
}

/// Rate limit layer function that takes the shared tracker as a parameter.
pub async fn rate_limit_layer(tracker: Arc<UsageTracker>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let Some(ip) = resolve_client_ip(request.headers(), peer) else {
        return missing_identity().into_response();
    };

    if tracker.check_and_consume(&ip).can_proceed {
        return next.run(request).await;
    }

    let retry_after_secs = round_up_secs(tracker.window_remaining(&ip)).max(1);
    tracing::warn!(client_ip = %ip, retry_after_secs, "Request rate limit exceeded");

    let mut response = AppError::TooManyRequests {
        message: "Too many requests, please try again later.".to_string(),
        retry_after_secs,
    }
    .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

fn round_up_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
