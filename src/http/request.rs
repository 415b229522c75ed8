//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client did not send one
//! - Resolve the source address the gates key on
//!
//! # Design Decisions
//! - IPv4-mapped IPv6 peers are reported in IPv4 form, so allowlist entries
//!   like "1.2.3.4" match regardless of the listener's address family
//! - `X-Forwarded-For` is ignored unless the listener trusts its proxy, and
//!   then only the right-most entry (the one hop we trust) is used

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID header value, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Source address for policy and rate limiting.
pub fn source_address(peer: SocketAddr, headers: &HeaderMap, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(client) = forwarded_client(headers) {
            return client.to_string();
        }
    }
    peer.ip().to_canonical().to_string()
}

/// Right-most `X-Forwarded-For` entry, the peer our proxy saw.
///
/// Entries left of it are supplied by the client and can be anything.
fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let last = value.rsplit(',').next()?.trim();
    last.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}
