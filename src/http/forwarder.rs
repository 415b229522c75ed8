//! Upstream forwarding.
//!
//! # Responsibilities
//! - Relay an approved request to the search backend
//! - Stream the backend response back unmodified
//! - Map connection failures to 502 and deadline expiry to 504
//!
//! # Design Decisions
//! - No retries: a failed exchange is reported to the caller as-is
//! - The gates never see this type, only the `Forwarder` trait

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, Response, Uri, Version};
use axum::response::IntoResponse;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::BackendConfig;
use crate::error::GateError;

/// Relays an approved request to the backend and returns its response.
///
/// Implementations report upstream failures as responses (502/504), never
/// as errors; the pipeline passes whatever comes back straight to the client.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Body>) -> Response<Body>;
}

/// Forwarder backed by the hyper-util connection-pooling client.
#[derive(Clone)]
pub struct HyperForwarder {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl HyperForwarder {
    pub fn new(authority: Authority, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            authority,
            timeout,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, axum::http::uri::InvalidUri> {
        let authority = Authority::from_str(&config.address)?;
        Ok(Self::new(authority, Duration::from_secs(config.timeout_secs)))
    }

    /// Point the request at the backend, keeping path and query.
    fn rewrite_uri(&self, uri: &Uri) -> Uri {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
    }
}

#[async_trait]
impl Forwarder for HyperForwarder {
    async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.rewrite_uri(&parts.uri);
        // the pooled backend connection speaks HTTP/1.1 whatever the client used
        parts.version = Version::HTTP_11;
        let request = Request::from_parts(parts, body);

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let response: Response<hyper::body::Incoming> = response;
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(backend = %self.authority, error = %e, "Upstream error");
                GateError::UpstreamUnavailable.into_response()
            }
            Err(_) => {
                tracing::error!(backend = %self.authority, timeout = ?self.timeout, "Upstream timeout");
                GateError::UpstreamTimeout.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_rewrite_keeps_path_and_query() {
        let forwarder = HyperForwarder::new(Authority::from_static("ll-es:9200"), Duration::from_secs(1));
        let uri: Uri = "/pas,lifecourses/_search?pretty=true".parse().unwrap();
        assert_eq!(
            forwarder.rewrite_uri(&uri).to_string(),
            "http://ll-es:9200/pas,lifecourses/_search?pretty=true"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_bad_gateway() {
        // nothing listens on port 1
        let forwarder = HyperForwarder::new(Authority::from_static("127.0.0.1:1"), Duration::from_secs(5));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = forwarder.forward(request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_slow_backend_is_gateway_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            time::sleep(Duration::from_secs(10)).await;
        });

        let authority = Authority::from_str(&addr.to_string()).unwrap();
        let forwarder = HyperForwarder::new(authority, Duration::from_millis(100));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = forwarder.forward(request).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
