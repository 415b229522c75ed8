//! Composition of the three gates.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;

use crate::config::GateConfig;
use crate::http::Forwarder;
use crate::observability::metrics;
use crate::pipeline::{Denial, GateDecision, InboundRequest, Payload};
use crate::security::{AccessPolicy, RateLimiter, ResultSizeCapper};

/// Runs access policy, rate limiting and size capping, then forwards.
pub struct GatingPipeline {
    policy: AccessPolicy,
    limiter: Arc<RateLimiter>,
    capper: ResultSizeCapper,
    forwarder: Arc<dyn Forwarder>,
}

impl GatingPipeline {
    pub fn new(
        policy: AccessPolicy,
        limiter: Arc<RateLimiter>,
        capper: ResultSizeCapper,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            policy,
            limiter,
            capper,
            forwarder,
        }
    }

    /// Build all three gates from validated configuration.
    pub fn from_config(config: &GateConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        Self::new(
            AccessPolicy::from_config(&config.access),
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            ResultSizeCapper::from_config(&config.result_size),
            forwarder,
        )
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn capper(&self) -> &ResultSizeCapper {
        &self.capper
    }

    /// Run the gates in order, stopping at the first denial.
    pub fn decide(&self, mut request: InboundRequest, now: Instant) -> GateDecision<InboundRequest> {
        if let GateDecision::Deny(denial) = self.policy.evaluate(&request.source, request.method()) {
            return self.deny(&request, denial);
        }

        if let GateDecision::Deny(denial) = self.limiter.evaluate(&request.source, now) {
            return self.deny(&request, denial);
        }

        if let Payload::Search(search) = &mut request.payload {
            let requested = search.size();
            *search = self.capper.apply(&request.parts.method, std::mem::take(search));
            if search.size() != requested {
                metrics::record_size_rewritten();
            }
        }

        GateDecision::Allow(request)
    }

    /// Gate the request and, if every gate allows it, forward it.
    pub async fn handle(&self, request: InboundRequest) -> Response<Body> {
        match self.decide(request, Instant::now()) {
            GateDecision::Deny(denial) => denial.into_response(),
            GateDecision::Allow(request) => match request.into_http() {
                Ok(request) => self.forwarder.forward(request).await,
                Err(e) => e.into_response(),
            },
        }
    }

    fn deny(&self, request: &InboundRequest, denial: Denial) -> GateDecision<InboundRequest> {
        tracing::warn!(
            source = %request.source,
            method = %request.method(),
            path = %request.parts.uri.path(),
            reason = denial.reason,
            status = denial.status.as_u16(),
            "Request denied"
        );
        metrics::record_denied(denial.reason);
        GateDecision::Deny(denial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Bytes;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};

    use crate::security::{AccessRule, WILDCARD};

    /// Records forwarded bodies and answers 200.
    #[derive(Default)]
    struct RecordingForwarder {
        calls: AtomicUsize,
        bodies: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl Forwarder for RecordingForwarder {
        async fn forward(&self, request: Request<Body>) -> Response<Body> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bytes = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
            self.bodies.lock().unwrap().push(bytes);
            Response::new(Body::from(r#"{"hits":{"total":{"value":0},"hits":[]}}"#))
        }
    }

    /// Always reports the backend as unreachable.
    struct DownForwarder;

    #[async_trait]
    impl Forwarder for DownForwarder {
        async fn forward(&self, _request: Request<Body>) -> Response<Body> {
            crate::error::GateError::UpstreamUnavailable.into_response()
        }
    }

    fn pipeline(max_requests: u64, forwarder: Arc<dyn Forwarder>) -> GatingPipeline {
        GatingPipeline::new(
            AccessPolicy::new(vec![
                AccessRule::new("1.2.3.4", vec![Method::GET, Method::POST]),
                AccessRule::new(WILDCARD, vec![Method::GET]),
            ]),
            Arc::new(RateLimiter::new(Duration::from_millis(900_000), max_requests)),
            ResultSizeCapper::new(1, 1000, vec![Method::GET]),
            forwarder,
        )
    }

    fn request(pipeline: &GatingPipeline, method: Method, source: &str, body: &str) -> InboundRequest {
        let (parts, _) = Request::builder()
            .method(method)
            .uri("/pas/_search")
            .body(())
            .unwrap()
            .into_parts();
        InboundRequest::parse(parts, Bytes::from(body.to_string()), source, pipeline.capper()).unwrap()
    }

    fn forwarded_json(forwarder: &RecordingForwarder, index: usize) -> Value {
        serde_json::from_slice(&forwarder.bodies.lock().unwrap()[index]).unwrap()
    }

    #[tokio::test]
    async fn test_policy_denial_skips_forwarder() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder.clone());

        let response = pipeline.handle(request(&pipeline, Method::POST, "9.9.9.9", "")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Forbidden");
        assert_eq!(forwarder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_policy_denial_does_not_count_against_rate_limit() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder);

        let _ = pipeline.handle(request(&pipeline, Method::POST, "9.9.9.9", "")).await;
        assert!(pipeline.limiter().record("9.9.9.9").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_after_max_requests() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder.clone());

        for _ in 0..5 {
            let response = pipeline.handle(request(&pipeline, Method::GET, "5.5.5.5", "")).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = pipeline.handle(request(&pipeline, Method::GET, "5.5.5.5", "")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(forwarder.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_window_elapsed_resets_through_pipeline() {
        let pipeline = pipeline(2, Arc::new(RecordingForwarder::default()));
        let start = Instant::now();

        for expected in [true, true, false] {
            let decision = pipeline.decide(request(&pipeline, Method::GET, "5.5.5.5", ""), start);
            assert_eq!(decision.is_allow(), expected);
        }

        let later = start + Duration::from_millis(900_000);
        for expected in [true, true, false] {
            let decision = pipeline.decide(request(&pipeline, Method::GET, "5.5.5.5", ""), later);
            assert_eq!(decision.is_allow(), expected);
        }
    }

    #[tokio::test]
    async fn test_oversized_request_forwarded_with_default() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder.clone());

        let body = r#"{"size":5000,"query":{"match":{"firstnames_std":"bo"}}}"#;
        let _ = pipeline.handle(request(&pipeline, Method::GET, "5.5.5.5", body)).await;

        assert_eq!(
            forwarded_json(&forwarder, 0),
            json!({ "size": 1, "query": { "match": { "firstnames_std": "bo" } } })
        );
    }

    #[tokio::test]
    async fn test_in_range_request_forwarded_unchanged() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder.clone());

        let _ = pipeline.handle(request(&pipeline, Method::GET, "5.5.5.5", r#"{"size":10}"#)).await;
        assert_eq!(forwarded_json(&forwarder, 0), json!({ "size": 10 }));
    }

    #[tokio::test]
    async fn test_missing_size_forwarded_with_default() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder.clone());

        let _ = pipeline.handle(request(&pipeline, Method::GET, "5.5.5.5", "")).await;
        assert_eq!(forwarded_json(&forwarder, 0), json!({ "size": 1 }));
    }

    #[tokio::test]
    async fn test_mutation_body_passes_through_byte_for_byte() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let pipeline = pipeline(5, forwarder.clone());

        let body = r#"{ "size" : 5000 }"#;
        let response = pipeline.handle(request(&pipeline, Method::POST, "1.2.3.4", body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&forwarder.bodies.lock().unwrap()[0][..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaced_unchanged() {
        let pipeline = pipeline(5, Arc::new(DownForwarder));
        let response = pipeline.handle(request(&pipeline, Method::GET, "5.5.5.5", "")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
