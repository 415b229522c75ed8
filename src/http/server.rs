//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all gate handler
//! - Wire up middleware (request ID, trace span)
//! - Buffer and classify request bodies within the size limit
//! - Run the gating pipeline and relay the result
//! - Spawn the rate limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::http::forwarder::{Forwarder, HyperForwarder};
use crate::http::request::{request_id, source_address, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::pipeline::{GatingPipeline, InboundRequest};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<GatingPipeline>,
    pub trust_proxy: bool,
    pub max_body_bytes: usize,
}

/// HTTP front end for the gating pipeline.
pub struct GateServer {
    router: Router,
    config: GateConfig,
    pipeline: Arc<GatingPipeline>,
}

impl GateServer {
    /// Create a server forwarding to the configured backend.
    pub fn new(config: GateConfig) -> Result<Self, axum::http::uri::InvalidUri> {
        let forwarder = HyperForwarder::from_config(&config.backend)?;
        Ok(Self::with_forwarder(config, Arc::new(forwarder)))
    }

    /// Create a server with an explicit forwarder.
    pub fn with_forwarder(config: GateConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        let pipeline = Arc::new(GatingPipeline::from_config(&config, forwarder));
        let state = AppState {
            pipeline: pipeline.clone(),
            trust_proxy: config.listener.trust_proxy,
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/", any(gate_handler))
            .route("/{*path}", any(gate_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id(request.headers()),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(x_request_id)),
            )
    }

    /// Shared pipeline, e.g. for the admin API.
    pub fn pipeline(&self) -> Arc<GatingPipeline> {
        self.pipeline.clone()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.address,
            rules = self.pipeline.policy().rules().len(),
            "Search gate starting"
        );

        let sweep_interval = Duration::from_millis(self.config.rate_limit.sweep_interval_ms);
        let sweeper = tokio::spawn(
            self.pipeline
                .limiter()
                .clone()
                .run_sweeper(sweep_interval, shutdown.resubscribe()),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        sweeper.abort();
        tracing::info!("Search gate stopped");
        Ok(())
    }
}

/// Gate a single request and relay the outcome.
async fn gate_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let source = source_address(peer, request.headers(), state.trust_proxy);

    tracing::debug!(source = %source, "Gating request");

    let (parts, body) = request.into_parts();
    let inbound = read_body(&parts.headers, body, state.max_body_bytes)
        .await
        .and_then(|bytes| InboundRequest::parse(parts, bytes, source, state.pipeline.capper()));

    let response = match inbound {
        Ok(inbound) => state.pipeline.handle(inbound).await,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request body");
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

/// Buffer the body, enforcing the configured limit.
async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, GateError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(GateError::PayloadTooLarge);
    }

    // An error here is either the limit or a client that went away; the
    // latter never reads the response.
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| GateError::PayloadTooLarge)
}
