//! prometheus-demo greets people, counts greetings in Redis and exposes
//! Prometheus metrics about every request it serves.
#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod config;
pub mod database;
pub mod error;
mod router;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::any;
use axum::{Router, middleware};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};

pub use error::ServerError;

use database::mem::MemoryStore;
use database::redis::RedisStore;
use database::{Counter, CounterStore, StoreKind};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: axum::http::Method,
    path: &str,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub counter: Counter,
    pub metrics: telemetry::Metrics,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let trace = ServiceBuilder::new().layer(
        TraceLayer::new_for_http()
            .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
            })
            .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
            .on_request(DefaultOnRequest::new())
            .on_response(DefaultOnResponse::new().latency_unit(LatencyUnit::Micros)),
    );

    // Methods are not checked: every route answers any verb.
    let instrumented = Router::new()
        // `/sayhi?name=` greets and increments the counter.
        .route("/sayhi", any(router::sayhi::handler))
        // `/count?name=` reads the counter.
        .route("/count", any(router::count::handler))
        // `/base64?data=` encodes `data`.
        .route("/base64", any(router::encode::handler))
        .route("/health", any(router::health::handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            telemetry::track,
        ));

    let app = Router::new()
        // Scrapes are not counted as demo requests.
        .route("/metrics", any(router::metrics::handler))
        .merge(instrumented)
        .with_state(state.clone())
        .layer(trace);

    match state.config.request_timeout {
        Some(secs) => app.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(secs),
        )),
        None => app,
    }
}

/// Initialize the application state.
pub fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file, then environment.
    let config = config::Configuration::default()
        .path(std::env::var("CONFIG_PATH").unwrap_or_default().into())
        .read()
        .with_env(std::env::var("REDIS_ADDR").ok(), std::env::var("PORT").ok());

    let store: Arc<dyn CounterStore> = match config.store {
        StoreKind::Redis => {
            if config.redis_addr.is_empty() {
                tracing::warn!("`REDIS_ADDR` is empty, every counter request will fail");
            }
            Arc::new(RedisStore::new(config.redis_addr.clone()))
        },
        StoreKind::Memory => {
            tracing::warn!("using in-memory store, counters are lost on restart");
            Arc::new(MemoryStore::default())
        },
    };

    let metrics = telemetry::Metrics::new()?;

    Ok(AppState {
        config: Arc::new(config),
        counter: Counter::new(store),
        metrics,
    })
}
