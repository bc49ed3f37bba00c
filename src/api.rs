//! HTTP surface: the page, a health check and the two static assets.

use crate::cache::Cache;
use crate::render::Renderer;
use crate::service::PortfolioService;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json as ResponseJson, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower_http::{services::ServeFile, trace::TraceLayer};
use tracing::error;

/// Body of the 500 response for a broken portfolio document
pub const CONFIGURATION_ERROR_BODY: &str = "Internal Configuration Error";

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    service: Arc<PortfolioService>,
    renderer: Arc<Renderer>,
    cache: Cache,
    version: String,
}

impl AppState {
    /// Bundles the handler dependencies. `cache` is only used for health checks.
    pub fn new(
        service: PortfolioService,
        renderer: Renderer,
        cache: Cache,
        version: impl Into<String>,
    ) -> Self {
        Self {
            service: Arc::new(service),
            renderer: Arc::new(renderer),
            cache,
            version: version.into(),
        }
    }
}

/// Builds the router; assets are read from `static_dir` on each request
pub fn create_app(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route_service(
            "/styles.css",
            ServeFile::new(static_dir.join("styles.css")).precompressed_gzip(),
        )
        .route_service(
            "/client.js",
            ServeFile::new(static_dir.join("client.js")).precompressed_gzip(),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Response {
    let configuration = match state.service.configuration().await {
        Ok(configuration) => configuration,
        Err(e) => {
            error!("Configuration error: {}", e);
            return internal_error();
        }
    };

    match state.renderer.render_page(&configuration) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        CONFIGURATION_ERROR_BODY,
    )
        .into_response()
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> ResponseJson<Value> {
    let connected = state.cache.check_connection().await;
    ResponseJson(json!({
        "version": state.version,
        "redis_connection": if connected { "HEALTHY" } else { "UNHEALTHY" },
    }))
}
